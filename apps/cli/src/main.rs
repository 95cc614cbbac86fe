//! # BPG400 CLI
//!
//! Command-line interface for the BPG400 vacuum gauge.
//!
//! ## 步骤模式
//!
//! ```bash
//! # 配置默认串口
//! bpg400-cli config set --port /dev/ttyUSB0
//!
//! # 依次执行：切换单位 -> 等待 -> 查询
//! bpg400-cli setmbar sleep 1 query
//!
//! # JSON 输出，调试模式打印收发帧
//! bpg400-cli --json --debug query
//! ```
//!
//! ## 记录模式
//!
//! ```bash
//! bpg400-cli --port /dev/ttyUSB0 monitor --interval 1 --count 60
//! ```

use anyhow::{Context, Result};
use bpg400_driver::{Bpg400, Bpg400Builder};
use clap::{CommandFactory, Parser, Subcommand};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod steps;

use commands::{CliConfig, ConfigCommand, MonitorCommand};
use steps::{StepRunner, parse_steps};

/// BPG400 CLI - 真空计命令行工具
#[derive(Parser, Debug)]
#[command(name = "bpg400-cli")]
#[command(about = "Controls or queries the BPG400 pressure gauge via RS-232", long_about = None)]
#[command(version)]
struct Cli {
    /// 串口设备（覆盖配置文件）
    #[arg(long)]
    port: Option<String>,

    /// 以 JSON 输出
    #[arg(long)]
    json: bool,

    /// 调试模式（打印收发帧）
    #[arg(long)]
    debug: bool,

    /// 等待有效读数的超时（秒）
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    #[command(subcommand)]
    command: Option<Commands>,

    /// 步骤：query, setmbar, settorr, setpa, degas, nodegas, sleep N
    #[arg(value_name = "STEP")]
    steps: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 按固定间隔记录压力（mbar）
    Monitor {
        #[command(flatten)]
        args: MonitorCommand,
    },
}

fn init_tracing(debug: bool) -> Result<()> {
    let mut filter = EnvFilter::from_default_env().add_directive("bpg400_cli=info".parse()?);
    if debug {
        filter = filter
            .add_directive("bpg400_driver=trace".parse()?)
            .add_directive("bpg400_link=trace".parse()?);
    }

    // 日志走 stderr，stdout 只留给测量输出
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
    Ok(())
}

/// 打开串口并启动驱动
fn connect(cli_port: Option<&str>) -> Result<Bpg400> {
    let config = CliConfig::load()?;
    let port = config.resolve_port(cli_port);

    let mut builder = Bpg400Builder::new().port(port.clone());
    if let Some(baud_rate) = config.baud_rate {
        builder = builder.baud_rate(baud_rate);
    }

    info!("Connecting to {}", port);
    builder.build().with_context(|| format!("Failed to open {}", port))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    match cli.command {
        Some(Commands::Config(cmd)) => cmd.execute(),

        Some(Commands::Monitor { args }) => {
            let gauge = connect(cli.port.as_deref())?;
            args.execute(&gauge, cli.json)
        },

        None => {
            if cli.steps.is_empty() {
                Cli::command().print_help()?;
                return Ok(());
            }

            let steps = parse_steps(&cli.steps)?;
            let mut gauge = connect(cli.port.as_deref())?;
            let result = StepRunner::new(&gauge, cli.json, Duration::from_secs(cli.timeout))
                .run(&steps);
            gauge.stop();
            result
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_steps_with_flags() {
        let cli = Cli::try_parse_from([
            "bpg400-cli", "--port", "/dev/ttyUSB3", "--json", "setpa", "sleep", "2", "query",
        ])
        .unwrap();
        assert_eq!(cli.port.as_deref(), Some("/dev/ttyUSB3"));
        assert!(cli.json);
        assert!(!cli.debug);
        assert!(cli.command.is_none());
        assert_eq!(cli.steps, vec!["setpa", "sleep", "2", "query"]);
    }

    #[test]
    fn test_parse_config_subcommand() {
        let cli = Cli::try_parse_from(["bpg400-cli", "config", "set", "--port", "COM3"]).unwrap();
        match cli.command {
            Some(Commands::Config(ConfigCommand::Set { port, baud_rate })) => {
                assert_eq!(port.as_deref(), Some("COM3"));
                assert!(baud_rate.is_none());
            },
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_monitor_subcommand() {
        let cli = Cli::try_parse_from(["bpg400-cli", "--debug", "monitor", "--count", "5"]).unwrap();
        assert!(cli.debug);
        match cli.command {
            Some(Commands::Monitor { args }) => {
                assert_eq!(args.count, Some(5));
                assert_eq!(args.interval, 1.0);
            },
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
