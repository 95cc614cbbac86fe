//! 配置管理命令
//!
//! 默认串口和波特率保存在 `<config_dir>/bpg400/config.toml`。

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 未配置时使用的串口
pub const DEFAULT_PORT: &str = "/dev/ttyU0";

/// 配置目录
fn config_dir() -> Result<PathBuf> {
    let mut path =
        dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine config directory"))?;

    path.push("bpg400");
    Ok(path)
}

pub fn config_file() -> Result<PathBuf> {
    let mut path = config_dir()?;
    path.push("config.toml");
    Ok(path)
}

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// 默认串口
    pub port: Option<String>,

    /// 波特率（不设置时使用 9600）
    pub baud_rate: Option<u32>,
}

impl CliConfig {
    /// 加载默认位置的配置（不存在时返回默认值）
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = format!(
            "# BPG400 CLI Configuration\n\n{}",
            toml::to_string(self).context("Failed to serialize config")?
        );
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }

    /// 命令行参数优先，其次配置文件，最后内置默认值
    pub fn resolve_port(&self, cli_port: Option<&str>) -> String {
        cli_port
            .map(str::to_string)
            .or_else(|| self.port.clone())
            .unwrap_or_else(|| DEFAULT_PORT.to_string())
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// 默认串口（如 /dev/ttyUSB0, COM3）
        #[arg(short, long)]
        port: Option<String>,

        /// 波特率
        #[arg(short, long)]
        baud_rate: Option<u32>,
    },

    /// 获取配置项
    Get {
        /// 配置项名称（port / baud_rate / all）
        #[arg(default_value = "all")]
        key: String,
    },

    /// 显示配置文件路径
    Path,
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Set { port, baud_rate } => Self::set_(port, baud_rate),
            ConfigCommand::Get { key } => Self::get_(&key),
            ConfigCommand::Path => {
                println!("{}", config_file()?.display());
                Ok(())
            },
        }
    }

    fn set_(port: Option<String>, baud_rate: Option<u32>) -> Result<()> {
        let mut config = CliConfig::load()?;

        if let Some(port) = port {
            println!("Default port: {}", port);
            config.port = Some(port);
        }

        if let Some(baud_rate) = baud_rate {
            println!("Baud rate: {}", baud_rate);
            config.baud_rate = Some(baud_rate);
        }

        config.save()
    }

    fn get_(key: &str) -> Result<()> {
        let config = CliConfig::load()?;

        match key {
            "port" => println!("{}", config.resolve_port(None)),
            "baud_rate" => match config.baud_rate {
                Some(baud) => println!("{}", baud),
                None => println!("(not set)"),
            },
            _ => {
                println!("BPG400 CLI config:");
                println!("  port: {:?}", config.port);
                println!("  baud_rate: {:?}", config.baud_rate);
            },
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = CliConfig {
            port: Some("/dev/ttyUSB1".into()),
            baud_rate: Some(9600),
        };
        config.save_to(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("port = \"/dev/ttyUSB1\""));
        assert_eq!(CliConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "port = [").unwrap();
        assert!(CliConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_resolve_port_precedence() {
        let empty = CliConfig::default();
        assert_eq!(empty.resolve_port(None), DEFAULT_PORT);

        let config = CliConfig {
            port: Some("/dev/ttyS1".into()),
            baud_rate: None,
        };
        assert_eq!(config.resolve_port(None), "/dev/ttyS1");
        assert_eq!(config.resolve_port(Some("COM4")), "COM4");
    }
}
