//! 步骤序列
//!
//! 命令行上的步骤按顺序执行，例如：
//!
//! ```text
//! bpg400-cli setmbar sleep 2 query degas sleep 180 nodegas query
//! ```

use anyhow::{Context, Result, bail};
use bpg400_driver::Bpg400;
use bpg400_protocol::{Measurement, PressureUnit};
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// 单个步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// 输出当前压力（等待第一条有效读数）
    Query,
    /// 切换显示单位
    SetUnit(PressureUnit),
    /// 开启/关闭除气
    Degas(bool),
    /// 暂停 N 秒
    Sleep(u64),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StepParseError {
    #[error("Unknown command or argument {0}")]
    Unknown(String),
    #[error("Missing duration after sleep")]
    MissingDuration,
    #[error("Argument {0} is not a valid sleep duration")]
    InvalidDuration(String),
}

/// 解析步骤列表
pub fn parse_steps<S: AsRef<str>>(args: &[S]) -> Result<Vec<Step>, StepParseError> {
    let mut steps = Vec::new();
    let mut args = args.iter().map(|s| s.as_ref().trim());

    while let Some(arg) = args.next() {
        let step = match arg {
            "query" => Step::Query,
            "setmbar" => Step::SetUnit(PressureUnit::Mbar),
            "settorr" => Step::SetUnit(PressureUnit::Torr),
            "setpa" => Step::SetUnit(PressureUnit::Pascal),
            "degas" => Step::Degas(true),
            "nodegas" => Step::Degas(false),
            "sleep" => {
                let raw = args.next().ok_or(StepParseError::MissingDuration)?;
                match raw.parse::<u64>() {
                    Ok(secs) if secs > 0 => Step::Sleep(secs),
                    _ => return Err(StepParseError::InvalidDuration(raw.to_string())),
                }
            },
            other => return Err(StepParseError::Unknown(other.to_string())),
        };
        steps.push(step);
    }

    Ok(steps)
}

/// `query` 的 JSON 输出
#[derive(Debug, Serialize, PartialEq)]
pub struct QueryOutput {
    pub pressure: f64,
    pub unit: PressureUnit,
    pub pressure_mbar: f64,
    pub reliable: bool,
    pub degassing: bool,
}

impl QueryOutput {
    pub fn from_measurement(m: &Measurement) -> Option<Self> {
        let reading = m.reading()?;
        Some(Self {
            pressure: reading.value,
            unit: reading.unit,
            pressure_mbar: reading.mbar,
            reliable: m.reliable,
            degassing: m.degassing,
        })
    }

    pub fn render(&self, json: bool) -> Result<String> {
        if json {
            Ok(serde_json::to_string(self)?)
        } else {
            Ok(format!("{:e} {}", self.pressure, self.unit))
        }
    }
}

/// 步骤执行器
pub struct StepRunner<'a> {
    gauge: &'a Bpg400,
    json: bool,
    /// 等待有效读数的上限
    query_timeout: Duration,
}

impl<'a> StepRunner<'a> {
    pub fn new(gauge: &'a Bpg400, json: bool, query_timeout: Duration) -> Self {
        Self {
            gauge,
            json,
            query_timeout,
        }
    }

    pub fn run(&self, steps: &[Step]) -> Result<()> {
        for step in steps {
            self.run_step(*step)?;
        }
        Ok(())
    }

    fn run_step(&self, step: Step) -> Result<()> {
        match step {
            Step::Query => {
                let output = self.wait_for_reading()?;
                println!("{}", output.render(self.json)?);
            },
            Step::SetUnit(unit) => {
                if !self.json {
                    println!("Setting display unit to {}", unit);
                }
                self.gauge.send_set_unit(unit).context("Failed to set display unit")?;
            },
            Step::Degas(enable) => {
                if !self.json {
                    println!("Degassing: {}", enable);
                }
                self.gauge.send_degas(enable).context("Failed to switch degas")?;
            },
            Step::Sleep(secs) => thread::sleep(Duration::from_secs(secs)),
        }
        Ok(())
    }

    /// 轮询直到出现单位可识别的测量
    fn wait_for_reading(&self) -> Result<QueryOutput> {
        let start = Instant::now();

        loop {
            if let Some(output) = self
                .gauge
                .latest_measurement()
                .as_ref()
                .and_then(QueryOutput::from_measurement)
            {
                return Ok(output);
            }

            if !self.gauge.is_running() {
                bail!(
                    "Gauge link stopped: {}",
                    self.gauge.last_error().unwrap_or_else(|| "unknown error".into())
                );
            }
            if start.elapsed() >= self.query_timeout {
                bail!("No valid measurement within {:?}", self.query_timeout);
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}
