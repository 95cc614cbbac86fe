//! 压力记录命令
//!
//! 按固定间隔输出带时间戳的压力（统一换算为 mbar）。

use anyhow::{Result, bail};
use bpg400_driver::Bpg400;
use bpg400_protocol::Measurement;
use clap::Args;
use serde::Serialize;
use std::thread;
use std::time::{Duration, UNIX_EPOCH};

/// 记录命令参数
#[derive(Args, Debug)]
pub struct MonitorCommand {
    /// 采样间隔（秒）
    #[arg(short, long, default_value_t = 1.0)]
    pub interval: f64,

    /// 采样次数（不设置则一直运行）
    #[arg(short, long)]
    pub count: Option<u64>,
}

/// 单个采样点
#[derive(Debug, Serialize, PartialEq)]
pub struct Sample {
    /// Unix 时间戳（秒）
    pub timestamp: f64,
    pub pressure_mbar: f64,
    pub reliable: bool,
}

impl Sample {
    pub fn from_measurement(m: &Measurement) -> Option<Self> {
        Some(Self {
            timestamp: m.timestamp.duration_since(UNIX_EPOCH).ok()?.as_secs_f64(),
            pressure_mbar: m.pressure_mbar?,
            reliable: m.reliable,
        })
    }

    pub fn render(&self, json: bool) -> Result<String> {
        if json {
            Ok(serde_json::to_string(self)?)
        } else {
            Ok(format!("{:.3}: {:e} mbar", self.timestamp, self.pressure_mbar))
        }
    }
}

impl MonitorCommand {
    /// 校验采样间隔（必须为正且可表示为 `Duration`）
    pub fn sample_interval(&self) -> Result<Duration> {
        match Duration::try_from_secs_f64(self.interval) {
            Ok(interval) if !interval.is_zero() => Ok(interval),
            _ => bail!("Interval must be positive, got {}", self.interval),
        }
    }

    pub fn execute(&self, gauge: &Bpg400, json: bool) -> Result<()> {
        let interval = self.sample_interval()?;

        let mut taken = 0u64;
        while self.count.is_none_or(|count| taken < count) {
            if !gauge.is_running() {
                bail!(
                    "Gauge link stopped: {}",
                    gauge.last_error().unwrap_or_else(|| "unknown error".into())
                );
            }

            if let Some(sample) = gauge
                .latest_measurement()
                .as_ref()
                .and_then(Sample::from_measurement)
            {
                println!("{}", sample.render(json)?);
                taken += 1;
            }

            thread::sleep(interval);
        }

        Ok(())
    }
}
