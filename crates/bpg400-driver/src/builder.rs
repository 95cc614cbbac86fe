//! Builder 模式实现
//!
//! 打开串口并启动 [`Bpg400`] 的便捷方式。

use crate::error::DriverError;
use crate::gauge::Bpg400;
use crate::pipeline::DecoderConfig;
use bpg400_link::{LinkConfig, LinkDeviceError, LinkDeviceErrorKind, LinkError, SerialLink};
use std::time::Duration;

/// Bpg400 Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use bpg400_driver::Bpg400Builder;
/// use std::time::Duration;
///
/// let gauge = Bpg400Builder::new()
///     .port("/dev/ttyUSB0")
///     .read_timeout(Duration::from_millis(50))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct Bpg400Builder {
    /// 串口路径
    port: Option<String>,
    /// 波特率（默认 9600）
    baud_rate: Option<u32>,
    /// 单字节读超时
    read_timeout: Option<Duration>,
    decoder_config: Option<DecoderConfig>,
}

impl Bpg400Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    /// 单字节读超时，同时写入链路和解码线程配置
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn decoder_config(mut self, config: DecoderConfig) -> Self {
        self.decoder_config = Some(config);
        self
    }

    /// 解析最终的链路与解码配置
    fn resolve(&self) -> Result<(LinkConfig, DecoderConfig), DriverError> {
        let port = self.port.clone().ok_or_else(|| {
            LinkError::Device(LinkDeviceError::new(
                LinkDeviceErrorKind::NotFound,
                "serial port not specified",
            ))
        })?;

        let mut decoder_config = self.decoder_config.clone().unwrap_or_default();
        if let Some(timeout) = self.read_timeout {
            decoder_config.read_timeout_ms = timeout.as_millis() as u64;
        }

        let mut link_config = LinkConfig::new(port);
        if let Some(baud_rate) = self.baud_rate {
            link_config.baud_rate = baud_rate;
        }
        link_config.read_timeout_ms = decoder_config.read_timeout_ms;

        Ok((link_config, decoder_config))
    }

    /// 打开串口并启动解码线程
    pub fn build(self) -> Result<Bpg400, DriverError> {
        let (link_config, decoder_config) = self.resolve()?;
        let link = SerialLink::open(&link_config)?;
        Bpg400::start(link, decoder_config)
    }
}
