//! RS-232 串口后端
//!
//! BPG400 固定使用 9600 波特、8 数据位、无校验、1 停止位、无流控。

use crate::{Link, LinkDeviceError, LinkDeviceErrorKind, LinkError, LinkReader, LinkWriter};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{debug, trace};

/// 串口配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// 设备路径（如 `/dev/ttyUSB0`、`COM3`）
    pub port: String,
    /// 波特率（默认 9600）
    pub baud_rate: u32,
    /// 单字节读超时（毫秒）
    pub read_timeout_ms: u64,
}

impl LinkConfig {
    pub const DEFAULT_BAUD_RATE: u32 = 9600;
    pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: Self::DEFAULT_BAUD_RATE,
            read_timeout_ms: Self::DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

impl From<serialport::Error> for LinkDeviceError {
    fn from(err: serialport::Error) -> Self {
        let kind = match err.kind() {
            serialport::ErrorKind::NoDevice => LinkDeviceErrorKind::NoDevice,
            serialport::ErrorKind::InvalidInput => LinkDeviceErrorKind::UnsupportedConfig,
            serialport::ErrorKind::Io(ErrorKind::NotFound) => LinkDeviceErrorKind::NotFound,
            serialport::ErrorKind::Io(ErrorKind::PermissionDenied) => {
                LinkDeviceErrorKind::AccessDenied
            },
            serialport::ErrorKind::Io(_) => LinkDeviceErrorKind::Backend,
            _ => LinkDeviceErrorKind::Unknown,
        };
        LinkDeviceError::new(kind, err.description)
    }
}

impl From<serialport::Error> for LinkError {
    fn from(err: serialport::Error) -> Self {
        LinkError::Device(err.into())
    }
}

/// 已打开的串口
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    read_timeout: Duration,
}

impl SerialLink {
    /// 按配置打开串口
    pub fn open(config: &LinkConfig) -> Result<Self, LinkError> {
        let read_timeout = Duration::from_millis(config.read_timeout_ms);
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(read_timeout)
            .open()?;

        debug!(
            "Opened serial port {} at {} baud (8N1)",
            config.port, config.baud_rate
        );

        Ok(Self { port, read_timeout })
    }
}

impl Link for SerialLink {
    type Reader = SerialReader;
    type Writer = SerialWriter;

    fn split(self) -> Result<(SerialReader, SerialWriter), LinkError> {
        let tx_port = self.port.try_clone()?;
        Ok((
            SerialReader {
                port: self.port,
                timeout: self.read_timeout,
            },
            SerialWriter {
                port: Some(tx_port),
            },
        ))
    }
}

/// 串口读端
pub struct SerialReader {
    port: Box<dyn SerialPort>,
    timeout: Duration,
}

impl LinkReader for SerialReader {
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, LinkError> {
        if timeout != self.timeout {
            self.port.set_timeout(timeout)?;
            self.timeout = timeout;
        }

        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(1) => Ok(buf[0]),
            // 部分平台在超时时返回 0 字节而非 TimedOut
            Ok(_) => Err(LinkError::Timeout),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                Err(LinkError::Timeout)
            },
            Err(e) if e.kind() == ErrorKind::Interrupted => Err(LinkError::Timeout),
            Err(e) => Err(LinkError::Io(e)),
        }
    }
}

/// 串口写端
pub struct SerialWriter {
    port: Option<Box<dyn SerialPort>>,
}

impl LinkWriter for SerialWriter {
    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let port = self.port.as_mut().ok_or(LinkError::NotConnected)?;
        trace!("Serial TX: {:02X?}", bytes);
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), LinkError> {
        self.port = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_config_defaults() {
        let config = LinkConfig::new("/dev/ttyUSB0");
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.read_timeout_ms, 100);
    }

    #[test]
    fn test_serialport_error_mapping() {
        let err = serialport::Error::new(serialport::ErrorKind::NoDevice, "missing");
        let mapped = LinkDeviceError::from(err);
        assert_eq!(mapped.kind, LinkDeviceErrorKind::NoDevice);
        assert_eq!(mapped.message, "missing");

        let err = serialport::Error::new(
            serialport::ErrorKind::Io(ErrorKind::PermissionDenied),
            "denied",
        );
        assert_eq!(
            LinkDeviceError::from(err).kind,
            LinkDeviceErrorKind::AccessDenied
        );
    }

    #[test]
    fn test_open_missing_port_fails() {
        let config = LinkConfig::new("/dev/bpg400-does-not-exist");
        assert!(SerialLink::open(&config).is_err());
    }
}
