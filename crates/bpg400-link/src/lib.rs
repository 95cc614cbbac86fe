//! # BPG400 Link Layer
//!
//! 字节链路抽象层：把物理连接（RS-232 串口）统一成"逐字节读 + 整帧写"的全双工通道。
//!
//! 链路在交给驱动前被拆分（[`Link::split`]）为独立的读端和写端：
//! 读端由后台解码线程独占，写端由指令发送方共享，两个方向互不阻塞。

use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "serial")]
pub mod serial;

#[cfg(feature = "serial")]
pub use serial::{LinkConfig, SerialLink, SerialReader, SerialWriter};

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockHandle, MockLink, MockReader, MockWriter};

/// 链路层统一错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] LinkDeviceError),
    #[error("Read timeout")]
    Timeout,
    #[error("Link not connected")]
    NotConnected,
    #[error("Link closed")]
    Closed,
}

impl LinkError {
    /// 是否应终止读循环
    ///
    /// 只有 `Timeout` 是可恢复的，其余错误都意味着链路已不可用。
    pub fn is_fatal(&self) -> bool {
        !matches!(self, LinkError::Timeout)
    }
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDeviceErrorKind {
    Unknown,
    NotFound,
    NoDevice,
    AccessDenied,
    Busy,
    UnsupportedConfig,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct LinkDeviceError {
    pub kind: LinkDeviceErrorKind,
    pub message: String,
}

impl LinkDeviceError {
    pub fn new(kind: LinkDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<String> for LinkDeviceError {
    fn from(message: String) -> Self {
        Self::new(LinkDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for LinkDeviceError {
    fn from(message: &str) -> Self {
        Self::new(LinkDeviceErrorKind::Unknown, message)
    }
}

/// 链路读端（设备 → 主机）
pub trait LinkReader {
    /// 阻塞读取一个字节
    ///
    /// 在 `timeout` 内没有数据时返回 [`LinkError::Timeout`]，调用方应重试。
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, LinkError>;
}

/// 链路写端（主机 → 设备）
pub trait LinkWriter {
    /// 写出完整的字节序列
    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    /// 释放底层连接（默认依赖 Drop）
    fn close(&mut self) -> Result<(), LinkError> {
        Ok(())
    }
}

/// 可拆分为独立读写端的全双工链路
pub trait Link {
    type Reader: LinkReader + Send + 'static;
    type Writer: LinkWriter + Send + 'static;

    fn split(self) -> Result<(Self::Reader, Self::Writer), LinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_error_display() {
        assert_eq!(LinkError::Timeout.to_string(), "Read timeout");
        assert_eq!(LinkError::NotConnected.to_string(), "Link not connected");

        let err = LinkError::Device(LinkDeviceError::new(
            LinkDeviceErrorKind::NoDevice,
            "unplugged",
        ));
        assert!(err.to_string().contains("NoDevice"));
        assert!(err.to_string().contains("unplugged"));
    }

    #[test]
    fn test_only_timeout_is_recoverable() {
        assert!(!LinkError::Timeout.is_fatal());
        assert!(LinkError::Closed.is_fatal());
        assert!(LinkError::NotConnected.is_fatal());
        assert!(LinkError::from(std::io::Error::other("boom")).is_fatal());
        assert!(LinkError::from(LinkDeviceError::from("gone")).is_fatal());
    }
}
