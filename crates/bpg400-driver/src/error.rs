//! 驱动层错误类型定义

use bpg400_link::LinkError;
use bpg400_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 链路错误
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 驱动已停止，写端已释放
    #[error("Device not connected")]
    NotConnected,

    /// 设备不支持的操作（单位/除气）
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// 后台线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,
}

/// 流缓冲区错误
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// 请求的偏移/长度超出已缓存字节数（缓冲区保持不变）
    #[error("Buffer underflow: requested {requested}, available {available}")]
    Underflow { requested: usize, available: usize },
}
