//! # BPG400 Protocol
//!
//! BPG400 真空计 RS-232 协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 帧格式与换算常量
//! - `feedback`: 数据帧解析（位域 → `Measurement`）
//! - `control`: 指令帧构建（单位切换、除气）
//! - `capabilities`: 设备能力声明
//!
//! ## 帧格式
//!
//! ```text
//! Byte:  0     1     2       3      4       5       6        7      8
//!       SYNC  PAGE  STATUS  ERROR  P_HIGH  P_LOW  SOFTWARE  SENSOR  CHECKSUM
//!        7     5                                            10     Σ(1..=7)
//! ```
//!
//! 没有长度前缀，也没有转义序列，只能依靠固定指纹 (7, 5, 10) 加校验和定位帧边界。

pub mod capabilities;
pub mod constants;
pub mod control;
pub mod feedback;

pub use capabilities::GaugeCapabilities;
pub use constants::*;
pub use control::CommandFrame;
pub use feedback::*;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Bad fingerprint: sync={sync}, page={page}, sensor_type={sensor_type}")]
    BadFingerprint { sync: u8, page: u8, sensor_type: u8 },

    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}

/// 计算 `bytes` 的模 256 累加和
///
/// 数据帧与指令帧使用同一种校验：除首字节外、校验字节之前所有字节之和。
#[inline]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// 检查窗口开头是否带有数据帧指纹
///
/// `window` 必须至少包含 [`FRAME_LEN`] 字节，否则返回 `false`。
#[inline]
pub fn has_fingerprint(window: &[u8]) -> bool {
    window.len() >= FRAME_LEN
        && window[SYNC_OFFSET] == SYNC_BYTE
        && window[PAGE_OFFSET] == PAGE_BYTE
        && window[SENSOR_TYPE_OFFSET] == SENSOR_TYPE_BYTE
}

/// 9 字节原始数据帧
///
/// 只有同时满足三个指纹字节和校验和的窗口才能构造出 `RawFrame`，
/// 因此持有 `RawFrame` 即代表帧已通过校验。
///
/// # 示例
///
/// ```rust
/// use bpg400_protocol::RawFrame;
///
/// let frame = RawFrame::try_from(&[7u8, 5, 0, 0, 195, 80, 10, 10, 44][..]).unwrap();
/// assert_eq!(frame.pressure_code(), 50000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame {
    bytes: [u8; FRAME_LEN],
}

impl RawFrame {
    /// 校验和覆盖的字节范围：Byte 1..=7
    pub const CHECKSUM_RANGE: std::ops::Range<usize> = PAGE_OFFSET..CHECKSUM_OFFSET;

    /// 计算帧的期望校验和（不检查指纹）
    pub fn expected_checksum(window: &[u8; FRAME_LEN]) -> u8 {
        checksum(&window[Self::CHECKSUM_RANGE])
    }

    /// 获取原始字节
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.bytes
    }

    /// 状态字节（Byte 2）
    pub fn status(&self) -> u8 {
        self.bytes[2]
    }

    /// 错误字节（Byte 3）
    pub fn error(&self) -> u8 {
        self.bytes[3]
    }

    /// 原始压力码：Byte 4 为高字节，Byte 5 为低字节
    pub fn pressure_code(&self) -> u16 {
        u16::from_be_bytes([self.bytes[4], self.bytes[5]])
    }

    /// 软件版本字节（Byte 6）
    pub fn software_version(&self) -> u8 {
        self.bytes[6]
    }
}

impl TryFrom<[u8; FRAME_LEN]> for RawFrame {
    type Error = ProtocolError;

    fn try_from(bytes: [u8; FRAME_LEN]) -> Result<Self, Self::Error> {
        if !has_fingerprint(&bytes) {
            return Err(ProtocolError::BadFingerprint {
                sync: bytes[SYNC_OFFSET],
                page: bytes[PAGE_OFFSET],
                sensor_type: bytes[SENSOR_TYPE_OFFSET],
            });
        }

        let expected = Self::expected_checksum(&bytes);
        if expected != bytes[CHECKSUM_OFFSET] {
            return Err(ProtocolError::ChecksumMismatch {
                expected,
                actual: bytes[CHECKSUM_OFFSET],
            });
        }

        Ok(Self { bytes })
    }
}

impl TryFrom<&[u8]> for RawFrame {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let fixed: [u8; FRAME_LEN] =
            bytes.try_into().map_err(|_| ProtocolError::InvalidLength {
                expected: FRAME_LEN,
                actual: bytes.len(),
            })?;
        Self::try_from(fixed)
    }
}
