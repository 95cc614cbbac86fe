//! 数据帧解析
//!
//! 把通过校验的 [`RawFrame`] 解码成 [`Measurement`]：状态字节、错误字节两个位域，
//! 加上 16 位对数压力码和软件版本。

use crate::constants::*;
use crate::{ProtocolError, RawFrame};
use bilge::prelude::*;
use std::fmt;
use std::time::SystemTime;

// ============================================================================
// 枚举类型定义
// ============================================================================

/// 压力单位
///
/// 数值同时是状态字节 Bit 4-5 的编码和单位切换指令的参数值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, num_enum::TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum PressureUnit {
    /// 毫巴
    Mbar = 0x00,
    /// 托
    Torr = 0x01,
    /// 帕斯卡
    Pascal = 0x02,
}

impl PressureUnit {
    /// 对数换算偏移：value = 10^(code / 4000 - offset)
    pub fn log_offset(self) -> f64 {
        match self {
            PressureUnit::Mbar => LOG_OFFSET_MBAR,
            PressureUnit::Torr => LOG_OFFSET_TORR,
            PressureUnit::Pascal => LOG_OFFSET_PASCAL,
        }
    }

    /// 把本单位下的数值换算为 mbar
    pub fn to_mbar(self, value: f64) -> f64 {
        match self {
            PressureUnit::Mbar => value,
            PressureUnit::Torr => value * MBAR_PER_TORR,
            PressureUnit::Pascal => value * MBAR_PER_PASCAL,
        }
    }

    /// 简短单位名（"mbar" / "torr" / "pa"）
    pub fn as_str(self) -> &'static str {
        match self {
            PressureUnit::Mbar => "mbar",
            PressureUnit::Torr => "torr",
            PressureUnit::Pascal => "pa",
        }
    }
}

impl fmt::Display for PressureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 发射电流（状态字节 Bit 0-1）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EmissionCurrent {
    /// 无发射（Pirani 单独工作）
    #[default]
    Off,
    /// 25 µA
    Low,
    /// 5 mA
    High,
    /// 除气中，电流不报告
    Degas,
}

impl EmissionCurrent {
    /// 发射电流（安培），除气时为 `None`
    pub fn amps(self) -> Option<f64> {
        match self {
            EmissionCurrent::Off => Some(0.0),
            EmissionCurrent::Low => Some(EMISSION_CURRENT_LOW_A),
            EmissionCurrent::High => Some(EMISSION_CURRENT_HIGH_A),
            EmissionCurrent::Degas => None,
        }
    }
}

impl From<u2> for EmissionCurrent {
    fn from(bits: u2) -> Self {
        match bits.value() {
            0b00 => EmissionCurrent::Off,
            0b01 => EmissionCurrent::Low,
            0b10 => EmissionCurrent::High,
            _ => EmissionCurrent::Degas,
        }
    }
}

/// 传感器故障（错误字节高 4 位）
///
/// 同一帧最多报告一种故障。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SensorFault {
    /// Pirani 测量值不可靠（0x5_）
    PoorPirani,
    /// Bayard-Alpert 电离规故障（0x8_）
    BayardAlpert,
    /// Pirani 规故障（0x9_）
    Pirani,
}

impl SensorFault {
    /// 从错误字节高 4 位解析，其它编码视为无故障
    pub fn from_code(code: u4) -> Option<Self> {
        match code.value() {
            0x5 => Some(SensorFault::PoorPirani),
            0x8 => Some(SensorFault::BayardAlpert),
            0x9 => Some(SensorFault::Pirani),
            _ => None,
        }
    }
}

// ============================================================================
// 位域结构定义（使用 bilge）
// ============================================================================

/// 状态字节位域（Byte 2）
///
/// 协议定义（LSB first）：
/// - Bit 0-1: 发射电流（00: 0, 01: 25 µA, 10: 5 mA, 11: 除气）
/// - Bit 2: 1000 mbar 校准（1: 已校准）
/// - Bit 3: 保留
/// - Bit 4-5: 单位（00: mbar, 01: Torr, 10: Pa, 11: 无效）
/// - Bit 6-7: 保留
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, Default)]
pub struct StatusByte {
    pub emission: u2,               // Bit 0-1
    pub thousand_mbar_adjust: bool, // Bit 2
    pub reserved_bit3: u1,          // Bit 3
    pub unit_code: u2,              // Bit 4-5
    pub reserved_high: u2,          // Bit 6-7
}

/// 错误字节位域（Byte 3）
///
/// - Bit 0-3: 未使用
/// - Bit 4-7: 故障码（0x5: Pirani 不可靠, 0x8: BA 故障, 0x9: Pirani 故障）
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, Default)]
pub struct ErrorByte {
    pub reserved_low: u4, // Bit 0-3
    pub fault_code: u4,   // Bit 4-7
}

// ============================================================================
// 压力换算
// ============================================================================

/// 把原始压力码换算为指定单位下的数值
///
/// ```rust
/// use bpg400_protocol::{PressureUnit, decode_pressure};
///
/// let p = decode_pressure(50000, PressureUnit::Mbar);
/// assert!((p - 1.0).abs() < 1e-9);
/// ```
pub fn decode_pressure(code: u16, unit: PressureUnit) -> f64 {
    10f64.powf(f64::from(code) / PRESSURE_CODE_DIVISOR - unit.log_offset())
}

// ============================================================================
// 测量结果
// ============================================================================

/// 单帧解码结果
///
/// 每个有效帧原子地构造一次，构造后不可变，整体替换上一次的快照。
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Measurement {
    /// 解码时刻（系统时间）
    pub timestamp: SystemTime,
    /// 单位字段无法识别
    pub decode_error: bool,
    /// 无传感器故障
    pub reliable: bool,
    /// 正在除气
    pub degassing: bool,
    /// 1000 mbar 校准标志
    pub thousand_mbar_adjust: bool,
    /// 发射电流
    pub emission_current: EmissionCurrent,
    /// 当前显示单位，`decode_error` 时为 `None`
    pub unit: Option<PressureUnit>,
    /// 原始压力码（0..=65535）
    pub pressure_raw: u16,
    /// `unit` 下的压力
    pub pressure: Option<f64>,
    /// 换算到 mbar 的压力
    pub pressure_mbar: Option<f64>,
    /// 固件版本（Byte 6 / 20）
    pub firmware_version: f64,
    /// 传感器故障
    pub fault: Option<SensorFault>,
}

impl Measurement {
    /// 从已校验的数据帧解码
    pub fn decode(frame: &RawFrame, timestamp: SystemTime) -> Self {
        let status = StatusByte::from(u8::new(frame.status()));
        let error = ErrorByte::from(u8::new(frame.error()));

        let emission_current = EmissionCurrent::from(status.emission());
        let unit = PressureUnit::try_from(status.unit_code().value()).ok();
        let fault = SensorFault::from_code(error.fault_code());

        let pressure_raw = frame.pressure_code();
        let pressure = unit.map(|u| decode_pressure(pressure_raw, u));
        let pressure_mbar = unit.zip(pressure).map(|(u, p)| u.to_mbar(p));

        Self {
            timestamp,
            decode_error: unit.is_none(),
            reliable: fault.is_none(),
            degassing: emission_current == EmissionCurrent::Degas,
            thousand_mbar_adjust: status.thousand_mbar_adjust(),
            emission_current,
            unit,
            pressure_raw,
            pressure,
            pressure_mbar,
            firmware_version: f64::from(frame.software_version()) / FIRMWARE_VERSION_DIVISOR,
            fault,
        }
    }

    /// 发射电流（安培），除气时为 `None`
    pub fn emission_current_amps(&self) -> Option<f64> {
        self.emission_current.amps()
    }

    pub fn error_poor_pirani(&self) -> bool {
        self.fault == Some(SensorFault::PoorPirani)
    }

    pub fn error_bayard_alpert(&self) -> bool {
        self.fault == Some(SensorFault::BayardAlpert)
    }

    pub fn error_pirani(&self) -> bool {
        self.fault == Some(SensorFault::Pirani)
    }

    /// 压力读数视图；单位无法识别时为 `None`
    pub fn reading(&self) -> Option<PressureReading> {
        Some(PressureReading {
            raw: self.pressure_raw,
            value: self.pressure?,
            unit: self.unit?,
            mbar: self.pressure_mbar?,
        })
    }
}

impl TryFrom<&[u8]> for Measurement {
    type Error = ProtocolError;

    /// 校验并解码，时间戳取当前时刻
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let frame = RawFrame::try_from(bytes)?;
        Ok(Self::decode(&frame, SystemTime::now()))
    }
}

/// 压力读数（原始码 + 显示单位数值 + mbar）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PressureReading {
    pub raw: u16,
    pub value: f64,
    pub unit: PressureUnit,
    pub mbar: f64,
}

impl fmt::Display for PressureReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:e} {}", self.value, self.unit)
    }
}
