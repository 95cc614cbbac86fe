//! 设备能力声明
//!
//! 上层（真空计通用抽象）据此决定哪些单位/操作可用。

use crate::PressureUnit;

/// 真空计能力
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeCapabilities {
    /// 设备型号
    pub device_type: &'static str,
    /// 测量范围下限（mbar）
    pub min_mbar: f64,
    /// 测量范围上限（mbar）
    pub max_mbar: f64,
    /// 是否支持除气
    pub has_degas: bool,
    /// 支持的显示单位
    pub supported_units: &'static [PressureUnit],
}

impl GaugeCapabilities {
    /// BPG400：5e-10 … 1000 mbar，支持除气，三种单位
    pub const BPG400: Self = Self {
        device_type: "BPG400",
        min_mbar: 5e-10,
        max_mbar: 1e3,
        has_degas: true,
        supported_units: &[PressureUnit::Mbar, PressureUnit::Torr, PressureUnit::Pascal],
    };

    /// 单位是否受支持
    pub fn supports_unit(&self, unit: PressureUnit) -> bool {
        self.supported_units.contains(&unit)
    }

    /// 压力（mbar）是否落在声明的测量范围内
    pub fn contains_mbar(&self, mbar: f64) -> bool {
        (self.min_mbar..=self.max_mbar).contains(&mbar)
    }
}

impl Default for GaugeCapabilities {
    fn default() -> Self {
        Self::BPG400
    }
}
