//! 指令帧构建
//!
//! 主机 → 设备的 5 字节写参数帧：`[3, 16, param, value, checksum]`，
//! 校验和为 Byte 1..=3 之和 mod 256。设备不回 ACK，生效与否只能从后续数据帧判断。

use crate::constants::*;
use crate::{PressureUnit, checksum};

/// 写参数指令帧
///
/// # 示例
///
/// ```rust
/// use bpg400_protocol::{CommandFrame, PressureUnit};
///
/// let cmd = CommandFrame::set_unit(PressureUnit::Torr);
/// assert_eq!(cmd.to_bytes(), [3, 16, 62, 1, 79]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    pub param: u8, // Byte 2: 参数号
    pub value: u8, // Byte 3: 参数值
}

impl CommandFrame {
    /// 切换显示单位
    pub fn set_unit(unit: PressureUnit) -> Self {
        Self {
            param: PARAM_UNIT,
            value: unit as u8,
        }
    }

    /// 开启/关闭除气
    pub fn degas(enable: bool) -> Self {
        Self {
            param: PARAM_DEGAS,
            value: if enable { DEGAS_ON } else { DEGAS_OFF },
        }
    }

    /// 编码为线上字节
    pub fn to_bytes(self) -> [u8; COMMAND_LEN] {
        let mut data = [
            COMMAND_LENGTH_BYTE,
            COMMAND_SERVICE_WRITE,
            self.param,
            self.value,
            0,
        ];
        data[4] = checksum(&data[1..4]);
        data
    }
}
