//! 协议常量定义
//!
//! BPG400 RS-232 接口的固定帧格式常量（9600 8N1，无握手）。

// ============================================================================
// 数据帧（设备 → 主机，9 字节，约 50 ms 一帧）
// ============================================================================

/// 数据帧长度（字节）
pub const FRAME_LEN: usize = 9;

/// Byte 0：同步字节
pub const SYNC_BYTE: u8 = 7;

/// Byte 1：页号
pub const PAGE_BYTE: u8 = 5;

/// Byte 7：传感器类型（BPG400 = 10）
pub const SENSOR_TYPE_BYTE: u8 = 10;

/// 同步字节偏移
pub const SYNC_OFFSET: usize = 0;

/// 页号偏移
pub const PAGE_OFFSET: usize = 1;

/// 传感器类型偏移
pub const SENSOR_TYPE_OFFSET: usize = 7;

/// 校验和偏移（Byte 8 = Byte 1..=7 之和 mod 256）
pub const CHECKSUM_OFFSET: usize = 8;

// ============================================================================
// 指令帧（主机 → 设备，5 字节）
// ============================================================================

/// 指令帧长度（字节）
pub const COMMAND_LEN: usize = 5;

/// 指令帧 Byte 0：有效数据长度
pub const COMMAND_LENGTH_BYTE: u8 = 3;

/// 指令帧 Byte 1：写参数服务号
pub const COMMAND_SERVICE_WRITE: u8 = 16;

/// 参数号：显示单位
pub const PARAM_UNIT: u8 = 62;

/// 参数号：除气（Degas）
pub const PARAM_DEGAS: u8 = 93;

/// 除气参数值：开启
pub const DEGAS_ON: u8 = 148;

/// 除气参数值：关闭
pub const DEGAS_OFF: u8 = 105;

// ============================================================================
// 压力换算
// ============================================================================

/// 原始压力码的对数步长：p = 10^(raw / 4000 - offset)
pub const PRESSURE_CODE_DIVISOR: f64 = 4000.0;

/// mbar 对数偏移
pub const LOG_OFFSET_MBAR: f64 = 12.5;

/// Torr 对数偏移
pub const LOG_OFFSET_TORR: f64 = 12.625;

/// Pa 对数偏移
pub const LOG_OFFSET_PASCAL: f64 = 10.5;

/// 1 Torr = 1.33322 mbar
pub const MBAR_PER_TORR: f64 = 1.33322;

/// 1 Pa = 0.01 mbar
pub const MBAR_PER_PASCAL: f64 = 0.01;

/// 发射电流：25 µA
pub const EMISSION_CURRENT_LOW_A: f64 = 25e-6;

/// 发射电流：5 mA
pub const EMISSION_CURRENT_HIGH_A: f64 = 5e-3;

/// 固件版本编码因子（Byte 6 / 20）
pub const FIRMWARE_VERSION_DIVISOR: f64 = 20.0;
