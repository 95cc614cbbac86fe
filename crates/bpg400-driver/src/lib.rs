//! # BPG400 Driver
//!
//! BPG400 真空计的驱动层：
//! - 9 字节数据帧的同步与校验（[`FrameDecoder`]）
//! - 后台解码线程（[`decode_loop`]），逐字节读取链路
//! - 最新测量的无锁发布与快照（[`MeasurementStore`]，ArcSwap）
//! - 指令同步写出（单位切换、除气）
//!
//! # Example
//!
//! ```no_run
//! use bpg400_driver::Bpg400Builder;
//! use bpg400_protocol::PressureUnit;
//! use std::time::Duration;
//!
//! let mut gauge = Bpg400Builder::new().port("/dev/ttyUSB0").build()?;
//! gauge.send_set_unit(PressureUnit::Torr)?;
//! if let Some(reading) = gauge.wait_for_measurement(Duration::from_secs(2))?.reading() {
//!     println!("{}", reading);
//! }
//! gauge.stop();
//! # Ok::<(), bpg400_driver::DriverError>(())
//! ```

pub mod buffer;
#[cfg(feature = "serial")]
mod builder;
pub mod decoder;
mod error;
mod gauge;
pub mod metrics;
pub mod pipeline;
pub mod state;

pub use buffer::{ByteRingBuffer, StreamBuffer};
#[cfg(feature = "serial")]
pub use builder::Bpg400Builder;
pub use decoder::{DecoderStats, FrameDecoder};
pub use error::{BufferError, DriverError};
pub use gauge::Bpg400;
pub use metrics::{GaugeMetrics, MetricsSnapshot};
pub use pipeline::{DecoderConfig, decode_loop};
pub use state::{GaugeContext, MeasurementStore};
