//! 子命令定义和实现

pub mod config;
pub mod monitor;

pub use config::{CliConfig, ConfigCommand};
pub use monitor::MonitorCommand;
