//! 后台解码循环
//!
//! 逐字节读取链路，交给 [`FrameDecoder`] 成帧，解码后发布到 [`MeasurementStore`]。
//!
//! [`MeasurementStore`]: crate::state::MeasurementStore

use crate::decoder::FrameDecoder;
use crate::state::GaugeContext;
use bpg400_link::LinkReader;
use bpg400_protocol::Measurement;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, trace, warn};

/// 解码线程配置
///
/// # Example
///
/// ```
/// use bpg400_driver::DecoderConfig;
///
/// let config = DecoderConfig {
///     read_timeout_ms: 50,
///     ..Default::default()
/// };
/// assert_eq!(config.join_timeout_ms, 2000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// 单字节读超时（毫秒），同时决定 stop 的最长响应延迟
    pub read_timeout_ms: u64,
    /// stop 时等待解码线程退出的上限（毫秒）
    pub join_timeout_ms: u64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 100,
            join_timeout_ms: 2000,
        }
    }
}

/// 解码线程主循环
///
/// 每次迭代检查 `is_running`；读超时只计数后继续。
/// 致命链路错误会记录到 `ctx`，清除 `is_running` 并退出，已发布的测量保持不变。
pub fn decode_loop(
    mut reader: impl LinkReader,
    ctx: Arc<GaugeContext>,
    config: DecoderConfig,
    is_running: Arc<AtomicBool>,
) {
    let read_timeout = Duration::from_millis(config.read_timeout_ms);
    let mut decoder = FrameDecoder::new();
    let metrics = &ctx.metrics;

    loop {
        // Acquire: 看到 false 时必须同时看到 stop 之前的写入
        if !is_running.load(Ordering::Acquire) {
            trace!("Decoder thread: is_running flag is false, exiting");
            break;
        }

        let byte = match reader.read_byte(read_timeout) {
            Ok(byte) => {
                metrics.bytes_received.fetch_add(1, Ordering::Relaxed);
                byte
            },
            Err(e) if !e.is_fatal() => {
                metrics.read_timeouts.fetch_add(1, Ordering::Relaxed);
                continue;
            },
            Err(e) => {
                // 停止过程中读端被关闭属于正常退出
                if !is_running.load(Ordering::Acquire) {
                    trace!("Decoder thread: read failed during shutdown: {}", e);
                    break;
                }
                error!("Decoder thread: fatal link error: {}", e);
                ctx.set_last_error(e.to_string());
                // Release: last_error 对看到 false 的线程可见
                is_running.store(false, Ordering::Release);
                break;
            },
        };

        let before = decoder.stats();
        let frame = decoder.feed(byte);
        let after = decoder.stats();
        metrics.record_decoder(before, after);
        if after.bytes_resynced > before.bytes_resynced {
            warn!(
                "Resync: discarded {} bytes",
                after.bytes_resynced - before.bytes_resynced
            );
        }

        let Some(frame) = frame else {
            continue;
        };

        trace!("Rx frame: {}", hex::encode(frame.as_bytes()));

        let measurement = Measurement::decode(&frame, SystemTime::now());
        if measurement.decode_error {
            warn!("Undefined pressure unit in status byte 0x{:02X}", frame.status());
            metrics.decode_errors.fetch_add(1, Ordering::Relaxed);
        } else if let Some(reading) = measurement.reading() {
            debug!("Measurement: {}", reading);
        }

        ctx.measurements.publish(measurement);
        metrics.frames_decoded.fetch_add(1, Ordering::Relaxed);
    }

    trace!("Decoder thread: loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpg400_link::{LinkDeviceError, LinkDeviceErrorKind, LinkError};
    use bpg400_protocol::{PressureUnit, RawFrame};
    use std::collections::VecDeque;
    use std::thread;

    enum Scripted {
        Byte(u8),
        Timeout,
        Fail,
    }

    /// 按脚本返回字节的读端，脚本耗尽后一直超时
    struct ScriptedReader {
        script: VecDeque<Scripted>,
    }

    impl ScriptedReader {
        fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
            Self {
                script: script.into_iter().collect(),
            }
        }
    }

    impl LinkReader for ScriptedReader {
        fn read_byte(&mut self, timeout: Duration) -> Result<u8, LinkError> {
            match self.script.pop_front() {
                Some(Scripted::Byte(b)) => Ok(b),
                Some(Scripted::Fail) => Err(LinkError::Device(LinkDeviceError::new(
                    LinkDeviceErrorKind::NoDevice,
                    "unplugged",
                ))),
                Some(Scripted::Timeout) | None => {
                    thread::sleep(timeout);
                    Err(LinkError::Timeout)
                },
            }
        }
    }

    fn frame_bytes(status: u8, code: u16) -> [u8; 9] {
        let [hi, lo] = code.to_be_bytes();
        let mut bytes = [7, 5, status, 0, hi, lo, 20, 10, 0];
        bytes[8] = RawFrame::expected_checksum(&bytes);
        bytes
    }

    fn bytes(data: &[u8]) -> Vec<Scripted> {
        data.iter().map(|&b| Scripted::Byte(b)).collect()
    }

    fn config() -> DecoderConfig {
        DecoderConfig {
            read_timeout_ms: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_decoder_config_default() {
        let config = DecoderConfig::default();
        assert_eq!(config.read_timeout_ms, 100);
        assert_eq!(config.join_timeout_ms, 2000);
    }

    #[test]
    fn test_fatal_error_stops_loop_and_keeps_last_measurement() {
        let mut script = bytes(&frame_bytes(0x10, 40000));
        script.push(Scripted::Timeout);
        script.push(Scripted::Fail);

        let ctx = Arc::new(GaugeContext::new());
        let is_running = Arc::new(AtomicBool::new(true));
        let started = SystemTime::now();
        decode_loop(
            ScriptedReader::new(script),
            ctx.clone(),
            config(),
            is_running.clone(),
        );

        assert!(!is_running.load(Ordering::Acquire));
        assert!(ctx.last_error().unwrap().contains("unplugged"));

        let latest = ctx.measurements.snapshot().unwrap();
        assert_eq!(latest.unit, Some(PressureUnit::Torr));
        assert_eq!(latest.pressure_raw, 40000);
        // 时间戳取自解码时刻
        assert!(latest.timestamp >= started);
        assert!(latest.timestamp <= SystemTime::now());

        let snapshot = ctx.metrics.snapshot();
        assert_eq!(snapshot.bytes_received, 9);
        assert_eq!(snapshot.frames_decoded, 1);
        assert_eq!(snapshot.read_timeouts, 1);
    }

    #[test]
    fn test_noise_and_bad_checksum_are_counted() {
        let good = frame_bytes(0x00, 1000);
        let mut bad = good;
        bad[8] = bad[8].wrapping_add(1);

        let mut data = vec![0xAA, 0xBB];
        data.extend_from_slice(&bad);
        data.extend_from_slice(&good);
        let mut script = bytes(&data);
        script.push(Scripted::Fail);

        let ctx = Arc::new(GaugeContext::new());
        let is_running = Arc::new(AtomicBool::new(true));
        decode_loop(ScriptedReader::new(script), ctx.clone(), config(), is_running);

        let snapshot = ctx.metrics.snapshot();
        assert_eq!(snapshot.frames_decoded, 1);
        assert_eq!(snapshot.checksum_failures, 1);
        // 2 字节前导噪声 + 坏帧剩余的 8 字节
        assert_eq!(snapshot.bytes_resynced, 10);
        assert_eq!(ctx.measurements.snapshot().unwrap().pressure_raw, 1000);
    }

    #[test]
    fn test_decode_error_is_published() {
        // 单位代码 3 未定义
        let mut script = bytes(&frame_bytes(0x30, 1000));
        script.push(Scripted::Fail);

        let ctx = Arc::new(GaugeContext::new());
        decode_loop(
            ScriptedReader::new(script),
            ctx.clone(),
            config(),
            Arc::new(AtomicBool::new(true)),
        );

        let latest = ctx.measurements.snapshot().unwrap();
        assert!(latest.decode_error);
        assert_eq!(ctx.metrics.snapshot().decode_errors, 1);
    }

    #[test]
    fn test_loop_exits_when_flag_cleared() {
        let ctx = Arc::new(GaugeContext::new());
        let is_running = Arc::new(AtomicBool::new(true));

        let handle = {
            let ctx = ctx.clone();
            let is_running = is_running.clone();
            thread::spawn(move || {
                decode_loop(ScriptedReader::new(Vec::new()), ctx, config(), is_running)
            })
        };

        thread::sleep(Duration::from_millis(20));
        is_running.store(false, Ordering::Release);
        handle.join().unwrap();

        assert!(ctx.last_error().is_none());
        assert!(ctx.measurements.snapshot().is_none());
    }
}
