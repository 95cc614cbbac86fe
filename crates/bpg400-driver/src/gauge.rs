//! BPG400 驱动对外 API

use crate::error::DriverError;
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{DecoderConfig, decode_loop};
use crate::state::GaugeContext;
use bpg400_link::{Link, LinkWriter};
use bpg400_protocol::{CommandFrame, GaugeCapabilities, Measurement, PressureReading, PressureUnit};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// 带超时的线程 join
///
/// 超时或目标线程 panic 都映射为 [`DriverError::IoThread`]。
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> Result<(), DriverError>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> Result<(), DriverError> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();
        let name = self.thread().name().unwrap_or("unnamed").to_string();

        // 看门狗线程代为 join，超时后它会继续等待直到目标线程结束
        spawn(move || {
            let _ = tx.send(self.join().is_ok());
        });

        match rx.recv_timeout(timeout) {
            Ok(true) => Ok(()),
            Ok(false) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(DriverError::IoThread(format!("thread {} panicked", name)))
            },
            Err(mpsc::RecvTimeoutError::Timeout) => Err(DriverError::IoThread(format!(
                "thread {} did not exit within {:?}",
                name, timeout
            ))),
        }
    }
}

type SharedWriter = Mutex<Option<Box<dyn LinkWriter + Send>>>;

/// BPG400 真空计驱动
///
/// 持有后台解码线程和链路写端。读取接口全部基于同一份测量快照，
/// 不会看到跨帧混杂的字段；指令在调用线程上同步写出。
///
/// # Example
///
/// ```no_run
/// use bpg400_driver::Bpg400Builder;
/// use std::time::Duration;
///
/// let gauge = Bpg400Builder::new().port("/dev/ttyUSB0").build()?;
/// let m = gauge.wait_for_measurement(Duration::from_secs(1))?;
/// println!("{:?} {:?}", m.pressure, m.unit);
/// # Ok::<(), bpg400_driver::DriverError>(())
/// ```
pub struct Bpg400 {
    ctx: Arc<GaugeContext>,
    writer: SharedWriter,
    decoder_thread: Option<JoinHandle<()>>,
    is_running: Arc<AtomicBool>,
    capabilities: GaugeCapabilities,
    join_timeout: Duration,
}

impl Bpg400 {
    /// 在已打开的链路上启动解码线程
    pub fn start<L: Link>(link: L, config: DecoderConfig) -> Result<Self, DriverError> {
        Self::start_with_capabilities(link, config, GaugeCapabilities::BPG400)
    }

    /// 同 [`start`](Self::start)，但使用自定义能力声明
    pub fn start_with_capabilities<L: Link>(
        link: L,
        config: DecoderConfig,
        capabilities: GaugeCapabilities,
    ) -> Result<Self, DriverError> {
        let (reader, writer) = link.split()?;

        let ctx = Arc::new(GaugeContext::new());
        let is_running = Arc::new(AtomicBool::new(true));
        let join_timeout = Duration::from_millis(config.join_timeout_ms);

        let ctx_clone = ctx.clone();
        let is_running_clone = is_running.clone();
        let decoder_thread = std::thread::Builder::new()
            .name("bpg400-decoder".into())
            .spawn(move || decode_loop(reader, ctx_clone, config, is_running_clone))
            .map_err(|e| DriverError::IoThread(e.to_string()))?;

        info!("{} decoder started", capabilities.device_type);

        Ok(Self {
            ctx,
            writer: Mutex::new(Some(Box::new(writer))),
            decoder_thread: Some(decoder_thread),
            is_running,
            capabilities,
            join_timeout,
        })
    }

    /// 最新测量的副本；首帧到达前为 `None`
    pub fn latest_measurement(&self) -> Option<Measurement> {
        self.ctx.measurements.snapshot().map(|m| m.as_ref().clone())
    }

    /// 当前压力读数
    ///
    /// 首帧到达前或单位字段无法解码时为 `None`。
    pub fn pressure(&self) -> Option<PressureReading> {
        self.ctx.measurements.snapshot()?.reading()
    }

    /// 设备当前的显示单位
    pub fn unit(&self) -> Option<PressureUnit> {
        self.ctx.measurements.snapshot()?.unit
    }

    pub fn firmware_version(&self) -> Option<f64> {
        self.ctx.measurements.snapshot().map(|m| m.firmware_version)
    }

    pub fn device_type(&self) -> &'static str {
        self.capabilities.device_type
    }

    pub fn capabilities(&self) -> &GaugeCapabilities {
        &self.capabilities
    }

    /// 阻塞直到收到第一条测量（1ms 轮询）
    ///
    /// 已有测量时立即返回；超时返回 [`DriverError::Timeout`]。
    pub fn wait_for_measurement(&self, timeout: Duration) -> Result<Measurement, DriverError> {
        let start = Instant::now();

        loop {
            if let Some(m) = self.latest_measurement() {
                return Ok(m);
            }
            if start.elapsed() >= timeout {
                return Err(DriverError::Timeout);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// 发送单位切换指令（不等待设备确认）
    pub fn send_set_unit(&self, unit: PressureUnit) -> Result<(), DriverError> {
        if !self.capabilities.supports_unit(unit) {
            return Err(DriverError::Unsupported(format!(
                "unit {} on {}",
                unit, self.capabilities.device_type
            )));
        }
        self.send_command(CommandFrame::set_unit(unit))
    }

    /// 发送除气开/关指令（不等待设备确认）
    pub fn send_degas(&self, enable: bool) -> Result<(), DriverError> {
        if !self.capabilities.has_degas {
            return Err(DriverError::Unsupported(format!(
                "degas on {}",
                self.capabilities.device_type
            )));
        }
        self.send_command(CommandFrame::degas(enable))
    }

    /// 同步写出一条指令帧
    ///
    /// 写端在 `stop()` 后已释放，此时返回 [`DriverError::NotConnected`]。
    pub fn send_command(&self, command: CommandFrame) -> Result<(), DriverError> {
        let bytes = command.to_bytes();
        let mut guard = self.writer.lock();
        let writer = guard.as_mut().ok_or(DriverError::NotConnected)?;

        writer.write(&bytes)?;
        debug!("Tx command: {}", hex::encode(bytes));
        self.ctx.metrics.commands_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// 解码线程是否仍在运行
    ///
    /// 链路故障或 `stop()` 后为 false。
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// 导致解码线程退出的链路错误
    pub fn last_error(&self) -> Option<String> {
        self.ctx.last_error()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    /// 停止解码线程并释放写端
    ///
    /// 可重复调用。返回后不再有新的测量发布，后续指令返回 `NotConnected`。
    pub fn stop(&mut self) {
        // Release: 之前的写入对看到 false 的解码线程可见
        self.is_running.store(false, Ordering::Release);

        if let Some(mut writer) = self.writer.lock().take()
            && let Err(e) = writer.close()
        {
            warn!("Failed to close link writer: {}", e);
        }

        if let Some(handle) = self.decoder_thread.take() {
            match handle.join_timeout(self.join_timeout) {
                Ok(()) => info!("{} decoder stopped", self.capabilities.device_type),
                Err(e) => error!("Failed to stop decoder: {}", e),
            }
        }
    }
}

impl Drop for Bpg400 {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpg400_link::{LinkError, LinkReader};
    use std::sync::atomic::AtomicUsize;

    // 读端永远超时，写端记录写入
    struct SilentReader;

    impl LinkReader for SilentReader {
        fn read_byte(&mut self, timeout: Duration) -> Result<u8, LinkError> {
            std::thread::sleep(timeout);
            Err(LinkError::Timeout)
        }
    }

    struct CountingWriter(Arc<AtomicUsize>);

    impl LinkWriter for CountingWriter {
        fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
            self.0.fetch_add(bytes.len(), Ordering::SeqCst);
            Ok(())
        }
    }

    struct SilentLink(Arc<AtomicUsize>);

    impl Link for SilentLink {
        type Reader = SilentReader;
        type Writer = CountingWriter;

        fn split(self) -> Result<(SilentReader, CountingWriter), LinkError> {
            Ok((SilentReader, CountingWriter(self.0)))
        }
    }

    struct BrokenLink;

    impl Link for BrokenLink {
        type Reader = SilentReader;
        type Writer = CountingWriter;

        fn split(self) -> Result<(SilentReader, CountingWriter), LinkError> {
            Err(LinkError::NotConnected)
        }
    }

    fn config() -> DecoderConfig {
        DecoderConfig {
            read_timeout_ms: 5,
            join_timeout_ms: 500,
        }
    }

    #[test]
    fn test_join_timeout_reports_thread_errors() {
        let quick = std::thread::spawn(|| {});
        assert!(quick.join_timeout(Duration::from_secs(1)).is_ok());

        let panicking = std::thread::Builder::new()
            .name("panicking".into())
            .spawn(|| panic!("boom"))
            .unwrap();
        match panicking.join_timeout(Duration::from_secs(1)) {
            Err(DriverError::IoThread(msg)) => assert!(msg.contains("panicking"), "{}", msg),
            other => panic!("unexpected result: {:?}", other),
        }

        let slow = std::thread::spawn(|| std::thread::sleep(Duration::from_millis(200)));
        match slow.join_timeout(Duration::from_millis(10)) {
            Err(DriverError::IoThread(msg)) => assert!(msg.contains("did not exit"), "{}", msg),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_start_fails_when_link_unusable() {
        let result = Bpg400::start(BrokenLink, config());
        assert!(matches!(
            result,
            Err(DriverError::Link(LinkError::NotConnected))
        ));
    }

    #[test]
    fn test_views_empty_before_first_frame() {
        let gauge = Bpg400::start(SilentLink(Arc::default()), config()).unwrap();
        assert!(gauge.is_running());
        assert!(gauge.latest_measurement().is_none());
        assert!(gauge.pressure().is_none());
        assert!(gauge.unit().is_none());
        assert!(gauge.firmware_version().is_none());
        assert_eq!(gauge.device_type(), "BPG400");
        assert!(matches!(
            gauge.wait_for_measurement(Duration::from_millis(10)),
            Err(DriverError::Timeout)
        ));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let written = Arc::new(AtomicUsize::new(0));
        let mut gauge = Bpg400::start(SilentLink(written.clone()), config()).unwrap();

        gauge.send_degas(true).unwrap();
        assert_eq!(written.load(Ordering::SeqCst), 5);
        assert_eq!(gauge.metrics().commands_sent, 1);

        gauge.stop();
        assert!(!gauge.is_running());
        gauge.stop();

        assert!(matches!(
            gauge.send_set_unit(PressureUnit::Mbar),
            Err(DriverError::NotConnected)
        ));
        assert_eq!(written.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_unsupported_requests_are_rejected() {
        let caps = GaugeCapabilities {
            device_type: "BPG400-NODEGAS",
            has_degas: false,
            supported_units: &[PressureUnit::Mbar],
            ..GaugeCapabilities::BPG400
        };
        let written = Arc::new(AtomicUsize::new(0));
        let gauge =
            Bpg400::start_with_capabilities(SilentLink(written.clone()), config(), caps).unwrap();

        assert!(matches!(gauge.send_degas(true), Err(DriverError::Unsupported(_))));
        assert!(matches!(
            gauge.send_set_unit(PressureUnit::Torr),
            Err(DriverError::Unsupported(_))
        ));
        gauge.send_set_unit(PressureUnit::Mbar).unwrap();
        assert_eq!(written.load(Ordering::SeqCst), 5);
    }
}
