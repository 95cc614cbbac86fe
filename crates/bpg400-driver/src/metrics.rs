//! 链路健康指标
//!
//! 原子计数器，解码线程写入，任意线程读取，不引入锁竞争。

use crate::decoder::DecoderStats;
use std::sync::atomic::{AtomicU64, Ordering};

/// BPG400 运行时指标
///
/// ```rust
/// use bpg400_driver::GaugeMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = GaugeMetrics::new();
/// metrics.frames_decoded.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().frames_decoded, 1);
/// ```
#[derive(Debug, Default)]
pub struct GaugeMetrics {
    /// 从链路读到的字节数
    pub bytes_received: AtomicU64,

    /// 单字节读超时次数（设备静默时属于正常现象）
    pub read_timeouts: AtomicU64,

    /// 成功解码并发布的测量数
    pub frames_decoded: AtomicU64,

    /// 指纹匹配但校验和错误的窗口数
    pub checksum_failures: AtomicU64,

    /// 重同步丢弃的字节数
    pub bytes_resynced: AtomicU64,

    /// `decode_error` 置位的测量数（单位代码未定义）
    pub decode_errors: AtomicU64,

    /// 成功写出的指令数
    pub commands_sent: AtomicU64,
}

impl GaugeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 把两次解码器统计之间的增量累加进来
    pub(crate) fn record_decoder(&self, before: DecoderStats, after: DecoderStats) {
        let resynced = after.bytes_resynced - before.bytes_resynced;
        if resynced > 0 {
            self.bytes_resynced.fetch_add(resynced, Ordering::Relaxed);
        }
        let failures = after.checksum_failures - before.checksum_failures;
        if failures > 0 {
            self.checksum_failures.fetch_add(failures, Ordering::Relaxed);
        }
    }

    /// 获取指标快照
    ///
    /// 各计数器分别读取，彼此之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            read_timeouts: self.read_timeouts.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            checksum_failures: self.checksum_failures.load(Ordering::Relaxed),
            bytes_resynced: self.bytes_resynced.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.bytes_received.store(0, Ordering::Relaxed);
        self.read_timeouts.store(0, Ordering::Relaxed);
        self.frames_decoded.store(0, Ordering::Relaxed);
        self.checksum_failures.store(0, Ordering::Relaxed);
        self.bytes_resynced.store(0, Ordering::Relaxed);
        self.decode_errors.store(0, Ordering::Relaxed);
        self.commands_sent.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bytes_received: u64,
    pub read_timeouts: u64,
    pub frames_decoded: u64,
    pub checksum_failures: u64,
    pub bytes_resynced: u64,
    pub decode_errors: u64,
    pub commands_sent: u64,
}

impl MetricsSnapshot {
    /// 被丢弃字节占接收字节的百分比
    ///
    /// 校验失败每次丢弃 1 字节，与重同步一并计入。`bytes_received` 为 0 时返回 0.0。
    pub fn discard_rate(&self) -> f64 {
        if self.bytes_received == 0 {
            return 0.0;
        }
        let discarded = self.bytes_resynced + self.checksum_failures;
        (discarded as f64 / self.bytes_received as f64) * 100.0
    }
}
