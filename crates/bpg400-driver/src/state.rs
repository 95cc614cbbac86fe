//! 测量状态存储
//!
//! 最新测量通过 `ArcSwapOption` 整体替换：读者拿到的要么是旧记录、要么是新记录，
//! 永远不会看到字段混杂的半更新状态。

use crate::metrics::GaugeMetrics;
use arc_swap::ArcSwapOption;
use bpg400_protocol::Measurement;
use parking_lot::Mutex;
use std::sync::Arc;

/// 单槽位测量存储
///
/// 单写者（解码线程）、多读者。发布前 [`snapshot`](Self::snapshot) 返回 `None`。
#[derive(Debug, Default)]
pub struct MeasurementStore {
    latest: ArcSwapOption<Measurement>,
}

impl MeasurementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 原子替换最新测量
    pub fn publish(&self, measurement: Measurement) {
        self.latest.store(Some(Arc::new(measurement)));
    }

    /// 最新测量的共享引用（无锁）
    pub fn snapshot(&self) -> Option<Arc<Measurement>> {
        self.latest.load_full()
    }
}

/// 解码线程与前台共享的上下文
#[derive(Debug, Default)]
pub struct GaugeContext {
    pub measurements: MeasurementStore,
    pub metrics: GaugeMetrics,
    /// 导致解码线程退出的最后一个链路错误
    last_error: Mutex<Option<String>>,
}

impl GaugeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_last_error(&self, message: impl Into<String>) {
        *self.last_error.lock() = Some(message.into());
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpg400_protocol::RawFrame;
    use std::time::SystemTime;

    fn measurement(code: u16) -> Measurement {
        let [hi, lo] = code.to_be_bytes();
        let mut bytes = [7, 5, 0, 0, hi, lo, 20, 10, 0];
        bytes[8] = RawFrame::expected_checksum(&bytes);
        let frame = RawFrame::try_from(bytes).unwrap();
        Measurement::decode(&frame, SystemTime::now())
    }

    #[test]
    fn test_store_empty_before_publish() {
        let store = MeasurementStore::new();
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn test_publish_replaces_previous() {
        let store = MeasurementStore::new();
        store.publish(measurement(1000));
        let first = store.snapshot().unwrap();
        store.publish(measurement(2000));

        // 旧快照不受后续发布影响
        assert_eq!(first.pressure_raw, 1000);
        assert_eq!(store.snapshot().unwrap().pressure_raw, 2000);
    }

    #[test]
    fn test_context_last_error() {
        let ctx = GaugeContext::new();
        assert!(ctx.last_error().is_none());
        ctx.set_last_error("link closed");
        assert_eq!(ctx.last_error().as_deref(), Some("link closed"));
    }
}
