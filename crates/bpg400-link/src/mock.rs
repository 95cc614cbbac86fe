//! 内存 Mock 链路
//!
//! 测试通过 [`MockHandle`] 注入字节流或链路故障，并检查写出的指令字节。

use crate::{Link, LinkDeviceError, LinkDeviceErrorKind, LinkError, LinkReader, LinkWriter};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

enum MockEvent {
    Byte(u8),
    Fail(LinkDeviceError),
}

/// Mock 链路（拆分前）
pub struct MockLink {
    rx: Receiver<MockEvent>,
    written: Arc<Mutex<Vec<u8>>>,
    write_fails: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

/// 测试侧控制句柄
#[derive(Clone)]
pub struct MockHandle {
    tx: Sender<MockEvent>,
    written: Arc<Mutex<Vec<u8>>>,
    write_fails: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl MockLink {
    /// 创建链路和对应的控制句柄
    pub fn new() -> (Self, MockHandle) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let written = Arc::new(Mutex::new(Vec::new()));
        let write_fails = Arc::new(AtomicBool::new(false));
        let closed = Arc::new(AtomicBool::new(false));

        let link = Self {
            rx,
            written: written.clone(),
            write_fails: write_fails.clone(),
            closed: closed.clone(),
        };
        let handle = MockHandle {
            tx,
            written,
            write_fails,
            closed,
        };
        (link, handle)
    }
}

impl MockHandle {
    /// 追加设备发出的字节
    pub fn feed(&self, bytes: &[u8]) {
        for &b in bytes {
            // 读端已退出时丢弃即可
            let _ = self.tx.send(MockEvent::Byte(b));
        }
    }

    /// 在当前字节流之后注入一次致命链路错误
    pub fn fail(&self, message: &str) {
        let _ = self.tx.send(MockEvent::Fail(LinkDeviceError::new(
            LinkDeviceErrorKind::NoDevice,
            message,
        )));
    }

    /// 让后续写操作失败
    pub fn set_write_fails(&self, fail: bool) {
        self.write_fails.store(fail, Ordering::Relaxed);
    }

    /// 已写出的全部字节
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().clone()
    }

    /// 写端是否已关闭
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Link for MockLink {
    type Reader = MockReader;
    type Writer = MockWriter;

    fn split(self) -> Result<(MockReader, MockWriter), LinkError> {
        Ok((
            MockReader { rx: self.rx },
            MockWriter {
                written: self.written,
                write_fails: self.write_fails,
                closed: self.closed,
            },
        ))
    }
}

/// Mock 读端
pub struct MockReader {
    rx: Receiver<MockEvent>,
}

impl LinkReader for MockReader {
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, LinkError> {
        match self.rx.recv_timeout(timeout) {
            Ok(MockEvent::Byte(b)) => Ok(b),
            Ok(MockEvent::Fail(e)) => Err(LinkError::Device(e)),
            Err(RecvTimeoutError::Timeout) => Err(LinkError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(LinkError::Closed),
        }
    }
}

/// Mock 写端
pub struct MockWriter {
    written: Arc<Mutex<Vec<u8>>>,
    write_fails: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl LinkWriter for MockWriter {
    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LinkError::NotConnected);
        }
        if self.write_fails.load(Ordering::Relaxed) {
            return Err(LinkError::Device(LinkDeviceError::new(
                LinkDeviceErrorKind::Backend,
                "mock write failure",
            )));
        }
        self.written.lock().extend_from_slice(bytes);
        Ok(())
    }

    fn close(&mut self) -> Result<(), LinkError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
