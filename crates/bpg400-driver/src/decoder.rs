//! 帧同步解码器
//!
//! 在无长度前缀、无转义的字节流上定位 9 字节数据帧：
//!
//! ```text
//! AWAIT_BYTES ──(≥9)──▶ SCAN ──(指纹匹配)──▶ VALIDATE ──(校验通过)──▶ read(9)
//!      ▲                 │ discard(1)            │ discard(1)
//!      └─────────────────┴───────────────────────┘
//! ```
//!
//! 校验失败时只丢弃 1 个字节而不是整个窗口：偶然匹配指纹的噪声窗口内部
//! 可能藏着真正的帧头，整窗丢弃会把它一起吞掉。

use crate::buffer::{ByteRingBuffer, StreamBuffer};
use bpg400_protocol::{
    CHECKSUM_OFFSET, FRAME_LEN, PAGE_BYTE, PAGE_OFFSET, RawFrame, SENSOR_TYPE_BYTE,
    SENSOR_TYPE_OFFSET, SYNC_BYTE, SYNC_OFFSET,
};
use tracing::{debug, trace};

/// 解码器累计统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// 通过校验的帧数
    pub frames: u64,
    /// 指纹匹配但校验失败的次数（每次丢弃 1 字节）
    pub checksum_failures: u64,
    /// 指纹搜索中丢弃的字节数
    pub bytes_resynced: u64,
}

/// 帧同步解码器
///
/// 独占其 [`StreamBuffer`]；新建的解码器从空缓冲区开始总是安全的。
#[derive(Debug)]
pub struct FrameDecoder<B: StreamBuffer = ByteRingBuffer> {
    buffer: B,
    stats: DecoderStats,
}

impl FrameDecoder<ByteRingBuffer> {
    pub fn new() -> Self {
        Self::with_buffer(ByteRingBuffer::with_capacity(2 * FRAME_LEN))
    }
}

impl Default for FrameDecoder<ByteRingBuffer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: StreamBuffer> FrameDecoder<B> {
    pub fn with_buffer(buffer: B) -> Self {
        Self {
            buffer,
            stats: DecoderStats::default(),
        }
    }

    /// 追加一个字节并尝试提取一帧
    pub fn feed(&mut self, byte: u8) -> Option<RawFrame> {
        self.buffer.push(byte);
        self.try_extract()
    }

    /// 依次喂入多个字节，返回提取出的全部帧
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Vec<RawFrame> {
        bytes.iter().filter_map(|&b| self.feed(b)).collect()
    }

    /// 对当前缓冲区做一次提取尝试
    pub fn try_extract(&mut self) -> Option<RawFrame> {
        if self.buffer.available() < FRAME_LEN {
            return None;
        }

        // SCAN：逐字节滑动，不跳过任何对齐位置
        let mut skipped = 0u64;
        while self.buffer.available() >= FRAME_LEN && !self.fingerprint_at_head() {
            self.buffer.discard(1);
            skipped += 1;
        }
        if skipped > 0 {
            self.stats.bytes_resynced += skipped;
            trace!("Resync: skipped {} bytes searching for fingerprint", skipped);
        }

        if self.buffer.available() < FRAME_LEN {
            return None;
        }

        // VALIDATE
        let window = self.peek_window()?;
        let expected = RawFrame::expected_checksum(&window);
        if expected != window[CHECKSUM_OFFSET] {
            debug!(
                "Checksum mismatch (expected 0x{:02X}, got 0x{:02X}), discarding 1 byte",
                expected, window[CHECKSUM_OFFSET]
            );
            self.buffer.discard(1);
            self.stats.checksum_failures += 1;
            return None;
        }

        // 整帧一次性消费
        let bytes: [u8; FRAME_LEN] = self.buffer.read().ok()?;
        self.stats.frames += 1;
        RawFrame::try_from(bytes).ok()
    }

    /// 已缓存但尚未成帧的字节数
    pub fn pending(&self) -> usize {
        self.buffer.available()
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// 丢弃所有缓存字节（统计保留）
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    fn fingerprint_at_head(&self) -> bool {
        self.buffer.peek(SYNC_OFFSET) == Ok(SYNC_BYTE)
            && self.buffer.peek(PAGE_OFFSET) == Ok(PAGE_BYTE)
            && self.buffer.peek(SENSOR_TYPE_OFFSET) == Ok(SENSOR_TYPE_BYTE)
    }

    fn peek_window(&self) -> Option<[u8; FRAME_LEN]> {
        let mut window = [0u8; FRAME_LEN];
        for (i, slot) in window.iter_mut().enumerate() {
            *slot = self.buffer.peek(i).ok()?;
        }
        Some(window)
    }
}
