//! 流缓冲区
//!
//! 解码器只通过 [`StreamBuffer`] 接口访问缓存的字节：追加、窥视、丢弃、读出。
//! 未完成的半帧在循环迭代之间保留在这里。

use crate::error::BufferError;
use std::collections::VecDeque;

/// 字节流缓冲区接口
pub trait StreamBuffer {
    /// 追加一个字节
    fn push(&mut self, byte: u8);

    /// 已缓存字节数
    fn available(&self) -> usize;

    /// 读取 `offset` 处的字节但不消费
    fn peek(&self, offset: usize) -> Result<u8, BufferError>;

    /// 丢弃开头的 `n` 个字节（不足时清空）
    fn discard(&mut self, n: usize);

    /// 读出并移除开头恰好 `N` 个字节
    fn read<const N: usize>(&mut self) -> Result<[u8; N], BufferError>;

    /// 清空
    fn clear(&mut self) {
        let n = self.available();
        self.discard(n);
    }
}

/// 基于 `VecDeque` 的无上限环形缓冲区
#[derive(Debug, Default, Clone)]
pub struct ByteRingBuffer {
    bytes: VecDeque<u8>,
}

impl ByteRingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: VecDeque::with_capacity(capacity),
        }
    }
}

impl StreamBuffer for ByteRingBuffer {
    #[inline]
    fn push(&mut self, byte: u8) {
        self.bytes.push_back(byte);
    }

    #[inline]
    fn available(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    fn peek(&self, offset: usize) -> Result<u8, BufferError> {
        self.bytes.get(offset).copied().ok_or(BufferError::Underflow {
            requested: offset + 1,
            available: self.bytes.len(),
        })
    }

    fn discard(&mut self, n: usize) {
        let n = n.min(self.bytes.len());
        self.bytes.drain(..n);
    }

    fn read<const N: usize>(&mut self) -> Result<[u8; N], BufferError> {
        if N > self.bytes.len() {
            return Err(BufferError::Underflow {
                requested: N,
                available: self.bytes.len(),
            });
        }

        let mut out = [0u8; N];
        for (dst, src) in out.iter_mut().zip(self.bytes.drain(..N)) {
            *dst = src;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(bytes: &[u8]) -> ByteRingBuffer {
        let mut buf = ByteRingBuffer::new();
        for &b in bytes {
            buf.push(b);
        }
        buf
    }

    #[test]
    fn test_push_peek_available() {
        let buf = filled(&[1, 2, 3]);
        assert_eq!(buf.available(), 3);
        assert_eq!(buf.peek(0), Ok(1));
        assert_eq!(buf.peek(2), Ok(3));
        // peek 不消费
        assert_eq!(buf.available(), 3);
    }

    #[test]
    fn test_peek_out_of_range_leaves_buffer_unchanged() {
        let buf = filled(&[1, 2]);
        assert_eq!(
            buf.peek(2),
            Err(BufferError::Underflow {
                requested: 3,
                available: 2
            })
        );
        assert_eq!(buf.available(), 2);
    }

    #[test]
    fn test_discard() {
        let mut buf = filled(&[1, 2, 3, 4]);
        buf.discard(1);
        assert_eq!(buf.peek(0), Ok(2));
        buf.discard(10);
        assert_eq!(buf.available(), 0);
    }

    #[test]
    fn test_read_exact() {
        let mut buf = filled(&[1, 2, 3, 4]);
        let head: [u8; 3] = buf.read().unwrap();
        assert_eq!(head, [1, 2, 3]);
        assert_eq!(buf.available(), 1);
        assert_eq!(buf.peek(0), Ok(4));
    }

    #[test]
    fn test_read_underflow_leaves_buffer_unchanged() {
        let mut buf = filled(&[1, 2]);
        assert_eq!(
            buf.read::<3>(),
            Err(BufferError::Underflow {
                requested: 3,
                available: 2
            })
        );
        assert_eq!(buf.available(), 2);
    }

    #[test]
    fn test_clear() {
        let mut buf = filled(&[9; 16]);
        buf.clear();
        assert_eq!(buf.available(), 0);
    }
}
