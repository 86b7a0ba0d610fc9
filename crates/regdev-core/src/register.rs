//! Bounded byte register
//!
//! The register holds at most `capacity` bytes. When read as a message its
//! content ends at the first zero byte (or at the end of the stored bytes).
//! Callers mutate it only through a lock held by the owning device.

use crate::error::{RegError, RegResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    bytes: Vec<u8>,
    capacity: usize,
}

impl Register {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Register pre-filled with `text`, truncated to `capacity`
    pub fn with_content(capacity: usize, text: &[u8]) -> Self {
        let mut reg = Self::new(capacity);
        reg.replace(text);
        reg
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored bytes, including any embedded zero bytes
    #[inline]
    pub fn raw(&self) -> &[u8] {
        &self.bytes
    }

    /// Content up to (not including) the first zero byte
    pub fn message(&self) -> &[u8] {
        match self.bytes.iter().position(|&b| b == 0) {
            Some(end) => &self.bytes[..end],
            None => &self.bytes,
        }
    }

    /// Replace the content with the first `min(data.len(), capacity)` bytes.
    ///
    /// Returns how many bytes were taken; the rest are dropped.
    pub fn replace(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.capacity);
        self.bytes.clear();
        self.bytes.extend_from_slice(&data[..n]);
        n
    }

    /// Store a zero-terminated message.
    ///
    /// Takes bytes up to the first zero, bounded by `capacity`; a missing
    /// terminator just means the whole slice (clamped) is the message.
    pub fn set_message(&mut self, text: &[u8]) -> usize {
        let end = text
            .iter()
            .take(self.capacity)
            .position(|&b| b == 0)
            .unwrap_or_else(|| text.len().min(self.capacity));
        self.replace(&text[..end])
    }

    /// Byte at `index`, bounds-checked against capacity.
    ///
    /// Positions past the current content but inside capacity read as 0.
    pub fn byte_at(&self, index: usize) -> RegResult<u8> {
        if index >= self.capacity {
            return Err(RegError::OutOfRange {
                index,
                len: self.capacity,
            });
        }
        Ok(self.bytes.get(index).copied().unwrap_or(0))
    }

    /// Copy message bytes starting at `offset` into `out`.
    ///
    /// Returns the number of bytes copied (0 when `offset` is at or past
    /// the end of the message).
    pub fn copy_message(&self, offset: usize, out: &mut [u8]) -> usize {
        let msg = self.message();
        if offset >= msg.len() {
            return 0;
        }
        let n = (msg.len() - offset).min(out.len());
        out[..n].copy_from_slice(&msg[offset..offset + n]);
        n
    }
}
