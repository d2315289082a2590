//! Per-read results of a batch.

use std::io;

use crate::ring::completion::result_to_io;

/// Result of one read in a [`ReadBatch`](super::ReadBatch).
#[derive(Debug)]
pub struct ReadOutcome {
    pub(super) tag: u64,
    pub(super) offset: u64,
    pub(super) result: i32,
    pub(super) buf: Vec<u8>,
}

impl ReadOutcome {
    pub(super) fn new(tag: u64, offset: u64, result: i32, mut buf: Vec<u8>) -> Self {
        let filled = usize::try_from(result).unwrap_or(0).min(buf.len());
        buf.truncate(filled);
        Self {
            tag,
            offset,
            result,
            buf,
        }
    }

    /// Position of the read in its batch.
    pub fn tag(&self) -> u64 {
        self.tag
    }

    /// File offset the read started at.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Raw completion result: bytes read, or negated errno.
    pub fn result(&self) -> i32 {
        self.result
    }

    /// Bytes read or the OS error that failed the read.
    pub fn io_result(&self) -> io::Result<usize> {
        result_to_io(self.result)
    }

    /// Whether the read started at or past end of file.
    pub fn is_eof(&self) -> bool {
        self.result == 0
    }

    /// The bytes actually read. Empty on failure.
    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    /// Take the buffer, truncated to the bytes actually read.
    pub fn into_buffer(self) -> Vec<u8> {
        self.buf
    }
}
