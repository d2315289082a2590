//! Staging reads and handing them to the kernel.

use io_uring::{opcode, types};
use tracing::{debug, trace, warn};

use super::core::Ring;
use crate::error::{Result, RingError};

/// A single read to be staged: fill `len` bytes at `buf` from file offset
/// `offset`, and report the result under `tag`.
///
/// A request is only a description. Building one is safe; handing it to
/// [`Ring::prepare_read`] is where the buffer contract begins.
#[derive(Debug, Clone, Copy)]
pub struct ReadRequest {
    tag: u64,
    buf: *mut u8,
    len: usize,
    offset: u64,
}

impl ReadRequest {
    /// Describe a read that fills all of `buf`.
    pub fn new(tag: u64, buf: &mut [u8], offset: u64) -> Self {
        Self {
            tag,
            buf: buf.as_mut_ptr(),
            len: buf.len(),
            offset,
        }
    }

    /// Describe a read into raw memory.
    ///
    /// Nothing is checked here; [`Ring::prepare_read`] carries the contract.
    pub fn from_raw_parts(tag: u64, buf: *mut u8, len: usize, offset: u64) -> Self {
        Self {
            tag,
            buf,
            len,
            offset,
        }
    }

    /// Caller-chosen identifier echoed back in the completion.
    pub fn tag(&self) -> u64 {
        self.tag
    }

    /// Number of bytes requested.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the request asks for zero bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte offset in the bound file.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn checked_len(&self) -> Result<u32> {
        u32::try_from(self.len).map_err(|_| RingError::InvalidRequest {
            tag: self.tag,
            reason: "length exceeds u32::MAX",
        })
    }

    fn checked_offset(&self) -> Result<u64> {
        if self.offset > i64::MAX as u64 {
            return Err(RingError::InvalidRequest {
                tag: self.tag,
                reason: "offset exceeds i64::MAX",
            });
        }
        Ok(self.offset)
    }
}

impl Ring {
    /// Stage a read of `request.len()` bytes at `request.offset()` into the
    /// request's buffer. Nothing reaches the kernel until [`submit`](Ring::submit).
    ///
    /// Tags are not checked for uniqueness; duplicates simply make the
    /// completions indistinguishable.
    ///
    /// # Errors
    ///
    /// - [`RingError::QueueFull`] if every slot is already staged or queued;
    ///   the ring is unchanged
    /// - [`RingError::InvalidRequest`] if the length does not fit in `u32`
    ///   or the offset does not fit in `i64`
    ///
    /// # Safety
    ///
    /// The buffer must be valid for writes of `request.len()` bytes, and must
    /// stay valid and untouched by anything else until the completion
    /// carrying this request's tag has been harvested, or until the ring is
    /// closed without ever submitting the request. The kernel writes into it
    /// asynchronously after [`submit`](Ring::submit) returns.
    pub unsafe fn prepare_read(&mut self, request: &ReadRequest) -> Result<()> {
        let len = request.checked_len()?;
        let offset = request.checked_offset()?;

        if self.free_slots() == 0 {
            return Err(RingError::QueueFull {
                capacity: self.capacity(),
            });
        }

        let entry = opcode::Read::new(types::Fd(self.file.raw_fd()), request.buf, len)
            .offset(offset)
            .build()
            .user_data(request.tag);

        // Capacity was reserved at open; this never reallocates.
        self.staged.push(entry);

        trace!(
            tag = request.tag,
            offset,
            len,
            staged = self.staged.len(),
            "staged read"
        );
        Ok(())
    }

    /// Hand every staged request to the kernel.
    ///
    /// Returns how many requests the kernel accepted, which is 0 when
    /// nothing was staged. Requests a partial submit leaves behind stay
    /// queued and are retried by the next `submit` or
    /// [`wait_completion`](Ring::wait_completion).
    ///
    /// # Errors
    ///
    /// [`RingError::Submit`] carries the kernel's error and how many
    /// requests were accepted before it.
    pub fn submit(&mut self) -> Result<usize> {
        if self.staged.is_empty() && self.unsubmitted == 0 {
            return Ok(0);
        }

        let batch = self.staged.len();
        let queued = self.unsubmitted + batch;
        let capacity = self.capacity();
        {
            let mut sq = self.inner.submission();
            // SAFETY: every staged entry was built by `prepare_read`, whose
            // caller guarantees the buffer stays valid until completion.
            unsafe { sq.push_multiple(&self.staged) }
                .map_err(|_| RingError::QueueFull { capacity })?;
        }
        self.staged.clear();

        match self.inner.submit() {
            Ok(submitted) => {
                self.record_submitted(submitted);
                debug!(
                    batch,
                    submitted,
                    in_flight = self.accounting.in_flight,
                    "submitted reads"
                );
                Ok(submitted)
            }
            Err(source) => {
                self.unsubmitted = self.inner.submission().len();
                let submitted = queued.saturating_sub(self.unsubmitted);
                self.accounting.record_submitted(submitted);
                warn!(submitted, queued, error = %source, "submit failed");
                Err(RingError::Submit { submitted, source })
            }
        }
    }

    /// Account for requests the kernel consumed and resync the leftover count.
    pub(super) fn record_submitted(&mut self, submitted: usize) {
        self.accounting.record_submitted(submitted);
        self.unsubmitted = self.inner.submission().len();
    }
}
