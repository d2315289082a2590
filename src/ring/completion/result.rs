//! The completion guard handed out by the ring.

use std::fmt;
use std::io;

use io_uring::cqueue::{self, CompletionQueue};
use tracing::trace;

use crate::ring::core::Accounting;

/// Convert a raw completion result into bytes read or the OS error.
pub(crate) fn result_to_io(result: i32) -> io::Result<usize> {
    if result < 0 {
        Err(io::Error::from_raw_os_error(-result))
    } else {
        Ok(result as usize)
    }
}

/// One harvested completion, borrowed from the ring until acknowledged.
///
/// The entry stays visible in the kernel's completion queue until
/// [`acknowledge`](Completion::acknowledge) is called or the guard is
/// dropped; only then does the slot become reusable. Because the guard
/// mutably borrows the ring, no other ring operation is possible while it
/// is alive.
#[must_use = "a completion is acknowledged as soon as it is dropped"]
pub struct Completion<'ring> {
    queue: CompletionQueue<'ring>,
    entry: cqueue::Entry,
    accounting: &'ring mut Accounting,
}

impl<'ring> Completion<'ring> {
    pub(in crate::ring) fn new(
        queue: CompletionQueue<'ring>,
        entry: cqueue::Entry,
        accounting: &'ring mut Accounting,
    ) -> Self {
        Self {
            queue,
            entry,
            accounting,
        }
    }

    /// The tag of the request this completion belongs to.
    pub fn tag(&self) -> u64 {
        self.entry.user_data()
    }

    /// Raw result: bytes read when non-negative, negated errno otherwise.
    pub fn result(&self) -> i32 {
        self.entry.result()
    }

    /// The result as bytes read or the OS error that failed the read.
    pub fn io_result(&self) -> io::Result<usize> {
        result_to_io(self.result())
    }

    /// Whether the read succeeded, including a zero-byte read.
    pub fn is_success(&self) -> bool {
        self.result() >= 0
    }

    /// Whether the read returned zero bytes (offset at or past end of file).
    pub fn is_eof(&self) -> bool {
        self.result() == 0
    }

    /// Mark the completion as consumed and release its queue slot.
    ///
    /// Equivalent to dropping the guard.
    pub fn acknowledge(self) {}
}

impl fmt::Debug for Completion<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("tag", &self.tag())
            .field("result", &self.result())
            .finish()
    }
}

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        self.accounting.record_completion(self.entry.result());
        // Publishes the advanced head to the kernel.
        self.queue.sync();
        trace!(
            tag = self.entry.user_data(),
            result = self.entry.result(),
            in_flight = self.accounting.in_flight,
            "acknowledged completion"
        );
    }
}
