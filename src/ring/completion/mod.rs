//! Completion queue processing for the Ring.

use tracing::debug;

use super::core::Ring;
use crate::error::{Result, RingError};

mod result;

pub use result::Completion;
pub(crate) use result::result_to_io;

impl Ring {
    /// Block until a completion is available and return it.
    ///
    /// Requests left queued by a partial submit are submitted along the way;
    /// requests only staged with [`prepare_read`](Ring::prepare_read) are
    /// not. The returned guard must be acknowledged (or dropped) before the
    /// ring can be used again.
    ///
    /// # Errors
    ///
    /// - [`RingError::NothingInFlight`] if no request could ever complete,
    ///   instead of blocking forever
    /// - [`RingError::Wait`] if the kernel reports an error, including
    ///   `EINTR` when a signal interrupts the wait
    pub fn wait_completion(&mut self) -> Result<Completion<'_>> {
        if self.accounting.in_flight == 0 && self.unsubmitted == 0 {
            return Err(RingError::NothingInFlight);
        }

        while self.inner.completion().is_empty() {
            let submitted = self
                .inner
                .submit_and_wait(1)
                .map_err(|source| RingError::Wait { source })?;
            if submitted > 0 {
                debug!(submitted, "submitted leftover reads while waiting");
                self.record_submitted(submitted);
            }
        }

        self.try_completion().ok_or(RingError::NothingInFlight)
    }

    /// Return a completion if one is ready, without blocking.
    pub fn try_completion(&mut self) -> Option<Completion<'_>> {
        let mut queue = self.inner.completion();
        let entry = queue.next()?;
        Some(Completion::new(queue, entry, &mut self.accounting))
    }
}
