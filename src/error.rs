//! Error types and handling for ring operations.
//!
//! Every failure of the ring itself (opening, queue setup, staging,
//! submission, waiting) is a [`RingError`]. The outcome of an individual read
//! is *not* an error at this level: it travels inside the completion as a
//! signed result code, so one failed read never aborts the ring or the other
//! requests in flight.

use std::collections::TryReserveError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for ring operations.
pub type Result<T> = std::result::Result<T, RingError>;

/// Error type for ring operations.
///
/// # Design Notes
///
/// - Uses `thiserror` for the `Error` and `Display` implementations
/// - Construction failures (`Open`, `QueueInit`, `Allocation`,
///   `InvalidCapacity`, `InvalidCqEntries`) never leave a half-built ring
///   behind
/// - All variants are `Send + Sync`
#[derive(Debug, Error)]
pub enum RingError {
    /// The file to bind could not be opened.
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        /// Path that was passed to the open call
        path: PathBuf,
        /// Underlying OS error
        source: io::Error,
    },

    /// The kernel refused to set up the queue pair.
    ///
    /// Typical causes are memlock limits, `kernel.io_uring_disabled`, or a
    /// seccomp profile that filters `io_uring_setup`.
    #[error("failed to initialize io_uring with {entries} entries: {source}")]
    QueueInit {
        /// Requested number of submission entries
        entries: u32,
        /// Underlying OS error
        source: io::Error,
    },

    /// Bookkeeping memory for the staging area could not be reserved.
    #[error("failed to allocate ring bookkeeping: {0}")]
    Allocation(#[from] TryReserveError),

    /// Requested capacity is zero or above the kernel maximum.
    #[error("invalid ring capacity {entries}: must be between 1 and {max}", max = crate::config::MAX_ENTRIES)]
    InvalidCapacity {
        /// Requested number of submission entries
        entries: u32,
    },

    /// Requested completion queue size is smaller than the submission queue
    /// or above the kernel maximum.
    #[error("invalid completion queue size {cq_entries} for {entries} submission entries: must be between {entries} and {max}", max = 2 * crate::config::MAX_ENTRIES)]
    InvalidCqEntries {
        /// Requested number of completion entries
        cq_entries: u32,
        /// Requested number of submission entries
        entries: u32,
    },

    /// Every submission slot is already taken by a staged request.
    #[error("submission queue is full ({capacity} slots in use)")]
    QueueFull {
        /// Capacity of the submission queue
        capacity: u32,
    },

    /// A read request cannot be expressed as a submission entry.
    #[error("invalid read request (tag {tag}): {reason}")]
    InvalidRequest {
        /// Tag of the rejected request
        tag: u64,
        /// Why the request was rejected
        reason: &'static str,
    },

    /// The kernel rejected the batch.
    ///
    /// Batches are not atomic: `submitted` entries were accepted and are in
    /// flight even though the call failed.
    #[error("failed to submit batch ({submitted} entries accepted): {source}")]
    Submit {
        /// Entries the kernel accepted before the failure
        submitted: usize,
        /// Underlying OS error
        source: io::Error,
    },

    /// The blocking wait for a completion failed or was interrupted.
    #[error("failed to wait for completion: {source}")]
    Wait {
        /// Underlying OS error
        source: io::Error,
    },

    /// A wait was requested while no request is in flight.
    #[error("no requests in flight to wait for")]
    NothingInFlight,

    /// The operation needs an idle ring but requests are still outstanding.
    #[error("ring has {count} requests staged or in flight")]
    OperationsInFlight {
        /// Number of outstanding requests
        count: usize,
    },

    /// Standard I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RingError {
    /// Returns `true` when the host refuses to create an io_uring at all.
    ///
    /// Kernels built without io_uring report `ENOSYS`; the
    /// `kernel.io_uring_disabled` sysctl and container seccomp profiles
    /// report `EPERM` or `EACCES`.
    pub fn is_unsupported(&self) -> bool {
        match self {
            RingError::QueueInit { source, .. } => matches!(
                source.raw_os_error(),
                Some(libc::ENOSYS) | Some(libc::EPERM) | Some(libc::EACCES)
            ),
            _ => false,
        }
    }

    /// Returns `true` when a blocking wait was cut short by a signal.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, RingError::Wait { source } if source.kind() == io::ErrorKind::Interrupted)
    }
}

static_assertions::assert_impl_all!(RingError: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io::{Error as IoError, ErrorKind};

    mod error_messages {
        use super::*;

        #[test]
        fn open_includes_path() {
            let error = RingError::Open {
                path: PathBuf::from("/data/test.fvecs"),
                source: IoError::from(ErrorKind::NotFound),
            };
            let message = error.to_string();
            assert!(message.starts_with("failed to open /data/test.fvecs"));
        }

        #[test]
        fn invalid_cq_entries_names_both_sizes() {
            let error = RingError::InvalidCqEntries {
                cq_entries: 8,
                entries: 16,
            };
            assert_eq!(
                error.to_string(),
                "invalid completion queue size 8 for 16 submission entries: must be between 16 and 65536"
            );
        }

        #[test]
        fn queue_full() {
            let error = RingError::QueueFull { capacity: 8 };
            assert_eq!(error.to_string(), "submission queue is full (8 slots in use)");
        }

        #[test]
        fn invalid_capacity_names_limit() {
            let error = RingError::InvalidCapacity { entries: 0 };
            assert_eq!(
                error.to_string(),
                "invalid ring capacity 0: must be between 1 and 32768"
            );
        }

        #[test]
        fn submit_reports_partial_count() {
            let error = RingError::Submit {
                submitted: 3,
                source: IoError::from_raw_os_error(libc::EBUSY),
            };
            assert!(error.to_string().contains("3 entries accepted"));
        }

        #[test]
        fn nothing_in_flight() {
            assert_eq!(
                RingError::NothingInFlight.to_string(),
                "no requests in flight to wait for"
            );
        }

        #[test]
        fn operations_in_flight() {
            let error = RingError::OperationsInFlight { count: 5 };
            assert_eq!(error.to_string(), "ring has 5 requests staged or in flight");
        }
    }

    mod classification {
        use super::*;

        #[test]
        fn queue_init_eperm_is_unsupported() {
            let error = RingError::QueueInit {
                entries: 8,
                source: IoError::from_raw_os_error(libc::EPERM),
            };
            assert!(error.is_unsupported());
        }

        #[test]
        fn queue_init_enomem_is_not_unsupported() {
            let error = RingError::QueueInit {
                entries: 8,
                source: IoError::from_raw_os_error(libc::ENOMEM),
            };
            assert!(!error.is_unsupported());
        }

        #[test]
        fn wait_eintr_is_interrupted() {
            let error = RingError::Wait {
                source: IoError::from_raw_os_error(libc::EINTR),
            };
            assert!(error.is_interrupted());
            assert!(!RingError::NothingInFlight.is_interrupted());
        }
    }

    mod error_traits {
        use super::*;

        #[test]
        fn io_error_conversion() {
            let error = RingError::from(IoError::new(ErrorKind::PermissionDenied, "denied"));
            let RingError::Io(ref inner) = error else {
                panic!("Expected Io error variant");
            };
            assert_eq!(inner.kind(), ErrorKind::PermissionDenied);
            assert!(error.to_string().contains("I/O error"));
        }

        #[test]
        fn preserves_error_source() {
            let error = RingError::Wait {
                source: IoError::new(ErrorKind::Interrupted, "signal"),
            };
            let source = error.source().expect("wait error has a source");
            let io_err = source.downcast_ref::<IoError>().unwrap();
            assert_eq!(io_err.kind(), ErrorKind::Interrupted);
        }

        #[test]
        fn simple_errors_have_no_source() {
            assert!(RingError::NothingInFlight.source().is_none());
            assert!(RingError::QueueFull { capacity: 4 }.source().is_none());
        }

        #[test]
        fn allocation_error_conversion() {
            let reserve_error = Vec::<u8>::new().try_reserve(usize::MAX).unwrap_err();
            let error = RingError::from(reserve_error);
            assert!(matches!(error, RingError::Allocation(_)));
            assert!(error.source().is_some());
        }
    }
}
