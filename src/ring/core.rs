//! Core Ring implementation: setup, descriptor ownership and teardown.

use std::cell::Cell;
use std::fmt;
use std::fs::File;
use std::marker::PhantomData;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::path::Path;

use io_uring::{squeue, IoUring};
use tracing::{debug, warn};

use crate::config::{DescriptorPolicy, RingConfig};
use crate::error::{Result, RingError};

/// Cumulative counters for one ring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingStats {
    /// Requests accepted by the kernel
    pub submitted: u64,
    /// Completions acknowledged
    pub completed: u64,
    /// Completions that carried a negative result
    pub failed: u64,
    /// Completions that read zero bytes
    pub eof: u64,
    /// Total bytes reported by successful completions
    pub bytes_read: u64,
}

/// In-flight tracking shared between the ring and an outstanding completion.
#[derive(Debug, Default)]
pub(super) struct Accounting {
    pub(super) in_flight: usize,
    pub(super) stats: RingStats,
}

impl Accounting {
    pub(super) fn record_submitted(&mut self, submitted: usize) {
        self.in_flight += submitted;
        self.stats.submitted += submitted as u64;
    }

    pub(super) fn record_completion(&mut self, result: i32) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.stats.completed += 1;
        match result {
            r if r < 0 => self.stats.failed += 1,
            0 => self.stats.eof += 1,
            r => self.stats.bytes_read += r as u64,
        }
    }
}

/// The descriptor a ring reads from, released according to its policy.
pub(super) struct BoundFile {
    fd: Option<OwnedFd>,
    raw: RawFd,
    policy: DescriptorPolicy,
}

impl BoundFile {
    fn new(fd: OwnedFd, policy: DescriptorPolicy) -> Self {
        Self {
            raw: fd.as_raw_fd(),
            fd: Some(fd),
            policy,
        }
    }

    #[inline]
    pub(super) fn raw_fd(&self) -> RawFd {
        self.raw
    }
}

impl Drop for BoundFile {
    fn drop(&mut self) {
        if let Some(fd) = self.fd.take() {
            if self.policy == DescriptorPolicy::Keep {
                // Released, not closed.
                let _ = std::os::fd::IntoRawFd::into_raw_fd(fd);
            }
        }
    }
}

/// One io_uring queue pair bound to one open file, for read-only workloads.
///
/// A `Ring` is created by [`Ring::open`], [`Ring::open_with_config`] or
/// [`Ring::from_fd`], and torn down by [`Ring::close`] or by dropping it.
/// While it exists it is always fully usable: construction never returns a
/// half-initialized ring, and the closed state is unrepresentable because
/// `close` consumes `self`.
///
/// # Protocol
///
/// 1. Stage reads with [`prepare_read`](Ring::prepare_read). Nothing reaches
///    the kernel yet.
/// 2. Hand the staged batch to the kernel with [`submit`](Ring::submit).
/// 3. Harvest results one at a time with
///    [`wait_completion`](Ring::wait_completion). Each returned
///    [`Completion`](crate::Completion) borrows the ring until it is
///    acknowledged, so at most one completion is ever outstanding.
/// 4. [`close`](Ring::close) the ring.
///
/// Completions arrive in the order the kernel finishes them, not in
/// submission order; correlate them by tag.
///
/// # Threading
///
/// `Ring` is `Send` but not `Sync`: move it to the worker thread that
/// drives it, or wrap it in a lock. Use one ring per worker when batches
/// must run concurrently.
///
/// # Example
///
/// ```rust,no_run
/// use ringread::{ReadRequest, Ring};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut ring = Ring::open("test.fvecs", 8)?;
/// let mut first = vec![0u8; 400];
/// let mut second = vec![0u8; 400];
///
/// // SAFETY: both buffers outlive the loop below, which harvests every completion.
/// unsafe {
///     ring.prepare_read(&ReadRequest::new(0, &mut first, 0))?;
///     ring.prepare_read(&ReadRequest::new(1, &mut second, 5200))?;
/// }
/// ring.submit()?;
///
/// for _ in 0..2 {
///     let completion = ring.wait_completion()?;
///     println!("tag {} -> {:?}", completion.tag(), completion.io_result());
///     completion.acknowledge();
/// }
/// ring.close();
/// # Ok(())
/// # }
/// ```
pub struct Ring {
    // Dropped before `file`: the queue pair goes first, then the descriptor.
    pub(super) inner: IoUring,
    pub(super) file: BoundFile,
    pub(super) staged: Vec<squeue::Entry>,
    // Entries pushed to the kernel queue that a partial submit left behind.
    pub(super) unsubmitted: usize,
    pub(super) accounting: Accounting,
    _not_sync: PhantomData<Cell<()>>,
}

impl fmt::Debug for Ring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ring")
            .field("fd", &self.file.raw_fd())
            .field("capacity", &self.capacity())
            .field("staged", &self.staged.len())
            .field("in_flight", &self.accounting.in_flight)
            .field("policy", &self.file.policy)
            .finish()
    }
}

impl Ring {
    /// Open `path` read-only and bind it to a new ring with `entries`
    /// submission slots.
    ///
    /// The descriptor is closed when the ring is closed. Use
    /// [`open_with_config`](Ring::open_with_config) to keep it instead.
    ///
    /// # Errors
    ///
    /// - [`RingError::InvalidCapacity`] if `entries` is 0 or above 32768
    /// - [`RingError::Open`] if the file cannot be opened
    /// - [`RingError::QueueInit`] if the kernel refuses the queue pair
    /// - [`RingError::Allocation`] if bookkeeping memory is unavailable
    pub fn open<P: AsRef<Path>>(path: P, entries: u32) -> Result<Self> {
        Self::open_with_config(path, &RingConfig::with_entries(entries))
    }

    /// Open `path` read-only and bind it to a ring described by `config`.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: &RingConfig) -> Result<Self> {
        config.validate()?;

        let path = path.as_ref();
        let file = File::open(path).map_err(|source| RingError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Self::bind(OwnedFd::from(file), config)
    }

    /// Bind an already-open descriptor to a new ring.
    ///
    /// Ownership of `fd` moves into the ring. With
    /// [`DescriptorPolicy::Keep`] it is handed back by [`close`](Ring::close);
    /// with [`DescriptorPolicy::Close`] it is closed on teardown. If
    /// construction fails, the descriptor is closed under either policy:
    /// the error carries nothing to hand it back in.
    pub fn from_fd(fd: OwnedFd, config: &RingConfig) -> Result<Self> {
        Self::bind(fd, config)
    }

    fn bind(fd: OwnedFd, config: &RingConfig) -> Result<Self> {
        // Every early return closes the descriptor; the policy applies only
        // once the ring exists.
        let mut file = BoundFile::new(fd, DescriptorPolicy::Close);
        config.validate()?;

        let inner = Self::build_queue(config)?;
        let capacity = inner.params().sq_entries();

        let mut staged = Vec::new();
        staged.try_reserve_exact(capacity as usize)?;
        file.policy = config.descriptor;

        debug!(
            fd = file.raw_fd(),
            requested = config.entries,
            sq_entries = capacity,
            cq_entries = inner.params().cq_entries(),
            policy = ?config.descriptor,
            "ring opened"
        );

        Ok(Self {
            inner,
            file,
            staged,
            unsubmitted: 0,
            accounting: Accounting::default(),
            _not_sync: PhantomData,
        })
    }

    fn build_queue(config: &RingConfig) -> Result<IoUring> {
        let mut builder: io_uring::Builder = IoUring::builder();
        if let Some(cq_entries) = config.cq_entries {
            builder.setup_cqsize(cq_entries);
        }

        builder
            .build(config.entries)
            .map_err(|source| RingError::QueueInit {
                entries: config.entries,
                source,
            })
    }

    /// Release the queue pair and apply the descriptor policy.
    ///
    /// Returns the bound descriptor under [`DescriptorPolicy::Keep`], `None`
    /// under [`DescriptorPolicy::Close`]. Requests still staged are
    /// discarded; requests still in flight are abandoned, and their buffers
    /// may be written by the kernel after this returns.
    pub fn close(mut self) -> Option<OwnedFd> {
        let fd = self.file.fd.take();
        let policy = self.file.policy;
        drop(self);

        match policy {
            DescriptorPolicy::Close => None,
            DescriptorPolicy::Keep => fd,
        }
    }

    /// Number of submission slots (the requested capacity rounded up to a
    /// power of two).
    pub fn capacity(&self) -> u32 {
        self.inner.params().sq_entries()
    }

    /// Number of requests staged but not yet submitted.
    pub fn staged(&self) -> usize {
        self.staged.len()
    }

    /// Number of requests submitted whose completion has not been
    /// acknowledged yet.
    pub fn in_flight(&self) -> usize {
        self.accounting.in_flight
    }

    /// Number of requests that can still be staged before submitting.
    pub fn free_slots(&self) -> usize {
        (self.capacity() as usize).saturating_sub(self.staged.len() + self.unsubmitted)
    }

    /// Cumulative counters since the ring was opened.
    pub fn stats(&self) -> RingStats {
        self.accounting.stats
    }

    /// What closing this ring does to the bound descriptor.
    pub fn descriptor_policy(&self) -> DescriptorPolicy {
        self.file.policy
    }

    /// Completion queue statistics as `(ready, capacity)`.
    pub fn completion_queue_stats(&mut self) -> (usize, usize) {
        let cq = self.inner.completion();
        (cq.len(), cq.capacity())
    }
}

impl AsRawFd for Ring {
    fn as_raw_fd(&self) -> RawFd {
        self.file.raw_fd()
    }
}

impl AsFd for Ring {
    fn as_fd(&self) -> BorrowedFd<'_> {
        // SAFETY: the descriptor stays open until the ring is closed or dropped,
        // both of which end this borrow.
        unsafe { BorrowedFd::borrow_raw(self.file.raw_fd()) }
    }
}

impl Drop for Ring {
    fn drop(&mut self) {
        let staged = self.staged.len() + self.unsubmitted;
        let in_flight = self.accounting.in_flight;
        if staged > 0 || in_flight > 0 {
            warn!(
                fd = self.file.raw_fd(),
                staged,
                in_flight,
                "ring closed with outstanding requests; their buffers may still be written"
            );
        }
        debug!(fd = self.file.raw_fd(), stats = ?self.accounting.stats, "ring closed");
    }
}

static_assertions::assert_impl_all!(Ring: Send);
static_assertions::assert_not_impl_any!(Ring: Sync);
