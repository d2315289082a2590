//! Core batch functionality: the `ReadBatch` container and its driver.

use std::io;
use std::mem;

use tracing::{debug, warn};

use super::result::ReadOutcome;
use crate::error::{Result, RingError};
use crate::ring::core::Ring;
use crate::ring::submission::ReadRequest;

#[derive(Debug)]
struct PlannedRead {
    offset: u64,
    buf: Vec<u8>,
}

/// An ordered set of reads against one file. Each read's tag is its
/// position in the batch.
#[derive(Debug, Default)]
pub struct ReadBatch {
    reads: Vec<PlannedRead>,
}

impl ReadBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty batch with room for `capacity` reads.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            reads: Vec::with_capacity(capacity),
        }
    }

    /// Add a read of `len` bytes at `offset` into a fresh zeroed buffer.
    /// Returns the read's tag.
    pub fn push(&mut self, offset: u64, len: usize) -> u64 {
        self.push_buffer(offset, vec![0; len])
    }

    /// Add a read that fills `buf` from `offset`. Returns the read's tag.
    pub fn push_buffer(&mut self, offset: u64, buf: Vec<u8>) -> u64 {
        let tag = self.reads.len() as u64;
        self.reads.push(PlannedRead { offset, buf });
        tag
    }

    /// Number of reads in the batch.
    pub fn len(&self) -> usize {
        self.reads.len()
    }

    /// Whether the batch holds no reads.
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    /// Sum of all requested lengths.
    pub fn total_bytes(&self) -> usize {
        self.reads.iter().map(|read| read.buf.len()).sum()
    }
}

impl Ring {
    /// Run every read in `batch` to completion and return the outcomes
    /// ordered by tag.
    ///
    /// Batches larger than the ring's capacity are fed through in windows:
    /// each harvested completion frees a slot for the next read. A failed
    /// read is reported in its [`ReadOutcome`], not as an error.
    ///
    /// # Errors
    ///
    /// - [`RingError::OperationsInFlight`] if the ring has staged or
    ///   in-flight requests of its own
    /// - any submit or wait error; buffers of reads the kernel may still
    ///   write are then leaked rather than freed
    pub fn read_batch(&mut self, batch: ReadBatch) -> Result<Vec<ReadOutcome>> {
        let count = self.staged.len() + self.unsubmitted + self.accounting.in_flight;
        if count > 0 {
            return Err(RingError::OperationsInFlight { count });
        }

        let mut reads = batch.reads;
        let mut results: Vec<Option<i32>> = vec![None; reads.len()];
        let mut started = 0;

        if let Err(error) = self.drive_batch(&mut reads, &mut results, &mut started) {
            self.staged.clear();
            let mut leaked = 0;
            for (read, result) in reads.into_iter().zip(&results).take(started) {
                if result.is_none() {
                    mem::forget(read.buf);
                    leaked += 1;
                }
            }
            warn!(
                %error,
                started,
                leaked,
                "read batch aborted; buffers of unfinished reads leaked"
            );
            return Err(error);
        }

        debug!(reads = reads.len(), stats = ?self.accounting.stats, "read batch complete");

        Ok(reads
            .into_iter()
            .zip(results)
            .enumerate()
            .map(|(tag, (read, result))| {
                ReadOutcome::new(
                    tag as u64,
                    read.offset,
                    result.unwrap_or(-libc::ECANCELED),
                    read.buf,
                )
            })
            .collect())
    }

    fn drive_batch(
        &mut self,
        reads: &mut [PlannedRead],
        results: &mut [Option<i32>],
        started: &mut usize,
    ) -> Result<()> {
        let mut finished = 0;

        while finished < reads.len() {
            let window_start = *started;
            while *started < reads.len() && self.free_slots() > 0 {
                let read = &mut reads[*started];
                let request = ReadRequest::new(*started as u64, &mut read.buf, read.offset);
                // SAFETY: the buffer is a heap allocation owned by `reads`, which is
                // neither resized nor dropped before this read's completion is
                // harvested; on error the caller leaks it instead.
                unsafe { self.prepare_read(&request)? };
                *started += 1;
            }
            if *started > window_start {
                self.submit()?;
            }

            let completion = self.wait_completion()?;
            let tag = completion.tag();
            let result = completion.result();
            completion.acknowledge();

            match usize::try_from(tag).ok().and_then(|i| results.get_mut(i)) {
                Some(slot) if slot.is_none() => *slot = Some(result),
                _ => {
                    return Err(RingError::Io(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("completion for unknown tag {tag}"),
                    )))
                }
            }
            finished += 1;
        }

        Ok(())
    }
}
