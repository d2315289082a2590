//! Batched reads driven to completion on a single ring.
//!
//! A [`ReadBatch`] owns one heap buffer per read, so the whole
//! stage/submit/harvest protocol can run behind a safe call:
//! [`Ring::read_batch`](crate::Ring::read_batch) feeds the reads through
//! the ring in windows of at most its capacity and returns one
//! [`ReadOutcome`] per read, ordered by tag.
//!
//! # Module Organization
//!
//! - `core` - `ReadBatch` and the batch driver on `Ring`
//! - `result` - `ReadOutcome`

mod core;
mod result;

pub use self::core::ReadBatch;
pub use self::result::ReadOutcome;
