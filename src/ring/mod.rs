//! Batched file reads over one io_uring queue pair.
//!
//! This module provides the [`Ring`] type, which binds a queue pair to a
//! single open file, together with the request and completion types that
//! flow through it.

mod batch;
mod completion;
mod core;
mod submission;


pub use self::batch::{ReadBatch, ReadOutcome};
pub use self::completion::Completion;
pub use self::core::{Ring, RingStats};
pub use self::submission::ReadRequest;
