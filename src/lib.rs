//! # ringread: batched overlapped file reads over io_uring
//!
//! A thin, explicit wrapper around one io_uring queue pair bound to one open
//! file. Callers stage tagged reads, hand them to the kernel in one system
//! call, and harvest the results one completion at a time, in whatever order
//! the kernel finishes them.
//!
//! ## Key Features
//!
//! - **Explicit protocol**: [`Ring::prepare_read`] stages, [`Ring::submit`]
//!   hands the batch over, [`Ring::wait_completion`] harvests.
//! - **One outstanding completion**: a [`Completion`] borrows the ring until
//!   it is acknowledged, so the kernel never sees a stale queue head.
//! - **Per-read errors**: a failed read is a negative result in its
//!   completion, never an error of the ring.
//! - **Descriptor policy**: the ring either closes the bound file on
//!   teardown or hands it back ([`DescriptorPolicy`]).
//! - **Safe batches**: [`Ring::read_batch`] owns the buffers and drives any
//!   number of reads through the ring in windows.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ringread::{ReadBatch, Ring};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut ring = Ring::open("test.fvecs", 8)?;
//!
//! let mut batch = ReadBatch::new();
//! batch.push(0, 400);
//! batch.push(400 * 13, 400);
//!
//! for outcome in ring.read_batch(batch)? {
//!     match outcome.io_result() {
//!         Ok(n) => println!("tag {}: {n} bytes", outcome.tag()),
//!         Err(e) => eprintln!("tag {}: {e}", outcome.tag()),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Support
//!
//! Linux only. Whether the running kernel permits io_uring can be checked
//! with [`probe::is_io_uring_available`].

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, rust_2018_idioms)]

#[cfg(not(target_os = "linux"))]
compile_error!("ringread requires Linux io_uring");

pub mod config;
pub mod error;
pub mod logging;
pub mod probe;
pub mod ring;

pub use config::{ConfigBuilder, DescriptorPolicy, LoggingConfig, RingConfig};
pub use error::{Result, RingError};
pub use logging::LogLevel;
pub use ring::{Completion, ReadBatch, ReadOutcome, ReadRequest, Ring, RingStats};
