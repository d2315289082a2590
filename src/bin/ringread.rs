//! ringread: read chunks of a file through one io_uring and print them.
//!
//! Run with: `ringread <PATH> [--read OFFSET:LEN]...`

use std::fmt::Write as _;
use std::mem;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser, ValueEnum};
use tracing::{debug, warn};

use ringread::config::DEFAULT_ENTRIES;
use ringread::{
    logging, ConfigBuilder, LogLevel, LoggingConfig, ReadRequest, Result, Ring, RingConfig,
};

/// Chunks read when no `--read` is given: two 400-byte records, the second
/// thirteen records in.
const DEFAULT_CHUNKS: [Chunk; 2] = [
    Chunk {
        offset: 0,
        len: 400,
    },
    Chunk {
        offset: 400 * 13,
        len: 400,
    },
];

#[derive(Parser)]
#[command(name = "ringread")]
#[command(version, about = "Read file chunks in one batch through io_uring")]
struct Cli {
    /// File to read
    path: PathBuf,

    /// Submission queue depth
    #[arg(long, default_value_t = DEFAULT_ENTRIES)]
    entries: u32,

    /// Chunk to read, as OFFSET:LEN (repeatable)
    #[arg(long = "read", value_name = "OFFSET:LEN")]
    reads: Vec<Chunk>,

    /// How to print the bytes read
    #[arg(long, value_enum, default_value_t = Format::Floats)]
    format: Format,

    /// Leave the file descriptor to the caller instead of closing it with the ring
    #[arg(long)]
    keep_descriptor: bool,

    /// Minimum log level (RUST_LOG overrides)
    #[arg(long, default_value = "warn")]
    log_level: LogLevel,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Little-endian f32 values
    Floats,
    /// Hex dump
    Hex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Chunk {
    offset: u64,
    len: usize,
}

impl FromStr for Chunk {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (offset, len) = s
            .split_once(':')
            .ok_or_else(|| format!("expected OFFSET:LEN, got `{s}`"))?;
        let offset = offset
            .trim()
            .parse()
            .map_err(|e| format!("invalid offset `{offset}`: {e}"))?;
        // A single read cannot exceed u32::MAX bytes; reject before allocating.
        let len: u32 = len
            .trim()
            .parse()
            .map_err(|e| format!("invalid length `{len}` (at most {}): {e}", u32::MAX))?;
        Ok(Self {
            offset,
            len: len as usize,
        })
    }
}

/// Everything one run needs, resolved from the command line.
#[derive(Debug)]
struct ReadPlan {
    path: PathBuf,
    ring: RingConfig,
    chunks: Vec<Chunk>,
    format: Format,
}

impl ReadPlan {
    fn from_cli(cli: Cli) -> Result<(Self, LoggingConfig)> {
        let ring = ConfigBuilder::new()
            .entries(cli.entries)
            .close_descriptor(!cli.keep_descriptor)
            .build()?;

        let chunks = if cli.reads.is_empty() {
            DEFAULT_CHUNKS.to_vec()
        } else {
            cli.reads
        };

        let logging = LoggingConfig {
            level: cli.log_level,
            json_format: cli.log_json,
            ..LoggingConfig::default()
        };

        Ok((
            Self {
                path: cli.path,
                ring,
                chunks,
                format: cli.format,
            },
            logging,
        ))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            eprintln!("{failed} read(s) failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            if e.is_unsupported() {
                if let Some(hint) = ringread::probe::restriction_hint() {
                    eprintln!("hint: {hint}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<usize> {
    let (plan, logging_config) = ReadPlan::from_cli(cli)?;
    if let Err(e) = logging::init(&logging_config) {
        eprintln!("warning: logging disabled: {e}");
    }
    debug!(?plan, "starting");

    let mut ring = Ring::open_with_config(&plan.path, &plan.ring)?;
    let mut buffers: Vec<Vec<u8>> = plan.chunks.iter().map(|c| vec![0; c.len]).collect();

    match read_all(&mut ring, &plan, &mut buffers) {
        Ok(failed) => {
            if let Some(fd) = ring.close() {
                debug!(?fd, "descriptor handed back");
            }
            Ok(failed)
        }
        Err(e) => {
            if ring.in_flight() > 0 {
                warn!(in_flight = ring.in_flight(), "abandoning reads; leaking their buffers");
                mem::forget(buffers);
            }
            Err(e)
        }
    }
}

/// Read every chunk in windows of the ring's capacity, printing each result
/// as it arrives. Returns the number of failed reads.
fn read_all(ring: &mut Ring, plan: &ReadPlan, buffers: &mut [Vec<u8>]) -> Result<usize> {
    let window = ring.capacity() as usize;
    let mut failed = 0;

    for start in (0..buffers.len()).step_by(window) {
        let end = (start + window).min(buffers.len());

        for tag in start..end {
            let request = ReadRequest::new(tag as u64, &mut buffers[tag], plan.chunks[tag].offset);
            // SAFETY: `buffers` is not touched again until this window's
            // completions are harvested, and is leaked if that fails.
            unsafe { ring.prepare_read(&request)? };
        }
        ring.submit()?;

        for _ in start..end {
            let completion = ring.wait_completion()?;
            let tag = completion.tag() as usize;
            let result = completion.io_result();
            completion.acknowledge();

            let chunk = plan.chunks[tag];
            match result {
                Ok(n) => print!("{}", render(tag, chunk, &buffers[tag][..n], plan.format)),
                Err(e) => {
                    failed += 1;
                    eprintln!(
                        "tag {tag}: error reading {} at offset {}: {e}",
                        plan.path.display(),
                        chunk.offset
                    );
                }
            }
        }
    }

    Ok(failed)
}

fn render(tag: usize, chunk: Chunk, data: &[u8], format: Format) -> String {
    let mut out = format!(
        "tag {tag}: {} of {} bytes at offset {}\n",
        data.len(),
        chunk.len,
        chunk.offset
    );

    match format {
        Format::Floats => {
            let values: Vec<String> = data
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]).to_string())
                .collect();
            for line in values.chunks(8) {
                let _ = writeln!(out, "  {}", line.join(" "));
            }
        }
        Format::Hex => {
            for (row, bytes) in data.chunks(16).enumerate() {
                let _ = write!(out, "  {:08x}:", chunk.offset + (row * 16) as u64);
                for byte in bytes {
                    let _ = write!(out, " {byte:02x}");
                }
                out.push('\n');
            }
        }
    }

    out
}
