//! Ring setup and teardown: resource cycling and descriptor policies.

use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use ringread::probe::is_io_uring_available;
use ringread::{
    ConfigBuilder, DescriptorPolicy, ReadBatch, ReadRequest, Ring, RingConfig, RingError,
};
use tempfile::NamedTempFile;

fn data_file(len: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&vec![0xab; len]).unwrap();
    file.flush().unwrap();
    file
}

fn keep_config(entries: u32) -> RingConfig {
    ConfigBuilder::new()
        .entries(entries)
        .descriptor(DescriptorPolicy::Keep)
        .build()
        .unwrap()
}

/// Opening and closing far more rings than the descriptor limit allows at
/// once must not exhaust descriptors or mappings.
#[test]
fn test_open_close_cycling() {
    if !is_io_uring_available() {
        eprintln!("skipping: io_uring unavailable");
        return;
    }
    let file = data_file(64);

    for _ in 0..1500 {
        let ring = Ring::open(file.path(), 8).unwrap();
        assert!(ring.close().is_none());
    }
}

#[test]
fn test_dropping_is_closing() {
    if !is_io_uring_available() {
        return;
    }
    let file = data_file(64);

    for _ in 0..1500 {
        let _ring = Ring::open(file.path(), 4).unwrap();
    }
}

#[test]
fn test_keep_policy_cycling_reuses_descriptor() {
    if !is_io_uring_available() {
        return;
    }
    let file = data_file(64);
    let mut fd = OwnedFd::from(File::open(file.path()).unwrap());
    let raw = fd.as_raw_fd();

    for _ in 0..200 {
        let ring = Ring::from_fd(fd, &keep_config(2)).unwrap();
        fd = ring.close().expect("descriptor kept");
        assert_eq!(fd.as_raw_fd(), raw);
    }

    let file = File::from(fd);
    assert_eq!(file.metadata().unwrap().len(), 64);
}

#[test]
fn test_keep_policy_drop_leaves_descriptor_open() {
    if !is_io_uring_available() {
        return;
    }
    let file = data_file(32);
    let fd = OwnedFd::from(File::open(file.path()).unwrap());
    let raw = fd.as_raw_fd();

    let ring = Ring::from_fd(fd, &keep_config(2)).unwrap();
    drop(ring);

    // SAFETY: the ring released `raw` without closing it, and nothing else owns it.
    let reclaimed = unsafe { File::from_raw_fd(raw) };
    assert_eq!(reclaimed.metadata().unwrap().len(), 32);
}

#[test]
fn test_failed_construction_closes_descriptor_under_keep() {
    let (ours, peer) = UnixStream::pair().unwrap();
    let config = RingConfig {
        entries: 0,
        ..keep_config(2)
    };

    let err = Ring::from_fd(OwnedFd::from(ours), &config).unwrap_err();
    assert!(matches!(err, RingError::InvalidCapacity { entries: 0 }));

    // Our end was closed, so the peer sees end of stream instead of timing out.
    peer.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let mut buf = [0u8; 1];
    assert_eq!((&peer).read(&mut buf).unwrap(), 0);
}

#[test]
fn test_failed_construction_closes_descriptor_under_close() {
    let (ours, peer) = UnixStream::pair().unwrap();
    let config = RingConfig {
        entries: ringread::config::MAX_ENTRIES + 1,
        ..RingConfig::default()
    };

    assert!(Ring::from_fd(OwnedFd::from(ours), &config).is_err());

    peer.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let mut buf = [0u8; 1];
    assert_eq!((&peer).read(&mut buf).unwrap(), 0);
}

#[test]
fn test_close_with_staged_requests() {
    if !is_io_uring_available() {
        return;
    }
    let file = data_file(64);
    let mut ring = Ring::open(file.path(), 4).unwrap();
    let mut buf = [0u8; 8];

    // SAFETY: never submitted, so the kernel never sees the buffer.
    unsafe { ring.prepare_read(&ReadRequest::new(0, &mut buf, 0)).unwrap() };
    assert_eq!(ring.staged(), 1);
    assert!(ring.close().is_none());
}

#[test]
fn test_ring_moves_to_worker_thread() {
    if !is_io_uring_available() {
        return;
    }
    let file = data_file(256);
    let ring = Ring::open(file.path(), 4).unwrap();

    let handle = std::thread::spawn(move || {
        let mut ring = ring;
        let mut batch = ReadBatch::new();
        batch.push(0, 128);
        batch.push(128, 128);
        let outcomes = ring.read_batch(batch).unwrap();
        outcomes.iter().map(|o| o.data().len()).sum::<usize>()
    });

    assert_eq!(handle.join().unwrap(), 256);
}
