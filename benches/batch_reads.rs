use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ringread::probe::is_io_uring_available;
use ringread::{ReadBatch, ReadRequest, Ring};
use std::io::{Read, Seek, SeekFrom, Write};
use std::time::Duration;
use tempfile::NamedTempFile;

const FILE_LEN: usize = 4 << 20;
const CHUNK: usize = 4096;

fn fixture() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let data: Vec<u8> = (0..FILE_LEN).map(|i| (i % 251) as u8).collect();
    file.write_all(&data).unwrap();
    file.flush().unwrap();
    file
}

/// Scattered chunk offsets, deterministic across runs.
fn offsets(count: usize) -> Vec<u64> {
    let slots = (FILE_LEN / CHUNK) as u64;
    (0..count as u64)
        .map(|i| (i.wrapping_mul(2_654_435_761) % slots) * CHUNK as u64)
        .collect()
}

fn bench_batch_vs_sequential(c: &mut Criterion) {
    if !is_io_uring_available() {
        eprintln!("skipping benchmarks: io_uring unavailable");
        return;
    }
    let file = fixture();
    let mut group = c.benchmark_group("scattered_reads");
    group.measurement_time(Duration::from_secs(5));

    for count in [8usize, 64, 256] {
        let offsets = offsets(count);
        group.throughput(Throughput::Bytes((count * CHUNK) as u64));

        group.bench_with_input(BenchmarkId::new("read_batch", count), &offsets, |b, offsets| {
            let mut ring = Ring::open(file.path(), 64).unwrap();
            b.iter(|| {
                let mut batch = ReadBatch::with_capacity(offsets.len());
                for &offset in offsets {
                    batch.push(offset, CHUNK);
                }
                black_box(ring.read_batch(batch).unwrap())
            })
        });

        group.bench_with_input(BenchmarkId::new("pread_loop", count), &offsets, |b, offsets| {
            let mut handle = file.reopen().unwrap();
            let mut buf = vec![0u8; CHUNK];
            b.iter(|| {
                for &offset in offsets {
                    handle.seek(SeekFrom::Start(offset)).unwrap();
                    handle.read_exact(&mut buf).unwrap();
                    black_box(&buf);
                }
            })
        });
    }

    group.finish();
}

fn bench_queue_depth(c: &mut Criterion) {
    if !is_io_uring_available() {
        return;
    }
    let file = fixture();
    let offsets = offsets(128);
    let mut group = c.benchmark_group("queue_depth");

    for entries in [1u32, 8, 32, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(entries), &entries, |b, &entries| {
            let mut ring = Ring::open(file.path(), entries).unwrap();
            let mut buffers = vec![vec![0u8; CHUNK]; offsets.len()];
            let window = ring.capacity() as usize;

            b.iter(|| {
                for start in (0..offsets.len()).step_by(window) {
                    let end = (start + window).min(offsets.len());
                    for i in start..end {
                        let request = ReadRequest::new(i as u64, &mut buffers[i], offsets[i]);
                        // SAFETY: the window is fully harvested before the buffers are reused.
                        unsafe { ring.prepare_read(&request).unwrap() };
                    }
                    ring.submit().unwrap();
                    for _ in start..end {
                        black_box(ring.wait_completion().unwrap().result());
                    }
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_batch_vs_sequential, bench_queue_depth);
criterion_main!(benches);
