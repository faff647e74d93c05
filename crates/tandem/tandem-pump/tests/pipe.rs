//! Pipe equivalence tests: whatever goes in must come out, byte for byte,
//! whatever the ring size, chunk size or write bound.

use std::io::{self, Cursor, Read, Write};
use tandem_pump::{Consumer, Producer, PumpError, PumpOptions, Step, run_pipe};
use tandem_ring::{RingBuffer, RingError, WriteBound};

fn payload(len: usize) -> Vec<u8> {
    // xorshift so runs of equal bytes never hide an offset bug
    let mut x: u32 = 0x9E37_79B9;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            x as u8
        })
        .collect()
}

fn roundtrip(capacity: usize, chunk_size: usize, bound: WriteBound, len: usize) {
    let opts = PumpOptions {
        capacity,
        chunk_size,
        write_bound: bound,
    };
    let ring = opts.ring().unwrap();
    let input = payload(len);
    let mut output = Vec::with_capacity(len);

    let stats = run_pipe(&ring, Cursor::new(&input), &mut output, opts.chunk_size).unwrap();

    assert_eq!(output.len(), input.len());
    assert!(output == input, "payload corrupted (cap={capacity}, chunk={chunk_size}, {bound:?})");
    assert_eq!(stats.bytes, len as u64);
    assert!(ring.is_empty());
}

#[test]
fn pipe_small_ring_contiguous() {
    roundtrip(97, 13, WriteBound::Contiguous, 200_000);
}

#[test]
fn pipe_small_ring_observed() {
    roundtrip(97, 13, WriteBound::Observed, 200_000);
}

#[test]
fn pipe_chunk_larger_than_ring() {
    roundtrip(64, 1000, WriteBound::Contiguous, 50_000);
}

#[test]
fn pipe_single_byte_ring() {
    roundtrip(1, 8, WriteBound::Contiguous, 4096);
}

#[test]
fn pipe_large_ring_default_sizes() {
    roundtrip(1 << 16, 4096, WriteBound::Contiguous, 1 << 20);
}

/// Accepts at most `limit` bytes per call to exercise short writes.
struct Trickle {
    out: Vec<u8>,
    limit: usize,
}

impl Write for Trickle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.limit);
        self.out.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn short_writes_keep_the_rest_queued() {
    let ring = RingBuffer::new(32).unwrap();
    let input = payload(10_000);
    let mut sink = Trickle {
        out: Vec::new(),
        limit: 3,
    };
    let stats = run_pipe(&ring, Cursor::new(&input), &mut sink, 16).unwrap();
    assert_eq!(sink.out, input);
    assert!(stats.read_transactions >= (input.len() / 3) as u64);
}

#[test]
fn producer_and_consumer_step_by_hand() {
    let ring = RingBuffer::new(8).unwrap();
    let mut producer = Producer::new(&ring, Cursor::new(b"abcdefghij".to_vec()), 8);
    let mut consumer = Consumer::new(&ring, Vec::new(), 3);

    assert_eq!(producer.step().unwrap(), Step::Moved(8));
    assert_eq!(producer.step().unwrap(), Step::Stalled);
    assert_eq!(consumer.step().unwrap(), Step::Moved(3));
    // Writer at 0 wraps behind the reader at 3.
    assert_eq!(producer.step().unwrap(), Step::Moved(2));
    assert_eq!(producer.step().unwrap(), Step::Eof);
    assert!(producer.is_eof());

    while ring.len() > 0 {
        assert!(matches!(consumer.step().unwrap(), Step::Moved(_)));
    }
    assert_eq!(consumer.step().unwrap(), Step::Stalled);
    let (out, _) = consumer.into_inner();
    assert_eq!(out, b"abcdefghij");
    assert_eq!(producer.bytes(), 10);
    assert_eq!(producer.stalls(), 1);
}

struct BrokenSink;

impl Write for BrokenSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn sink_error_stops_the_pipe() {
    let ring = RingBuffer::new(16).unwrap();
    let err = run_pipe(&ring, Cursor::new(payload(4096)), BrokenSink, 8).unwrap_err();
    assert!(matches!(err, PumpError::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
    assert!(!ring.is_writing());
    assert!(!ring.is_reading());
}

struct ZeroSink;

impl Write for ZeroSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Ok(0)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn zero_length_write_is_an_error() {
    let ring = RingBuffer::new(16).unwrap();
    let err = run_pipe(&ring, Cursor::new(payload(64)), ZeroSink, 8).unwrap_err();
    assert!(matches!(err, PumpError::WriteZero));
}

struct FailingSource;

impl Read for FailingSource {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("disk on fire"))
    }
}

#[test]
fn source_error_stops_the_pipe() {
    let ring = RingBuffer::new(16).unwrap();
    let err = run_pipe(&ring, FailingSource, Vec::new(), 8).unwrap_err();
    assert!(matches!(err, PumpError::Io(_)));
    assert!(!ring.is_writing());
}

#[test]
fn zero_chunk_size_is_rejected_up_front() {
    let ring = RingBuffer::new(16).unwrap();
    let mut out = Vec::new();
    let err = run_pipe(&ring, Cursor::new(vec![1u8; 10]), &mut out, 0).unwrap_err();
    assert!(matches!(
        err,
        PumpError::Ring(RingError::InvalidArgument(_))
    ));
    assert!(out.is_empty());
    assert!(!ring.is_writing());
    assert!(!ring.is_reading());
}
