//! Two-thread pipe: one producer, one consumer, one ring between them.

use crate::consumer::Consumer;
use crate::error::PumpError;
use crate::producer::Producer;
use crate::Step;
use serde::Serialize;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tandem_config::{TandemConfig, WriteBoundMode};
use tandem_perf_recorder::PerfRecorder;
use tandem_ring::{RingBuffer, RingError, WriteBound};
use tracing::debug;

/// Ring and transaction sizing for a pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpOptions {
    pub capacity: usize,
    pub chunk_size: usize,
    pub write_bound: WriteBound,
}

impl PumpOptions {
    pub fn ring(&self) -> Result<RingBuffer, RingError> {
        RingBuffer::with_write_bound(self.capacity, self.write_bound)
    }
}

impl From<&TandemConfig> for PumpOptions {
    fn from(cfg: &TandemConfig) -> Self {
        Self {
            capacity: cfg.capacity,
            chunk_size: cfg.chunk_size,
            write_bound: match cfg.write_bound {
                WriteBoundMode::Contiguous => WriteBound::Contiguous,
                WriteBoundMode::Observed => WriteBound::Observed,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PumpStats {
    /// Bytes delivered to the sink.
    pub bytes: u64,
    pub write_transactions: u64,
    pub read_transactions: u64,
    pub producer_stalls: u64,
    pub consumer_stalls: u64,
}

/// Spin first, then give the core away.
struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 64;

    fn new() -> Self {
        Self { step: 0 }
    }

    fn reset(&mut self) {
        self.step = 0;
    }

    fn snooze(&mut self) {
        if self.step < Self::SPIN_LIMIT {
            std::hint::spin_loop();
            self.step += 1;
        } else {
            thread::yield_now();
        }
    }
}

/// Raises its flag when dropped, so a panicking role still signals the other.
struct RaiseOnDrop<'a>(&'a AtomicBool);

impl Drop for RaiseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Copies `src` into `dst` through `ring` until `src` reports end of input.
pub fn run_pipe<R, W>(
    ring: &RingBuffer,
    src: R,
    dst: W,
    chunk_size: usize,
) -> Result<PumpStats, PumpError>
where
    R: Read + Send,
    W: Write + Send,
{
    run_pipe_recorded(ring, src, dst, chunk_size).map(|(stats, _, _)| stats)
}

/// [`run_pipe`], also returning the producer and consumer stage recorders.
///
/// # Errors
/// `InvalidArgument` when `chunk_size` is 0, since no transaction could
/// ever move a byte.
pub fn run_pipe_recorded<R, W>(
    ring: &RingBuffer,
    src: R,
    dst: W,
    chunk_size: usize,
) -> Result<(PumpStats, PerfRecorder, PerfRecorder), PumpError>
where
    R: Read + Send,
    W: Write + Send,
{
    if chunk_size == 0 {
        return Err(RingError::InvalidArgument("chunk_size must be greater than 0").into());
    }

    // Producer finished, successfully or not: nothing more will be committed.
    let input_done = AtomicBool::new(false);
    // Consumer gave up: the producer must not wait for space any longer.
    let output_done = AtomicBool::new(false);

    thread::scope(|s| {
        let producer = s.spawn(|| {
            let _done = RaiseOnDrop(&input_done);
            let mut producer = Producer::new(ring, src, chunk_size);
            let mut backoff = Backoff::new();
            let res = loop {
                match producer.step() {
                    Ok(Step::Moved(_)) => backoff.reset(),
                    Ok(Step::Stalled) => {
                        if output_done.load(Ordering::Acquire) {
                            break Ok(());
                        }
                        backoff.snooze();
                    }
                    Ok(Step::Eof) => break Ok(()),
                    Err(e) => break Err(e),
                }
            };
            res.map(|()| producer)
        });

        let consumer = s.spawn(|| {
            let _done = RaiseOnDrop(&output_done);
            let mut consumer = Consumer::new(ring, dst, chunk_size);
            let mut backoff = Backoff::new();
            let res = loop {
                match consumer.step() {
                    Ok(Step::Moved(_)) => backoff.reset(),
                    Ok(_) => {
                        if input_done.load(Ordering::Acquire) && ring.is_empty() {
                            break consumer.flush();
                        }
                        backoff.snooze();
                    }
                    Err(e) => break Err(e),
                }
            };
            res.map(|()| consumer)
        });

        let producer = producer
            .join()
            .map_err(|_| PumpError::Panicked("producer"))?;
        let consumer = consumer
            .join()
            .map_err(|_| PumpError::Panicked("consumer"))?;
        let producer = producer?;
        let consumer = consumer?;

        let stats = PumpStats {
            bytes: consumer.bytes(),
            // The closing zero-byte commit is not a data transaction.
            write_transactions: producer.transactions() - u64::from(producer.is_eof()),
            read_transactions: consumer.transactions(),
            producer_stalls: producer.stalls(),
            consumer_stalls: consumer.stalls(),
        };
        debug!(?stats, "pipe finished");

        let (_, consumer_perf) = consumer.into_inner();
        Ok((stats, producer.into_recorder(), consumer_perf))
    })
}
