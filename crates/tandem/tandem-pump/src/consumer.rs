use crate::Step;
use crate::error::PumpError;
use std::io::{self, Write};
use tandem_perf_recorder::{PerfRecorder, PerfStage};
use tandem_ring::RingBuffer;

/// Read role: writes queued bytes straight out of the ring into `dst`.
pub struct Consumer<'a, W> {
    ring: &'a RingBuffer,
    dst: W,
    chunk_size: usize,
    bytes: u64,
    transactions: u64,
    stalls: u64,
    perf: PerfRecorder,
}

impl<'a, W: Write> Consumer<'a, W> {
    pub fn new(ring: &'a RingBuffer, dst: W, chunk_size: usize) -> Self {
        Self {
            ring,
            dst,
            chunk_size,
            bytes: 0,
            transactions: 0,
            stalls: 0,
            perf: PerfRecorder::new(),
        }
    }

    /// Runs one read transaction. Only the bytes the sink accepted are
    /// released; a short write leaves the rest queued for the next step.
    pub fn step(&mut self) -> Result<Step, PumpError> {
        self.perf.begin(PerfStage::ConsumerTotal);
        self.perf.begin(PerfStage::BeginRead);
        let grant = self.ring.grant_read(self.chunk_size)?;
        self.perf.end(PerfStage::BeginRead);

        if grant.is_empty() {
            drop(grant);
            self.stalls += 1;
            return Ok(Step::Stalled);
        }

        self.perf.begin(PerfStage::Drain);
        let n = match self.dst.write(&grant) {
            Ok(0) => {
                grant.commit(0)?;
                return Err(PumpError::WriteZero);
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                grant.commit(0)?;
                self.stalls += 1;
                return Ok(Step::Stalled);
            }
            Err(e) => return Err(e.into()),
        };
        self.perf.end(PerfStage::Drain);

        self.perf.begin(PerfStage::EndRead);
        grant.commit(n)?;
        self.perf.end(PerfStage::EndRead);

        self.transactions += 1;
        self.bytes += n as u64;
        self.perf.end(PerfStage::ConsumerTotal);
        Ok(Step::Moved(n))
    }

    pub fn flush(&mut self) -> Result<(), PumpError> {
        self.dst.flush()?;
        Ok(())
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn transactions(&self) -> u64 {
        self.transactions
    }

    /// Steps that found the ring empty.
    pub fn stalls(&self) -> u64 {
        self.stalls
    }

    pub fn recorder(&self) -> &PerfRecorder {
        &self.perf
    }

    pub fn into_inner(self) -> (W, PerfRecorder) {
        (self.dst, self.perf)
    }
}
