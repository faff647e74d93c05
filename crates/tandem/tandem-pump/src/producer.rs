use crate::Step;
use crate::error::PumpError;
use std::io::{self, Read};
use tandem_perf_recorder::{PerfRecorder, PerfStage};
use tandem_ring::RingBuffer;
use tracing::debug;

/// Write role: reads from `src` straight into the ring's free space.
pub struct Producer<'a, R> {
    ring: &'a RingBuffer,
    src: R,
    chunk_size: usize,
    bytes: u64,
    transactions: u64,
    stalls: u64,
    eof: bool,
    perf: PerfRecorder,
}

impl<'a, R: Read> Producer<'a, R> {
    pub fn new(ring: &'a RingBuffer, src: R, chunk_size: usize) -> Self {
        Self {
            ring,
            src,
            chunk_size,
            bytes: 0,
            transactions: 0,
            stalls: 0,
            eof: false,
            perf: PerfRecorder::new(),
        }
    }

    /// Runs one write transaction.
    ///
    /// The source reads directly into the granted span; whatever it returned
    /// is committed. A zero-byte read marks end of input.
    pub fn step(&mut self) -> Result<Step, PumpError> {
        if self.eof {
            return Ok(Step::Eof);
        }

        self.perf.begin(PerfStage::ProducerTotal);
        self.perf.begin(PerfStage::BeginWrite);
        let mut grant = self.ring.grant_write(self.chunk_size)?;
        self.perf.end(PerfStage::BeginWrite);

        if grant.is_empty() {
            drop(grant);
            self.stalls += 1;
            return Ok(Step::Stalled);
        }

        self.perf.begin(PerfStage::Fill);
        let n = match self.src.read(&mut grant) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                grant.commit(0)?;
                self.stalls += 1;
                return Ok(Step::Stalled);
            }
            Err(e) => return Err(e.into()),
        };
        self.perf.end(PerfStage::Fill);

        self.perf.begin(PerfStage::EndWrite);
        grant.commit(n)?;
        self.perf.end(PerfStage::EndWrite);
        self.transactions += 1;

        if n == 0 {
            debug!(bytes = self.bytes, "producer reached end of input");
            self.eof = true;
            return Ok(Step::Eof);
        }

        self.bytes += n as u64;
        self.perf.end(PerfStage::ProducerTotal);
        Ok(Step::Moved(n))
    }

    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Bytes committed so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn transactions(&self) -> u64 {
        self.transactions
    }

    /// Steps that found no contiguous free space.
    pub fn stalls(&self) -> u64 {
        self.stalls
    }

    pub fn recorder(&self) -> &PerfRecorder {
        &self.perf
    }

    pub fn into_recorder(self) -> PerfRecorder {
        self.perf
    }
}
