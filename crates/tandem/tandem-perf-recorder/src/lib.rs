//! Per-stage latency recorder for the pump's producer and consumer loops.
//!
//! With the `record` feature **off** (the default), `PerfRecorder` is a
//! zero-sized type and every method is an `#[inline(always)]` no-op.
//!
//! With `record` **on**, each stage owns a pre-allocated `[u64; MAX_SAMPLES]`
//! buffer and `begin`/`end` pairs store elapsed nanoseconds taken from
//! `clock_gettime(CLOCK_MONOTONIC)`. Samples past `MAX_SAMPLES` are dropped.

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PerfStage {
    /// `grant_write` call: lock, window arithmetic, unlock.
    BeginWrite = 0,
    /// Source `read` into the write grant.
    Fill = 1,
    /// Write commit.
    EndWrite = 2,
    /// `grant_read` call.
    BeginRead = 3,
    /// Sink `write` out of the read grant.
    Drain = 4,
    /// Read commit.
    EndRead = 5,
    ProducerTotal = 6,
    ConsumerTotal = 7,
}

pub const NUM_STAGES: usize = 8;
pub const MAX_SAMPLES: usize = 262_144; // 256K per stage

pub const ALL_STAGES: [PerfStage; NUM_STAGES] = [
    PerfStage::BeginWrite,
    PerfStage::Fill,
    PerfStage::EndWrite,
    PerfStage::BeginRead,
    PerfStage::Drain,
    PerfStage::EndRead,
    PerfStage::ProducerTotal,
    PerfStage::ConsumerTotal,
];

impl PerfStage {
    pub fn name(self) -> &'static str {
        match self {
            PerfStage::BeginWrite => "BeginWrite",
            PerfStage::Fill => "Fill",
            PerfStage::EndWrite => "EndWrite",
            PerfStage::BeginRead => "BeginRead",
            PerfStage::Drain => "Drain",
            PerfStage::EndRead => "EndRead",
            PerfStage::ProducerTotal => "ProducerTotal",
            PerfStage::ConsumerTotal => "ConsumerTotal",
        }
    }
}

// ─── Feature: record ON ─────────────────────────────────────────────────────

#[cfg(feature = "record")]
mod inner {
    use super::*;

    #[inline(always)]
    pub fn now_ns() -> u64 {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid, writable timespec.
        unsafe {
            libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
        }
        (ts.tv_sec as u64) * 1_000_000_000 + ts.tv_nsec as u64
    }

    struct StageBuf {
        samples: Box<[u64]>,
        count: usize,
        pending: u64,
    }

    impl StageBuf {
        fn new() -> Self {
            Self {
                samples: vec![0u64; MAX_SAMPLES].into_boxed_slice(),
                count: 0,
                pending: 0,
            }
        }

        #[inline(always)]
        fn push(&mut self, duration_ns: u64) {
            if self.count < MAX_SAMPLES {
                self.samples[self.count] = duration_ns;
                self.count += 1;
            }
        }
    }

    pub struct PerfRecorder {
        stages: Vec<StageBuf>,
    }

    impl PerfRecorder {
        pub fn new() -> Self {
            Self {
                stages: (0..NUM_STAGES).map(|_| StageBuf::new()).collect(),
            }
        }

        #[inline(always)]
        pub fn begin(&mut self, stage: PerfStage) {
            self.stages[stage as usize].pending = now_ns();
        }

        #[inline(always)]
        pub fn end(&mut self, stage: PerfStage) {
            let buf = &mut self.stages[stage as usize];
            let elapsed = now_ns().saturating_sub(buf.pending);
            buf.push(elapsed);
        }

        #[inline(always)]
        pub fn record(&mut self, stage: PerfStage, duration_ns: u64) {
            self.stages[stage as usize].push(duration_ns);
        }

        pub fn samples(&self, stage: PerfStage) -> &[u64] {
            let buf = &self.stages[stage as usize];
            &buf.samples[..buf.count]
        }

        pub fn count(&self, stage: PerfStage) -> usize {
            self.stages[stage as usize].count
        }

        pub fn drain(&mut self, stage: PerfStage) {
            self.stages[stage as usize].count = 0;
        }

        pub fn reset(&mut self) {
            for buf in self.stages.iter_mut() {
                buf.count = 0;
            }
        }
    }

    impl Default for PerfRecorder {
        fn default() -> Self {
            Self::new()
        }
    }
}

// ─── Feature: record OFF (zero-cost stubs) ──────────────────────────────────

#[cfg(not(feature = "record"))]
mod inner {
    use super::*;

    #[inline(always)]
    pub fn now_ns() -> u64 {
        0
    }

    pub struct PerfRecorder;

    impl PerfRecorder {
        #[inline(always)]
        pub fn new() -> Self {
            Self
        }
        #[inline(always)]
        pub fn begin(&mut self, _stage: PerfStage) {}
        #[inline(always)]
        pub fn end(&mut self, _stage: PerfStage) {}
        #[inline(always)]
        pub fn record(&mut self, _stage: PerfStage, _duration_ns: u64) {}
        #[inline(always)]
        pub fn samples(&self, _stage: PerfStage) -> &[u64] {
            &[]
        }
        #[inline(always)]
        pub fn count(&self, _stage: PerfStage) -> usize {
            0
        }
        #[inline(always)]
        pub fn drain(&mut self, _stage: PerfStage) {}
        #[inline(always)]
        pub fn reset(&mut self) {}
    }

    impl Default for PerfRecorder {
        fn default() -> Self {
            Self
        }
    }
}

pub use inner::{PerfRecorder, now_ns};
