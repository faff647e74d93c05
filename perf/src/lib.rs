use std::time::Instant;

pub mod report;

// ─── Statistics ─────────────────────────────────────────────────────────────

/// Latency summary, in whatever unit the samples were taken.
///
/// Holds exactly the columns the report tables print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Stats {
    pub count: usize,
    pub min: u64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
    pub max: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BenchResult {
    pub name: String,
    pub unit: String,
    pub stats: Stats,
}

/// Sorts `samples` in place and summarises them with nearest-rank
/// percentiles.
///
/// Panics on an empty slice.
pub fn compute_stats(samples: &mut [u64]) -> Stats {
    assert!(!samples.is_empty(), "no samples to summarise");
    samples.sort_unstable();
    let n = samples.len();
    // rank = ceil(q * n), clamped to [1, n]
    let at = |q: f64| samples[((q * n as f64).ceil() as usize).clamp(1, n) - 1];
    Stats {
        count: n,
        min: samples[0],
        p50: at(0.50),
        p90: at(0.90),
        p99: at(0.99),
        p999: at(0.999),
        max: samples[n - 1],
    }
}

// ─── Measurement Harness ────────────────────────────────────────────────────

/// Runs `f` in `batches` timed groups of `batch_size` calls, after
/// `warmup` untimed groups, and reports the per-call cost of each group.
pub fn measure_batched<F: FnMut()>(
    name: &str,
    batches: usize,
    batch_size: usize,
    warmup: usize,
    mut f: F,
) -> BenchResult {
    let batch_size = batch_size.max(1);
    let mut run_group = || {
        let t0 = Instant::now();
        (0..batch_size).for_each(|_| f());
        t0.elapsed().as_nanos()
    };

    for _ in 0..warmup {
        run_group();
    }
    let mut per_call: Vec<u64> = (0..batches.max(1))
        .map(|_| (run_group() / batch_size as u128).max(1) as u64)
        .collect();

    BenchResult {
        name: name.to_owned(),
        unit: "ns/op".to_owned(),
        stats: compute_stats(&mut per_call),
    }
}

// ─── Inputs ─────────────────────────────────────────────────────────────────

/// Deterministic, non-repeating-looking payload for pipe runs.
pub fn make_payload(len: usize) -> Vec<u8> {
    let mut x: u64 = 0x2545_F491_4F6C_DD1D;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            (x >> 32) as u8
        })
        .collect()
}

// ─── Display ────────────────────────────────────────────────────────────────

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * 1024 * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn print_table_header() {
    println!(
        "  {:<30} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}  unit",
        "Benchmark", "min", "p50", "p90", "p99", "p99.9", "max",
    );
    println!("  {}", "─".repeat(92));
}

pub fn print_result_row(r: &BenchResult) {
    println!(
        "  {:<30} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}  {}",
        r.name, r.stats.min, r.stats.p50, r.stats.p90, r.stats.p99, r.stats.p999, r.stats.max, r.unit,
    );
}

pub fn section_header(title: &str) {
    let rule = "─".repeat(90);
    println!("\n{rule}\n  {title}\n{rule}\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_of_known_samples() {
        let mut samples: Vec<u64> = (1..=100).rev().collect();
        let s = compute_stats(&mut samples);
        assert_eq!(s.min, 1);
        assert_eq!(s.max, 100);
        assert_eq!(s.p50, 50);
        assert_eq!(s.p90, 90);
        assert_eq!(s.p99, 99);
        assert_eq!(s.p999, 100);
        assert_eq!(s.count, 100);
    }

    #[test]
    fn single_sample() {
        let s = compute_stats(&mut [7]);
        assert_eq!((s.min, s.p50, s.p999, s.max), (7, 7, 7, 7));
    }

    #[test]
    fn batched_measurement_runs_every_call() {
        let mut calls = 0usize;
        let r = measure_batched("count", 5, 4, 2, || calls += 1);
        assert_eq!(calls, (5 + 2) * 4);
        assert_eq!(r.stats.count, 5);
        assert!(r.stats.min >= 1);
        assert_eq!(r.unit, "ns/op");
    }

    #[test]
    fn payload_is_deterministic() {
        assert_eq!(make_payload(64), make_payload(64));
        assert_eq!(make_payload(10).len(), 10);
    }

    #[test]
    fn byte_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
