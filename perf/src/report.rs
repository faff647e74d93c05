use crate::{BenchResult, compute_stats};
use tandem_perf_recorder::{ALL_STAGES, PerfRecorder, PerfStage};

/// Producer-side stages, total last.
pub const PRODUCER_STAGES: [PerfStage; 4] = [
    PerfStage::BeginWrite,
    PerfStage::Fill,
    PerfStage::EndWrite,
    PerfStage::ProducerTotal,
];

/// Consumer-side stages, total last.
pub const CONSUMER_STAGES: [PerfStage; 4] = [
    PerfStage::BeginRead,
    PerfStage::Drain,
    PerfStage::EndRead,
    PerfStage::ConsumerTotal,
];

/// Convert recorder samples into BenchResults, skipping empty stages.
pub fn stage_results(recorder: &PerfRecorder) -> Vec<BenchResult> {
    let mut out = Vec::new();
    for stage in ALL_STAGES {
        let mut samples: Vec<u64> = recorder.samples(stage).to_vec();
        if samples.is_empty() {
            continue;
        }
        out.push(BenchResult {
            name: stage.name().to_string(),
            unit: "ns".to_string(),
            stats: compute_stats(&mut samples),
        });
    }
    out
}

fn p50_of(recorder: &PerfRecorder, stage: PerfStage) -> u64 {
    let s = recorder.samples(stage);
    if s.is_empty() {
        return 0;
    }
    let mut v = s.to_vec();
    v.sort_unstable();
    v[v.len() / 2]
}

pub fn print_stage_table(recorder: &PerfRecorder, stages: &[PerfStage], total_stage: PerfStage) {
    println!(
        "  {:<16} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}  {:>6}",
        "Stage", "p50", "p90", "p99", "p99.9", "max", "count", "% tot"
    );
    println!("  {}", "\u{2500}".repeat(84));

    let total_p50 = p50_of(recorder, total_stage);

    for &stage in stages {
        let samples = recorder.samples(stage);
        if samples.is_empty() {
            continue;
        }
        let mut v = samples.to_vec();
        let stats = compute_stats(&mut v);
        let pct = if stage == total_stage {
            "100%".to_string()
        } else if total_p50 > 0 {
            format!("{:.0}%", stats.p50 as f64 / total_p50 as f64 * 100.0)
        } else {
            "-".to_string()
        };
        println!(
            "  {:<16} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}  {:>6}",
            stage.name(),
            stats.p50,
            stats.p90,
            stats.p99,
            stats.p999,
            stats.max,
            stats.count,
            pct
        );
    }
}

pub fn print_producer_report(recorder: &PerfRecorder) {
    println!("\n  Producer Per-Stage Timing:\n");
    print_stage_table(recorder, &PRODUCER_STAGES, PerfStage::ProducerTotal);
}

pub fn print_consumer_report(recorder: &PerfRecorder) {
    println!("\n  Consumer Per-Stage Timing:\n");
    print_stage_table(recorder, &CONSUMER_STAGES, PerfStage::ConsumerTotal);
}

/// Share of each role's p50 spent in bookkeeping versus the byte transfer.
pub fn print_analysis(producer: &PerfRecorder, consumer: &PerfRecorder) {
    println!("\n  Lock vs. Transfer:\n");

    let prod_total = p50_of(producer, PerfStage::ProducerTotal);
    if prod_total > 0 {
        let lock = p50_of(producer, PerfStage::BeginWrite) + p50_of(producer, PerfStage::EndWrite);
        let fill = p50_of(producer, PerfStage::Fill);
        println!(
            "    Producer p50: {prod_total} ns (begin+end={lock} ns, fill={fill} ns, bookkeeping {:.0}%)",
            lock as f64 / prod_total as f64 * 100.0
        );
    }

    let cons_total = p50_of(consumer, PerfStage::ConsumerTotal);
    if cons_total > 0 {
        let lock = p50_of(consumer, PerfStage::BeginRead) + p50_of(consumer, PerfStage::EndRead);
        let drain = p50_of(consumer, PerfStage::Drain);
        println!(
            "    Consumer p50: {cons_total} ns (begin+end={lock} ns, drain={drain} ns, bookkeeping {:.0}%)",
            lock as f64 / cons_total as f64 * 100.0
        );
    }
}
