use std::hint::black_box;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Instant;

use tandem_perf::report::{print_analysis, print_consumer_report, print_producer_report, stage_results};
use tandem_perf::*;
use tandem_pump::{PumpStats, run_pipe_recorded};
use tandem_ring::{Range, RingBuffer, WriteBound};

const BATCHES: usize = 2_000;
const BATCH_SIZE: usize = 1_000;
const WARMUP: usize = 50;

/// Bytes pushed through each cross-thread pipe run.
const PIPE_BYTES: usize = 64 << 20;

#[derive(serde::Serialize)]
struct PipeRun {
    capacity: usize,
    chunk_size: usize,
    write_bound: String,
    elapsed_ms: f64,
    mib_per_s: f64,
    stats: PumpStats,
}

fn main() {
    let bar = "\u{2550}".repeat(90);
    println!("\n{bar}");
    println!("  TANDEM PERFORMANCE REPORT");
    println!("  transaction round trips + cross-thread pipe");
    println!("{bar}");

    let mut results: Vec<BenchResult> = Vec::new();

    // ═══════════════════════════════════════════════════════════════════════
    // 1. Single-thread transaction round trips
    // ═══════════════════════════════════════════════════════════════════════
    section_header("Transaction round trips (single thread)");
    print_table_header();

    for &chunk in &[64usize, 1024, 16 * 1024] {
        let ring = RingBuffer::new(64 * 1024).expect("ring");
        let r = measure_batched(
            &format!("raw begin/end {chunk}B"),
            BATCHES,
            BATCH_SIZE,
            WARMUP,
            || {
                let mut range = Range::invalid();
                ring.begin_write(chunk, &mut range).unwrap();
                ring.end_write(range.length()).unwrap();
                ring.begin_read(chunk, &mut range).unwrap();
                ring.end_read(black_box(range.length())).unwrap();
            },
        );
        print_result_row(&r);
        results.push(r);

        let r = measure_batched(
            &format!("grant fill/drain {chunk}B"),
            BATCHES,
            BATCH_SIZE / 10,
            WARMUP,
            || {
                let mut w = ring.grant_write(chunk).unwrap();
                w.fill(0x5A);
                let n = w.len();
                w.commit(n).unwrap();
                let r = ring.grant_read(chunk).unwrap();
                black_box(&r[..]);
                let n = r.len();
                r.commit(n).unwrap();
            },
        );
        print_result_row(&r);
        results.push(r);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 2. Cross-thread pipe with per-stage timing
    // ═══════════════════════════════════════════════════════════════════════
    let input = make_payload(PIPE_BYTES);
    let mut runs = Vec::new();

    for (capacity, chunk_size, bound) in [
        (64 * 1024, 4096, WriteBound::Contiguous),
        (64 * 1024, 4096, WriteBound::Observed),
        (4096 + 7, 1024, WriteBound::Contiguous),
        (4096 + 7, 1024, WriteBound::Observed),
    ] {
        section_header(&format!(
            "Pipe: {} through {} ring, chunk {}, {:?}",
            format_bytes(PIPE_BYTES as u64),
            format_bytes(capacity as u64),
            chunk_size,
            bound
        ));

        let ring = RingBuffer::with_write_bound(capacity, bound).expect("ring");
        let mut output = Vec::with_capacity(PIPE_BYTES);
        let start = Instant::now();
        let (stats, producer, consumer) =
            run_pipe_recorded(&ring, Cursor::new(&input), &mut output, chunk_size)
                .expect("pipe failed");
        let elapsed = start.elapsed();
        assert!(output == input, "pipe corrupted the payload");

        let mib_per_s = PIPE_BYTES as f64 / (1024.0 * 1024.0) / elapsed.as_secs_f64();
        println!(
            "  {} in {:.1} ms  ~ {mib_per_s:.0} MiB/s  (writes={}, reads={}, stalls p/c={}/{})",
            format_bytes(stats.bytes),
            elapsed.as_secs_f64() * 1e3,
            stats.write_transactions,
            stats.read_transactions,
            stats.producer_stalls,
            stats.consumer_stalls,
        );

        print_producer_report(&producer);
        print_consumer_report(&consumer);
        print_analysis(&producer, &consumer);

        for mut r in stage_results(&producer)
            .into_iter()
            .chain(stage_results(&consumer))
        {
            r.name = format!("pipe/{capacity}/{bound:?}/{}", r.name);
            results.push(r);
        }

        runs.push(PipeRun {
            capacity,
            chunk_size,
            write_bound: format!("{bound:?}"),
            elapsed_ms: elapsed.as_secs_f64() * 1e3,
            mib_per_s,
            stats,
        });
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 3. JSON Output
    // ═══════════════════════════════════════════════════════════════════════
    let out_path = output_path();
    let doc = serde_json::json!({
        "results": results,
        "pipe_runs": runs,
    });
    match serde_json::to_string_pretty(&doc) {
        Ok(json) => match std::fs::write(&out_path, json) {
            Ok(()) => println!("\n  Results written to {}", out_path.display()),
            Err(e) => eprintln!("\n  Failed to write {}: {e}", out_path.display()),
        },
        Err(e) => eprintln!("\n  Failed to serialize results: {e}"),
    }
}

fn output_path() -> PathBuf {
    // CARGO_MANIFEST_DIR = perf/, results land next to criterion's in <workspace>/target
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let target = manifest
        .parent()
        .map(|p| p.join("target"))
        .unwrap_or_else(|| manifest.join("target"));
    let _ = std::fs::create_dir_all(&target);
    target.join("tandem_perf.json")
}
