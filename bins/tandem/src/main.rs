use anyhow::Context;
use std::time::Instant;
use tandem_config::TandemConfig;
use tandem_pump::{PumpOptions, run_pipe};
use tandem_ring::RingBuffer;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => TandemConfig::load(path.as_str())
            .with_context(|| format!("loading config from {path}"))?,
        None => TandemConfig::default(),
    };

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let opts = PumpOptions::from(&config);
    let ring: RingBuffer = opts.ring().context("building ring buffer")?;
    info!(
        capacity = ring.capacity(),
        chunk_size = opts.chunk_size,
        write_bound = ?ring.write_bound(),
        "TANDEM: piping stdin to stdout"
    );

    let start = Instant::now();
    let stats = run_pipe(&ring, std::io::stdin(), std::io::stdout(), opts.chunk_size)
        .context("pipe failed")?;
    let elapsed = start.elapsed();

    let mib_per_s = stats.bytes as f64 / (1024.0 * 1024.0) / elapsed.as_secs_f64().max(1e-9);
    info!(
        bytes = stats.bytes,
        writes = stats.write_transactions,
        reads = stats.read_transactions,
        producer_stalls = stats.producer_stalls,
        consumer_stalls = stats.consumer_stalls,
        elapsed_ms = elapsed.as_millis() as u64,
        "TANDEM: done ~ {mib_per_s:.1} MiB/s"
    );
    Ok(())
}
