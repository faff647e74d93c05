use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::io::Cursor;
use tandem_perf::make_payload;
use tandem_pump::run_pipe;
use tandem_ring::{RingBuffer, WriteBound};

const PAYLOAD: usize = 4 << 20;

fn bench_pipe(c: &mut Criterion) {
    let input = make_payload(PAYLOAD);
    let mut output = Vec::with_capacity(PAYLOAD);

    let mut group = c.benchmark_group("pipe");
    group.throughput(Throughput::Bytes(PAYLOAD as u64));
    group.sample_size(20);

    for bound in [WriteBound::Contiguous, WriteBound::Observed] {
        for &(capacity, chunk) in &[(65536usize, 4096usize), (4103, 1024)] {
            let ring = RingBuffer::with_write_bound(capacity, bound).expect("failed to create ring");

            group.bench_function(format!("{bound:?}/cap_{capacity}/chunk_{chunk}"), |b| {
                b.iter(|| {
                    output.clear();
                    run_pipe(&ring, Cursor::new(&input), &mut output, chunk).unwrap();
                });
            });

            assert_eq!(output.len(), PAYLOAD);
        }
    }

    group.finish();
}

criterion_group!(benches, bench_pipe);
criterion_main!(benches);
