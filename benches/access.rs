use chunked_vec::ChunkedVec;
use criterion::{Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Builds a sequence long enough that the chain is well past the skip threshold.
fn build_sequence(elements: usize, indexed: bool) -> ChunkedVec<u64> {
    let mut b = ChunkedVec::with_capacity(16);
    if indexed {
        b = b.with_skip_map();
    }
    let mut next = 0u64;
    while b.len() < elements {
        let batch: Vec<u64> = (next..next + 2000).collect();
        b.extend_from_slice(&batch);
        next += 2000;
    }
    b
}

fn benchmark_random_access(criterion: &mut Criterion, name: &str, elements: usize) {
    let name = format!("random_access/{}", name);
    let mut rng = StdRng::seed_from_u64(0);
    let probes: Vec<usize> = (0..1024).map(|_| rng.gen_range(0..elements)).collect();

    for (case, indexed) in [("linear", false), ("skip_map", true)] {
        let b = build_sequence(elements, indexed);
        criterion
            .benchmark_group(&name)
            .bench_function(case, {
                let probes = probes.clone();
                move |bench| {
                    bench.iter(|| {
                        let mut sum = 0u64;
                        for &i in &probes {
                            sum = sum.wrapping_add(b[i]);
                        }
                        criterion::black_box(sum)
                    })
                }
            })
            .throughput(Throughput::Elements(probes.len() as u64));
    }
}

fn benchmark_append(criterion: &mut Criterion) {
    let batch: Vec<u64> = (0..2000).collect();
    criterion
        .benchmark_group("append")
        .bench_function("bulk_2000", {
            let batch = batch.clone();
            move |bench| {
                bench.iter(|| {
                    let mut b = ChunkedVec::with_capacity(16);
                    for _ in 0..50 {
                        b.extend_from_slice(&batch);
                    }
                    criterion::black_box(b.len())
                })
            }
        })
        .throughput(Throughput::Elements(100_000));
}

fn main() {
    let mut criterion = Criterion::default().configure_from_args();

    // 600 chunks: comfortably past the threshold where lookups descend skip maps.
    benchmark_random_access(&mut criterion, "1200k", 1_200_000);
    // 25 chunks: below the threshold, where both variants walk linearly.
    benchmark_random_access(&mut criterion, "50k", 50_000);

    benchmark_append(&mut criterion);

    criterion.final_summary();
}
