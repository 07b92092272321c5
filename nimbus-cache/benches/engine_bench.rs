use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use nimbus_cache::{CacheConfig, NimbusCache, PromotionMode};
use std::hint::black_box;
use std::time::Duration;

const INTERVAL: Duration = Duration::from_secs(60);

fn bench_add(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let _guard = rt.enter();

    let mut group = c.benchmark_group("add");
    for capacity in [100, 10_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                b.iter_batched(
                    || NimbusCache::<u64, u64>::with_capacity(capacity, INTERVAL).unwrap(),
                    |cache| {
                        for i in 0..1_000u64 {
                            cache.add(black_box(i), i).unwrap();
                        }
                        cache
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }
    group.finish();
}

fn bench_active_lookup(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let _guard = rt.enter();
    let cache = NimbusCache::<u64, u64>::with_capacity(1_000, INTERVAL).unwrap();

    // Pre-populate
    for i in 0..1_000u64 {
        cache.add(i, i).unwrap();
    }

    let mut key = 0u64;
    c.bench_function("active_lookup", |b| {
        b.iter(|| {
            key = (key + 1) % 1_000;
            cache.active_lookup(black_box(&key)).unwrap()
        });
    });
}

fn bench_lookup_promotion(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let _guard = rt.enter();

    let mut group = c.benchmark_group("lookup_skewed");
    for mode in [PromotionMode::Frequency, PromotionMode::Disabled] {
        let config = CacheConfig {
            active_capacity: 100,
            cleaner_interval_ms: INTERVAL.as_millis() as u64,
            promotion: mode,
        };
        let cache = NimbusCache::<u64, u64>::new(config).unwrap();
        for i in 0..1_000u64 {
            cache.add(i, i).unwrap();
        }

        let mut step = 0u64;
        group.bench_function(format!("{:?}", mode), |b| {
            b.iter(|| {
                step = step.wrapping_add(7919);
                // Half the reads go to a hot set that starts out dormant
                let key = if step % 2 == 0 {
                    900 + step % 100
                } else {
                    step % 1_000
                };
                cache.lookup(black_box(&key)).unwrap()
            });
        });
    }
    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let _guard = rt.enter();
    let cache = NimbusCache::<u64, u64>::with_capacity(500, INTERVAL).unwrap();
    for i in 0..1_000u64 {
        cache.add(i, i).unwrap();
    }

    let mut key = 0u64;
    c.bench_function("update", |b| {
        b.iter(|| {
            key = (key + 13) % 1_000;
            cache.update(black_box(&key), key).unwrap()
        });
    });
}

fn bench_remove_add(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let _guard = rt.enter();
    let cache = NimbusCache::<u64, u64>::with_capacity(500, INTERVAL).unwrap();
    for i in 0..1_000u64 {
        cache.add(i, i).unwrap();
    }

    let mut key = 0u64;
    c.bench_function("remove_add", |b| {
        b.iter(|| {
            key = (key + 1) % 1_000;
            let value = cache.remove(black_box(&key)).unwrap();
            cache.add(key, value.unwrap_or(key)).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_add,
    bench_active_lookup,
    bench_lookup_promotion,
    bench_update,
    bench_remove_add
);
criterion_main!(benches);
