use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

use fault_guard::{CircuitBreaker, CircuitBreakerOptions, CircuitBreakerRegistry};

/// Benchmark the closed-state pass-through path
fn bench_closed_execute(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let breaker = CircuitBreaker::new("bench", CircuitBreakerOptions::new(u32::MAX, 1, Duration::from_secs(60))).unwrap();

    c.bench_function("execute_closed_success", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(breaker.execute(|| async { Ok::<_, String>(42u64) }).await.unwrap());
        });
    });
}

/// Benchmark fast rejection while open
fn bench_open_rejection(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let breaker = rt.block_on(async {
        let breaker = CircuitBreaker::new("bench", CircuitBreakerOptions::new(1, 1, Duration::from_secs(3600))).unwrap();
        breaker.force_open();
        breaker
    });

    c.bench_function("execute_open_rejection", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(breaker.execute(|| async { Ok::<_, String>(()) }).await.is_err());
        });
    });
}

/// Benchmark registry lookups under concurrent tasks
fn bench_registry_lookup(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("registry_lookup");
    group.significance_level(0.1).sample_size(20);

    for task_count in [1usize, 8, 64].iter() {
        let registry = Arc::new(CircuitBreakerRegistry::new());
        for i in 0..32 {
            registry
                .get_or_create(&format!("svc-{}", i), CircuitBreakerOptions::default())
                .unwrap();
        }

        group.bench_with_input(BenchmarkId::new("tasks", task_count), task_count, |b, &task_count| {
            b.to_async(&rt).iter(|| {
                let registry = Arc::clone(&registry);
                async move {
                    let handles: Vec<_> = (0..task_count)
                        .map(|i| {
                            let registry = Arc::clone(&registry);
                            tokio::spawn(async move {
                                registry
                                    .get_or_create(&format!("svc-{}", i % 32), CircuitBreakerOptions::default())
                                    .unwrap()
                            })
                        })
                        .collect();

                    for handle in handles {
                        black_box(handle.await.unwrap());
                    }
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_closed_execute,
    bench_open_rejection,
    bench_registry_lookup
);

criterion_main!(benches);
