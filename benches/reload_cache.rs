use criterion::{criterion_group, criterion_main, Criterion};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use reload_cache::{BoxError, ReloadCache};

const KEYS: u64 = 10_000;
const GET_MANY: u64 = 1_000;

fn loader(
    generation: Arc<AtomicU64>,
) -> impl Fn() -> Result<Option<Vec<(u64, u64)>>, BoxError> + Send + Sync + 'static {
    move || {
        let n = generation.fetch_add(1, Ordering::Relaxed);
        Ok(Some((0..KEYS).map(|k| (k, k + n)).collect()))
    }
}

fn bencher(c: &mut Criterion) {
    let idle: ReloadCache<u64, u64, _> = ReloadCache::builder()
        .ttl(60_000)
        .immutable(true)
        .build_with(loader(Arc::new(AtomicU64::new(0))))
        .unwrap();

    // wait for the first load
    while idle.is_empty() {
        thread::yield_now();
    }

    c.bench_function("reload cache get many", |b| {
        b.iter(|| {
            for i in 0..GET_MANY {
                criterion::black_box(idle.get(&i));
            }
        })
    });

    // reloads back to back while we read
    let busy: ReloadCache<u64, u64, _> = ReloadCache::builder()
        .ttl(1)
        .immutable(true)
        .build_with(loader(Arc::new(AtomicU64::new(0))))
        .unwrap();

    while busy.is_empty() {
        thread::yield_now();
    }

    c.bench_function("reload cache get many while reloading", |b| {
        b.iter(|| {
            for i in 0..GET_MANY {
                criterion::black_box(busy.get(&i));
            }
        })
    });

    c.bench_function("reload cache snapshot", |b| {
        b.iter(|| criterion::black_box(busy.snapshot().len()))
    });
}

criterion_group!(benches, bencher);
criterion_main!(benches);
