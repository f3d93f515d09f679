//! Buffer pool performance benchmarks: pin/unpin churn and LRU-K eviction
//! under an access pattern that forces constant replacement.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rusty_db::buffer::BufferPoolManager;
use rusty_db::storage::DiskManager;
use std::sync::Arc;
use tempfile::TempDir;

fn create_pool(num_frames: usize, k: usize) -> (BufferPoolManager, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("bench.db");
    let disk_manager = Arc::new(DiskManager::new(&db_path).unwrap());
    (BufferPoolManager::with_k(num_frames, disk_manager, k), temp_dir)
}

fn bench_new_page_pin_unpin(c: &mut Criterion) {
    let (pool, _temp) = create_pool(1000, 2);

    c.bench_function("new_page_pin_unpin", |b| {
        b.iter(|| {
            if let Some(page) = pool.new_page() {
                let pid = page.page_id();
                black_box(page.page_id());
                pool.unpin_page(pid, false);
            }
        });
    });
}

fn bench_eviction_under_pressure(c: &mut Criterion) {
    let mut group = c.benchmark_group("eviction_under_pressure");

    for num_frames in [8usize, 32, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(num_frames), &num_frames, |b, &num_frames| {
            let (pool, _temp) = create_pool(num_frames, 2);
            let mut page_ids = Vec::new();
            for _ in 0..num_frames {
                let page = pool.new_page().unwrap();
                page_ids.push(page.page_id());
                pool.unpin_page(page.page_id(), false);
            }

            b.iter(|| {
                for _ in 0..num_frames {
                    if let Some(page) = pool.new_page() {
                        black_box(page.page_id());
                        pool.unpin_page(page.page_id(), false);
                    }
                }
            });
        });
    }

    group.finish();
}

fn bench_fetch_page_hit(c: &mut Criterion) {
    let (pool, _temp) = create_pool(256, 2);
    let mut page_ids = Vec::new();
    for _ in 0..128 {
        let page = pool.new_page().unwrap();
        page_ids.push(page.page_id());
        pool.unpin_page(page.page_id(), false);
    }

    c.bench_function("fetch_page_hit", |b| {
        b.iter(|| {
            for &pid in &page_ids {
                if let Some(page) = pool.fetch_page(pid) {
                    black_box(page.page_id());
                    pool.unpin_page(pid, false);
                }
            }
        });
    });
}

criterion_group!(benches, bench_new_page_pin_unpin, bench_eviction_under_pressure, bench_fetch_page_hit);
criterion_main!(benches);
