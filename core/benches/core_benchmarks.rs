use criterion::{black_box, criterion_group, criterion_main, Criterion};

use vermilion_core::{HandlePool, Signal};

// ---------------------------------------------------------------------------
// Handle pool
// ---------------------------------------------------------------------------

fn bench_handle_add_release_churn(c: &mut Criterion) {
    c.bench_function("handle_pool_add_release_1024", |b| {
        b.iter(|| {
            let mut pool: HandlePool<u64> = HandlePool::with_capacity(1024);
            let handles: Vec<_> = (0..1024u64).map(|i| pool.add(black_box(i))).collect();
            for h in handles {
                pool.release(h);
            }
            pool
        });
    });
}

fn bench_handle_get(c: &mut Criterion) {
    let mut pool: HandlePool<u64> = HandlePool::with_capacity(1024);
    let handles: Vec<_> = (0..1024u64).map(|i| pool.add(i)).collect();
    c.bench_function("handle_pool_get_1024", |b| {
        b.iter(|| {
            let mut acc = 0u64;
            for h in &handles {
                acc = acc.wrapping_add(*pool.get(black_box(*h)));
            }
            acc
        });
    });
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

fn bench_signal_emit_fanout(c: &mut Criterion) {
    let signal: Signal<u64> = Signal::new();
    let mut conns = Vec::new();
    for _ in 0..16 {
        conns.push(signal.connect(|v| {
            black_box(*v);
        }));
    }
    c.bench_function("signal_emit_16_listeners", |b| {
        b.iter(|| signal.emit(black_box(&42)));
    });
}

fn bench_signal_connect_disconnect(c: &mut Criterion) {
    let signal: Signal<()> = Signal::new();
    c.bench_function("signal_connect_disconnect", |b| {
        b.iter(|| {
            let conn = signal.connect(|_| {});
            drop(conn);
        });
    });
}

criterion_group!(
    benches,
    bench_handle_add_release_churn,
    bench_handle_get,
    bench_signal_emit_fanout,
    bench_signal_connect_disconnect
);
criterion_main!(benches);
