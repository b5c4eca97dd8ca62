use std::hint::black_box;
use std::rc::Rc;

use circuit_retained::{RetainedStateRegistry, RetainedStateRegistryImpl, RetainedValue};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

const KEYS: usize = 256;

fn populated() -> (RetainedStateRegistryImpl, Vec<circuit_retained::Entry>) {
    let registry = RetainedStateRegistryImpl::new();
    let entries = (0..KEYS)
        .map(|index| {
            registry.register_value(
                &format!("slot-{index}"),
                Box::new(move || Rc::new(index) as RetainedValue),
            )
        })
        .collect();
    (registry, entries)
}

fn bench_save(c: &mut Criterion) {
    let (registry, _entries) = populated();
    c.bench_function("perform_save_256", |b| b.iter(|| registry.perform_save()));
}

fn bench_restore(c: &mut Criterion) {
    c.bench_function("save_then_consume_256", |b| {
        b.iter_batched(
            populated,
            |(registry, entries)| {
                registry.perform_save();
                for entry in entries {
                    entry.unregister();
                }
                for index in 0..KEYS {
                    black_box(registry.consume_value(&format!("slot-{index}")));
                }
                registry.forget_unclaimed_values();
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_save, bench_restore);
criterion_main!(benches);
