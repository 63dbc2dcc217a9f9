use criterion::{black_box, criterion_group, criterion_main, Criterion};

use meterkit::Registry;

pub fn benchmark_register(c: &mut Criterion) {
    c.bench_function("register-counter-new", |b| {
        let registry = Registry::new();
        let mut values = (0i64..).map(|i| i.to_string());
        b.iter(|| {
            let v = values.next().unwrap();
            registry
                .counter("bench/register/new", &[("tag", v.as_str())])
                .unwrap()
        })
    });
    c.bench_function("register-counter-existing", |b| {
        let registry = Registry::new();
        let _counter = black_box(registry.counter("bench/register/existing", &[("tag", "one")]));
        b.iter(|| registry.counter("bench/register/existing", &[("tag", "one")]).unwrap());
    });
    c.bench_function("register-eight-tags-existing", |b| {
        let registry = Registry::new();
        let tags = [
            ("one", "1"),
            ("two", "2"),
            ("three", "3"),
            ("four", "4"),
            ("five", "5"),
            ("six", "6"),
            ("seven", "7"),
            ("eight", "8"),
        ];
        let _counter = black_box(registry.counter("bench/register/wide", &tags));
        b.iter(|| registry.counter("bench/register/wide", &tags).unwrap());
    });
}

pub fn benchmark_instruments(c: &mut Criterion) {
    c.bench_function("counter-increment", |b| {
        let registry = Registry::new();
        let counter = registry.counter("bench/counter", &[("tag", "one")]).unwrap();
        b.iter(|| counter.increment());
    });
    c.bench_function("timer-record", |b| {
        let registry = Registry::new();
        let timer = registry.timer("bench/timer", &[]).unwrap();
        b.iter(|| timer.record_nanos(black_box(1_250_000)));
    });
    c.bench_function("long-task-start-stop", |b| {
        let registry = Registry::new();
        let ltt = registry.long_task_timer("bench/ltt", &[]).unwrap();
        b.iter(|| {
            let task = ltt.start();
            black_box(ltt.stop(task))
        });
    });
}

pub fn benchmark_snapshot(c: &mut Criterion) {
    c.bench_function("snapshot-100-meters", |b| {
        let registry = Registry::new();
        let values: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        for v in &values {
            registry
                .counter("bench/snapshot", &[("tag", v.as_str())])
                .unwrap()
                .increment();
        }
        b.iter(|| black_box(registry.snapshot()));
    });
}

criterion_group!(
    benches,
    benchmark_register,
    benchmark_instruments,
    benchmark_snapshot
);
criterion_main!(benches);
