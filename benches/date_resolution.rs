use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use lifeweave::dates::{self, DateOrder};

/// Representative mix of the dialects real exports contain.
const SAMPLES: &[&str] = &[
    "2021-06-05T14:30:00Z",
    "2021-06-05",
    "2021:06:05 14:30:00",
    "20210605T143000Z",
    "06/05/2021",
    "05.06.2021",
    "June 5, 2021",
    "2021",
    "1622894400",
    "1622894400000",
    "not a date at all",
];

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("date_resolve");

    group.bench_function("dialect_mix", |b| {
        b.iter(|| {
            for sample in SAMPLES {
                black_box(dates::resolve(black_box(sample), DateOrder::MonthFirst));
            }
        });
    });

    group.bench_function("path_fragment_scan", |b| {
        b.iter(|| {
            black_box(dates::from_path(black_box(
                "backups/photos/2021/IMG_20210605_143000.jpg",
            )))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
