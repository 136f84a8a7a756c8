use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use pkgset::{
    Atom, MemoryBackend, PackageRecord, PackageSet, Repository, RepositoryDict,
};

/// Synthetic tree: `categories` x `names` packages, `versions` versions each.
fn build_dict(categories: usize, names: usize, versions: usize) -> RepositoryDict {
    let mut backend = MemoryBackend::new();
    for c in 0..categories {
        for n in 0..names {
            for v in 0..versions {
                backend.add("gentoo", PackageRecord::new(&format!("cat-{c}/pkg-{n}-1.{v}")));
            }
        }
    }
    let backend = Arc::new(backend);

    let mut dict = RepositoryDict::new();
    dict.insert(Repository::new(
        "gentoo",
        "/var/db/repos/gentoo",
        -1000,
        backend,
    ));
    dict
}

fn bench_query(c: &mut Criterion) {
    let dict = build_dict(20, 50, 10);
    let full = Atom::parse("cat-10/pkg-25").unwrap();
    let partial = Atom::parse("pkg-25").unwrap();
    let bounded = Atom::parse(">=cat-10/pkg-25-1.5").unwrap();

    c.bench_function("best/full-atom", |b| {
        b.iter(|| dict.query(black_box(&full)).best().unwrap())
    });

    c.bench_function("best/version-bound", |b| {
        b.iter(|| dict.query(black_box(&bounded)).best().unwrap())
    });

    // Partial atoms resolve the category per repository first.
    c.bench_function("iter/partial-atom", |b| {
        b.iter(|| {
            dict.query(black_box(&partial))
                .iter()
                .filter_map(Result::ok)
                .count()
        })
    });

    // Scans the whole tree through the lazy filter adapter.
    c.bench_function("filter/full-scan", |b| {
        b.iter(|| {
            (&dict).filter(black_box(full.clone()))
                .iter()
                .filter_map(Result::ok)
                .count()
        })
    });

    // Should stop at the first match, not scan the tree.
    c.bench_function("contains/short-circuit", |b| {
        b.iter(|| dict.contains(black_box(full.clone())).unwrap())
    });

    c.bench_function("sorted/drain", |b| {
        b.iter(|| {
            let sorted = (&dict).filter(full.clone()).sorted();
            sorted.iter().filter_map(Result::ok).count()
        })
    });
}

criterion_group!(benches, bench_query);
criterion_main!(benches);
