use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rewind::fingerprint;
use rewind::message::Body;

fn bench_build_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint_build");
    let headers = vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Accept".to_string(), "application/json".to_string()),
        ("X-Trace".to_string(), "abc".to_string()),
    ];

    for size in [100, 1_000, 10_000] {
        let body = Body::Text("x".repeat(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                fingerprint::build(
                    black_box("post"),
                    black_box("http://API.example.com/v1/items?z=1&a=2#frag"),
                    black_box(&body),
                    black_box(&headers),
                )
            });
        });
    }

    group.finish();
}

fn bench_fingerprint_digest(c: &mut Criterion) {
    let descriptor = fingerprint::build(
        "POST",
        "http://api.example.com/v1/items",
        &Body::Text("x".repeat(1_000)),
        &[("Content-Type".to_string(), "application/json".to_string())],
    )
    .unwrap();

    c.bench_function("fingerprint_digest", |b| {
        b.iter(|| black_box(&descriptor).fingerprint());
    });
}

fn bench_normalize_uri(c: &mut Criterion) {
    c.bench_function("normalize_uri", |b| {
        b.iter(|| fingerprint::normalize_uri(black_box("HTTP://Example.COM/a/b?c=3&b=2&a=1#x")));
    });
}

criterion_group!(
    benches,
    bench_build_sizes,
    bench_fingerprint_digest,
    bench_normalize_uri
);
criterion_main!(benches);
