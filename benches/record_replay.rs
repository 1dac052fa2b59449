//! Benchmarks for record-replay performance

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::TempDir;

use async_trait::async_trait;
use rewind::cassette::{Cassette, Exchange};
use rewind::fingerprint::{self, ResponseDescriptor};
use rewind::matcher::{Matcher, QueueMatcher};
use rewind::message::{Body, HttpRequest, HttpResponse};
use rewind::{RecordingPolicy, Result, Transport, VcrBackend, VcrOptions};

/// Answers instantly without touching the network
struct InstantTransport;

#[async_trait]
impl Transport for InstantTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        Ok(HttpResponse::new(200, "OK").with_body(format!("Response {}", request.uri)))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

fn cassette(count: usize) -> Cassette {
    let interactions = (0..count)
        .map(|i| {
            let request = fingerprint::build(
                "GET",
                &format!("http://api.test/item/{}", i % 100),
                &Body::Empty,
                &[],
            )
            .unwrap();
            let response = ResponseDescriptor::capture(
                &HttpResponse::new(200, "OK").with_body(format!("Response {i}")),
            )
            .unwrap();
            Exchange::new(request, response)
        })
        .collect();
    Cassette::new("bench.json", interactions)
}

fn bench_matcher_find(c: &mut Criterion) {
    let cassette = cassette(1_000);
    let matcher = QueueMatcher::method_uri();
    let request =
        fingerprint::build("GET", "http://api.test/item/42", &Body::Empty, &[]).unwrap();

    c.bench_function("matcher_find_1000", |b| {
        b.iter(|| {
            let found = matcher.find(black_box(&request), black_box(&cassette));
            if found.is_none() {
                matcher.reset();
            }
            black_box(found);
        });
    });
}

fn bench_replay_single_request(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("replay.json");

    rt.block_on(async {
        let backend = VcrBackend::new(VcrOptions::new(&path), InstantTransport).unwrap();
        backend
            .send(HttpRequest::new("GET", "http://api.test/replay"))
            .await
            .unwrap();
        backend.shutdown().await;
    });

    let backend = VcrBackend::new(
        VcrOptions::new(&path).policy(RecordingPolicy::replay_only()),
        InstantTransport,
    )
    .unwrap();

    c.bench_function("replay_single_request", |b| {
        b.iter(|| {
            rt.block_on(async {
                let response = backend
                    .send(black_box(HttpRequest::new("GET", "http://api.test/replay")))
                    .await
                    .unwrap();
                black_box(response);
            });
            backend.reset_matcher();
        });
    });
}

fn bench_record_batch(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("record_100_requests", |b| {
        b.iter(|| {
            rt.block_on(async {
                let temp_dir = TempDir::new().unwrap();
                let backend = VcrBackend::new(
                    VcrOptions::new(temp_dir.path().join("batch.json")),
                    InstantTransport,
                )
                .unwrap();

                for i in 0..100 {
                    backend
                        .send(HttpRequest::new("GET", format!("http://api.test/item/{i}")))
                        .await
                        .unwrap();
                }

                backend.shutdown().await;
            });
        });
    });
}

criterion_group!(
    benches,
    bench_matcher_find,
    bench_replay_single_request,
    bench_record_batch
);
criterion_main!(benches);
