//! Benchmarks for the hot paths of a single call
//!
//! This benchmark measures:
//! - Retry delay computation
//! - Request construction and parameter encoding
//! - Response interception for success and failure outcomes

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use resilient_netkit::pipeline::{AttemptTimings, NoopResponseMonitor, ResponsePipeline};
use resilient_netkit::transport::{HttpRequest, ResponseHeaders, TransportOutcome};
use resilient_netkit::{BodyEncoding, Endpoint, RetryPolicy};
use serde_json::json;
use std::sync::Arc;

fn bench_attempt_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("attempt_plan");
    let policies = [
        ("constant", RetryPolicy::constant(10, Duration::from_millis(500))),
        ("exponential", RetryPolicy::exponential_default(10)),
    ];
    for (name, policy) in policies {
        group.bench_with_input(BenchmarkId::from_parameter(name), &policy, |b, policy| {
            b.iter(|| {
                for attempt in 0..12 {
                    black_box(policy.attempt_plan(black_box(attempt)));
                }
            })
        });
    }
    group.finish();
}

fn sample_endpoint(encoding: BodyEncoding) -> Endpoint {
    Endpoint::post("https://api.example.com/v1/orders")
        .unwrap()
        .with_header("Authorization", "Bearer abc")
        .with_query("customer", "c-1029")
        .with_query("items", json!([{"sku": "a", "qty": 2}, {"sku": "b", "qty": 1}]))
        .with_query("express", true)
        .with_encoding(encoding)
}

fn bench_request_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_build");
    for (name, encoding) in [("json", BodyEncoding::Json), ("form", BodyEncoding::UrlEncoded)] {
        let endpoint = sample_endpoint(encoding);
        group.bench_function(name, |b| {
            b.iter(|| HttpRequest::from_endpoint(black_box(&endpoint)).unwrap())
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let pipeline = ResponsePipeline::default().with_monitor(Arc::new(NoopResponseMonitor));
    let endpoint = sample_endpoint(BodyEncoding::Json);
    let request = HttpRequest::from_endpoint(&endpoint).unwrap();
    let headers: ResponseHeaders = [("content-type", "application/json")].into_iter().collect();
    let timings = AttemptTimings {
        start_ms: 0,
        end_ms: 12,
    };

    let ok = TransportOutcome::response(
        200,
        headers.clone(),
        r#"{"id":"o-1","items":[{"sku":"a","qty":2}],"total":1999}"#,
    );
    let client_error = TransportOutcome::response(422, headers.clone(), r#"{"error":"invalid sku"}"#);
    let server_error = TransportOutcome::response(503, headers, "unavailable");

    let mut group = c.benchmark_group("pipeline_process");
    for (name, outcome) in [("200", &ok), ("422", &client_error), ("503", &server_error)] {
        group.bench_function(name, |b| {
            b.iter(|| black_box(pipeline.process(outcome, &request, &endpoint, timings)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_attempt_plan, bench_request_build, bench_pipeline);
criterion_main!(benches);
