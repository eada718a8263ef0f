// tests/metrics_pipeline.rs
#![cfg(feature = "strict-metrics")]
use event_pulse::config::SourcesConfig;
use event_pulse::ingest::providers::{build_providers, FixturePaths};
use event_pulse::{Pipeline, PipelineConfig, Query};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::PathBuf;

#[tokio::test]
async fn metrics_exposed_after_run() {
    // Install a local recorder for the test
    let handle = PrometheusBuilder::new().install_recorder().expect("recorder");

    let fixtures = FixturePaths {
        ticketing: Some(PathBuf::from("tests/fixtures/ticketing_search.html")),
        social: Some(PathBuf::from("tests/fixtures/social_search.json")),
        trend: None,
    };
    let providers = build_providers(&SourcesConfig::default(), &fixtures).unwrap();
    let q = Query::parse("Glastonbury Festival", "2025-06-25", None).unwrap();
    let _ = Pipeline::new(PipelineConfig::default(), providers)
        .unwrap()
        .run(&q)
        .await
        .unwrap();

    // Scrape metrics text and check series presence by substring
    let out = handle.render();
    assert!(out.contains("pulse_records_total"));
    assert!(out.contains("pulse_malformed_total"));
    assert!(out.contains("pulse_source_failures_total{source=\"trend\"}"));
    assert!(out.contains("pulse_filtered_total"));
    assert!(out.contains("pulse_dedup_total"));
    assert!(out.contains("pulse_source_fetch_ms"));
}
