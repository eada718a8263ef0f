// tests/e2e_fixtures.rs
//! Whole run over the bundled fixtures: providers → pipeline → file sink.

use event_pulse::config::SourcesConfig;
use event_pulse::ingest::providers::{build_providers, FixturePaths};
use event_pulse::persist::{FileSink, MockSink, ReportSink};
use event_pulse::report::TrendDirection;
use event_pulse::{Pipeline, PipelineConfig, Query, SourceKind};
use std::path::PathBuf;

fn fixtures() -> FixturePaths {
    FixturePaths {
        ticketing: Some(PathBuf::from("tests/fixtures/ticketing_search.html")),
        social: Some(PathBuf::from("tests/fixtures/social_search.json")),
        trend: Some(PathBuf::from("tests/fixtures/trend_timeline.json")),
    }
}

async fn run_glasto() -> event_pulse::AggregateReport {
    let providers = build_providers(&SourcesConfig::default(), &fixtures()).unwrap();
    let q = Query::parse("Glastonbury Festival", "2025-06-25", None).unwrap();
    Pipeline::new(PipelineConfig::default(), providers)
        .unwrap()
        .run(&q)
        .await
        .unwrap()
}

#[tokio::test]
async fn fixture_run_produces_expected_summary() {
    let report = run_glasto().await;
    let s = report.summary();
    assert_eq!(s.total_items, 4);
    assert_eq!(s.per_source[&SourceKind::Ticketing], Some(2));
    assert_eq!(s.per_source[&SourceKind::Social], Some(1));
    assert_eq!(s.per_source[&SourceKind::Trend], Some(1));
    // 1250 + 0 + 500 + 100
    assert_eq!(s.total_engagement, 1850);
    assert_eq!(s.composite_trend_score, 87);

    let t = s.trend_interest.as_ref().unwrap();
    assert_eq!((t.on_date, t.max, t.min), (Some(100), 100, 31));
    assert_eq!(t.avg, 65.25);
    assert_eq!(t.direction, TrendDirection::Increasing);

    let m = report.metadata();
    assert_eq!(m.raw_counts[&SourceKind::Ticketing], 4);
    assert_eq!(m.malformed_counts[&SourceKind::Ticketing], 1);
    assert_eq!(m.malformed_counts[&SourceKind::Social], 1);
    assert_eq!(m.filtered_out, 9);
    assert_eq!(m.dedup_removed, 1);
    assert!(!m.degraded);

    // The social repost of the headline listing lost the tie to ticketing.
    assert!(report
        .detail()
        .iter()
        .all(|i| i.item.external_id != "1lk3jkl"));
}

#[tokio::test]
async fn file_sink_writes_timestamped_pretty_json() {
    let report = run_glasto().await;
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("Results");

    let path = FileSink::in_dir(&results).store(&report).await.unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("glastonbury_festival_"), "{name}");
    assert!(name.ends_with("_search_output.json"));
    assert_eq!(path.parent().unwrap(), results.as_path());

    let body = std::fs::read_to_string(&path).unwrap();
    assert!(body.contains("\n  \"summary\": {"));
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["metadata"]["query"]["keyword"], "Glastonbury Festival");
    assert_eq!(json["metadata"]["query"]["date"], "2025-06-25");
    assert_eq!(json["detail"].as_array().unwrap().len(), 4);
    assert!(json["detail"][0]["relevance_score"].as_u64().unwrap() >= 90);

    let exact = dir.path().join("nested/out.json");
    let written = FileSink::at_path(&exact).store(&report).await.unwrap();
    assert_eq!(written, exact);
    assert!(exact.exists());
}

#[tokio::test]
async fn mock_sink_records_each_report() {
    let report = run_glasto().await;
    let sink = MockSink::new();
    sink.store(&report).await.unwrap();
    sink.store(&report).await.unwrap();
    assert_eq!(sink.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn missing_credentials_degrade_instead_of_failing() {
    // Ticketing from fixture; social and trend have no credentials or endpoint.
    let fixtures = FixturePaths {
        ticketing: Some(PathBuf::from("tests/fixtures/ticketing_search.html")),
        ..Default::default()
    };
    let sources = SourcesConfig::default();
    let providers = build_providers(&sources, &fixtures).unwrap();
    let q = Query::parse("Glastonbury Festival", "2025-06-25", None).unwrap();
    let report = Pipeline::new(PipelineConfig::default(), providers)
        .unwrap()
        .run(&q)
        .await
        .unwrap();

    let m = report.metadata();
    assert!(m.degraded);
    let reasons: Vec<&str> = m.failures.iter().map(|f| f.reason.as_str()).collect();
    assert_eq!(reasons, vec!["not_configured", "not_configured"]);
    assert_eq!(report.summary().per_source[&SourceKind::Ticketing], Some(2));
}
