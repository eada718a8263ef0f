// tests/ingest_normalize.rs
use event_pulse::ingest::normalize_batch;
use event_pulse::ingest::providers::{SocialProvider, TicketingProvider, TrendProvider};
use event_pulse::{Query, SourceKind, SourceProvider};

fn q() -> Query {
    Query::parse("Glastonbury Festival", "2025-06-25", None).unwrap()
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}")).expect("fixture")
}

#[tokio::test]
async fn ticketing_fixture_normalizes_and_counts_malformed() {
    let p = TicketingProvider::from_fixture_str(&fixture("ticketing_search.html"), "https://www.eventbrite.co.uk");
    let recs = p.fetch(&q()).await.unwrap();
    assert_eq!(recs.len(), 4);

    let batch = normalize_batch(&recs, &q());
    assert_eq!(batch.malformed, 1, "card without a link has no identifier");
    assert_eq!(batch.items.len(), 3);

    let first = &batch.items[0];
    assert_eq!(first.source, SourceKind::Ticketing);
    assert_eq!(first.external_id, "100000000001");
    assert_eq!(first.title, "Glastonbury Festival 2025");
    assert_eq!(first.location.as_deref(), Some("Worthy Farm, Pilton"));
    assert_eq!(first.engagement, 1250);
    assert_eq!(
        first.timestamp.unwrap().to_rfc3339(),
        "2025-06-25T10:00:00+00:00"
    );
    // naive card time is UK local (BST)
    assert_eq!(
        batch.items[1].timestamp.unwrap().to_rfc3339(),
        "2025-06-24T06:30:00+00:00"
    );
}

#[tokio::test]
async fn social_fixture_maps_engagement_and_community() {
    let recs = SocialProvider::from_fixture_str(&fixture("social_search.json"))
        .fetch(&q())
        .await
        .unwrap();
    assert_eq!(recs.len(), 4);

    let batch = normalize_batch(&recs, &q());
    assert_eq!(batch.malformed, 1);
    let post = batch
        .items
        .iter()
        .find(|i| i.external_id == "1lk2abc")
        .unwrap();
    assert_eq!(post.engagement, 412 + 88);
    assert_eq!(post.location.as_deref(), Some("London"));
    assert!(post.text.contains("The & Pyramid stage"));
    assert_eq!(
        post.url.as_deref(),
        Some("https://reddit.com/r/london/comments/1lk2abc/glastonbury_festival_2025_lineup_thoughts/")
    );

    let exclaimed = batch.items.iter().find(|i| i.external_id == "1lk3jkl").unwrap();
    assert_eq!(exclaimed.title, "Glastonbury Festival 2025");
}

#[tokio::test]
async fn trend_buckets_become_keyword_items_without_location() {
    let recs = TrendProvider::from_fixture_str(&fixture("trend_timeline.json"))
        .fetch(&q())
        .await
        .unwrap();
    let batch = normalize_batch(&recs, &q());
    assert_eq!(batch.malformed, 0);
    assert_eq!(batch.items.len(), 8);
    for it in &batch.items {
        assert_eq!(it.source, SourceKind::Trend);
        assert_eq!(it.title, "Glastonbury Festival");
        assert!(it.location.is_none());
    }
    let peak = batch.items.iter().find(|i| i.external_id == "trend:2025-06-25").unwrap();
    assert_eq!(peak.engagement, 100);
}
