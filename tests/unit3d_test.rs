//! UNIT3D tracker client against a mock server.

mod common;

use common::torrent;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use uploadcheck::config::TrackerConfig;
use uploadcheck::trackers::{Tracker, Unit3dTracker};
use uploadcheck::Error;
use uploadcheck_parser::{Quality, Resolution};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tracker(server: &MockServer) -> Unit3dTracker {
    let mut config = TrackerConfig::new("BLU", format!("{}/", server.uri()));
    config.api_key = Some("secret".to_string());
    config.categories = vec![1, 3];
    config.requests_per_minute = 6000;
    Unit3dTracker::new(&config)
}

#[tokio::test]
async fn filter_query_uses_bearer_token_and_categories() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/torrents/filter"))
        .and(header("authorization", "Bearer secret"))
        .and(query_param("tmdbId", "603"))
        .and(query_param("categories[]", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                torrent("The Matrix 1999 1080p BluRay REMUX", "Remux", "1080p"),
                torrent("The Matrix 1999 2160p WEB-DL", "WEB-DL", "2160p"),
                torrent("The Matrix 1999 Other", "Encode", "Other")
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let all = assert_ok!(tracker(&server).find_by_catalog_id(603, None).await);
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].tier.quality, Quality::Remux);
    assert_eq!(all[0].name.as_deref(), Some("The Matrix 1999 1080p BluRay REMUX"));
    assert_eq!(all[1].tier.resolution, Resolution::_2160p);
    assert_eq!(all[2].tier.resolution, Resolution::Unknown);
}

#[tokio::test]
async fn resolution_filter_keeps_unreported_resolutions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/torrents/filter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                torrent("A 1080p", "Remux", "1080p"),
                torrent("A 2160p", "Remux", "2160p"),
                torrent("A", "Encode", "Other")
            ]
        })))
        .mount(&server)
        .await;

    let found = assert_ok!(
        tracker(&server)
            .find_by_catalog_id(603, Some(Resolution::_1080p))
            .await
    );
    let names: Vec<_> = found.iter().filter_map(|r| r.name.as_deref()).collect();
    assert_eq!(names, vec!["A 1080p", "A"]);
}

#[tokio::test]
async fn errors_are_tracker_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/torrents/filter"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = assert_err!(tracker(&server).find_by_catalog_id(603, None).await);
    match err {
        Error::TrackerUnavailable { tracker, message } => {
            assert_eq!(tracker, "BLU");
            assert!(message.contains("500"));
            assert!(message.contains("boom"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn malformed_body_is_tracker_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/torrents/filter"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = assert_err!(tracker(&server).find_by_catalog_id(603, None).await);
    assert!(matches!(err, Error::TrackerUnavailable { .. }));
}
