//! TMDB client against a mock server.

mod common;

use std::sync::Arc;

use common::{mock_details, search_result};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use uploadcheck::catalog::{IdentityResolver, MatchPolicy, MetadataProvider, TmdbProvider, YearMatch};
use uploadcheck::Error;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> TmdbProvider {
    TmdbProvider::with_options("tmdb-key".into(), "en-US".into(), server.uri(), 100)
}

#[tokio::test]
async fn search_sends_key_language_and_year() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .and(query_param("api_key", "tmdb-key"))
        .and(query_param("language", "en-US"))
        .and(query_param("query", "The Matrix"))
        .and(query_param("year", "1999"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                search_result(603, "The Matrix", "1999-03-30", 25000),
                {"id": 1, "title": "No Date", "vote_count": 3}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let results = assert_ok!(provider(&server).search_movie("The Matrix", Some(1999)).await);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, 603);
    assert_eq!(results[0].year, Some(1999));
    // Same as the title, so not repeated.
    assert_eq!(results[0].original_title, None);
    assert_eq!(results[1].year, None);
}

#[tokio::test]
async fn details_map_runtime_and_language() {
    let server = MockServer::start().await;
    mock_details(&server, 593, 167, "ru").await;

    let details = assert_ok!(provider(&server).movie_details(593).await);
    assert_eq!(details.runtime_minutes, Some(167));
    assert_eq!(details.original_language.as_deref(), Some("ru"));
}

#[tokio::test]
async fn rate_limited_requests_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [search_result(949, "Heat", "1995-12-15", 6000)]
        })))
        .mount(&server)
        .await;

    let results = assert_ok!(provider(&server).search_movie("Heat", None).await);
    assert_eq!(results[0].id, 949);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn server_errors_are_lookup_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = assert_err!(provider(&server).search_movie("Heat", None).await);
    assert!(matches!(err, Error::LookupFailed(_)));
}

#[tokio::test]
async fn resolver_retries_without_year_and_caches() {
    let server = MockServer::start().await;
    // The strict year filter finds nothing for a file dated a year late.
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .and(query_param("year", "2000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [search_result(603, "The Matrix", "1999-03-30", 25000)]
        })))
        .with_priority(10)
        .mount(&server)
        .await;
    mock_details(&server, 603, 136, "en").await;

    let resolver = IdentityResolver::new(Arc::new(provider(&server)), MatchPolicy::default());
    let resolved = assert_ok!(resolver.resolve("The Matrix", Some(2000)).await);
    assert_eq!(resolved.identity.id, 603);
    assert_eq!(
        resolved.year_match,
        YearMatch::Mismatch {
            parsed: 2000,
            catalog: 1999
        }
    );
    assert_eq!(resolved.identity.runtime_minutes, Some(136));

    let requests = server.received_requests().await.unwrap().len();
    assert_ok!(resolver.resolve("the matrix", Some(2000)).await);
    assert_eq!(server.received_requests().await.unwrap().len(), requests);
}
