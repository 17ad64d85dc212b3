//! Shared helpers for integration tests.
//!
//! Builds a library directory of empty movie files, a config pointing the
//! TMDB and UNIT3D clients at a wiremock server, and canned mediainfo results.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use uploadcheck::config::{Config, TrackerConfig};
use uploadcheck::pipeline::Pipeline;
use uploadcheck::store::{FileRecord, RecordStore};
use uploadcheck_av::{AudioTrack, MediaInfo};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TRACKER: &str = "BLU";
pub const TRACKER_KEY: &str = "tracker-secret";
/// Second tracker, served under `/ait` on the same mock server.
pub const OTHER: &str = "AIT";

/// A scan root plus a separate data directory, both removed on drop.
pub struct Library {
    pub root: TempDir,
    pub data: TempDir,
}

impl Library {
    pub fn new(files: &[&str]) -> Self {
        let root = tempfile::tempdir().expect("failed to create library dir");
        let data = tempfile::tempdir().expect("failed to create data dir");
        for name in files {
            let path = root.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, b"not really a movie").unwrap();
        }
        Self { root, data }
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        vec![self.root.path().to_path_buf()]
    }

    /// Stored record for a file name under the root.
    pub fn record(&self, store: &RecordStore, name: &str) -> FileRecord {
        let path = self.root.path().join(name).canonicalize().unwrap();
        store
            .get(&path)
            .unwrap_or_else(|| panic!("no record for {}", name))
    }
}

/// Config with tiny size limits and every client pointed at `server`.
pub fn test_config(data_dir: &Path, server: &MockServer) -> Config {
    let mut config = Config::default();
    config.general.data_dir = data_dir.to_path_buf();
    config.general.workers = 3;
    config.scan.min_file_size_mb = 0;
    config.tmdb.api_key = Some("tmdb-key".to_string());
    config.tmdb.base_url = Some(server.uri());
    config.tmdb.requests_per_second = 100;

    let mut tracker = TrackerConfig::new(TRACKER, server.uri());
    tracker.api_key = Some(TRACKER_KEY.to_string());
    tracker.requests_per_minute = 6000;
    config.trackers = vec![tracker];
    config
}

/// Append the second tracker to `config` and return it for tweaking.
pub fn add_other_tracker<'a>(config: &'a mut Config, server: &MockServer) -> &'a mut TrackerConfig {
    let mut tracker = TrackerConfig::new(OTHER, format!("{}/ait", server.uri()));
    tracker.api_key = Some(TRACKER_KEY.to_string());
    tracker.requests_per_minute = 6000;
    config.trackers.push(tracker);
    config.trackers.last_mut().unwrap()
}

pub fn pipeline(config: Config) -> Pipeline {
    let store = RecordStore::open(config.records_path()).expect("failed to open store");
    Pipeline::new(Arc::new(config), Arc::new(store)).with_inspector(inspect_by_name)
}

/// English audio for every file except those named `Das.Boot*`.
pub fn inspect_by_name(path: &Path) -> uploadcheck_av::Result<MediaInfo> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.starts_with("Das.Boot") {
        return Ok(MediaInfo {
            file_path: path.to_path_buf(),
            container: "Matroska".to_string(),
            duration: Some(std::time::Duration::from_secs(149 * 60)),
            audio_tracks: vec![AudioTrack {
                codec: "AC-3".to_string(),
                channels: 2,
                language: Some("de".to_string()),
                title: None,
                default: true,
            }],
            ..Default::default()
        });
    }
    uploadcheck_av::parse_mediainfo_json(path, include_str!("../fixtures/mediainfo_english.json"))
}

pub fn search_result(id: u64, title: &str, date: &str, votes: u32) -> Value {
    json!({
        "id": id,
        "title": title,
        "original_title": title,
        "release_date": date,
        "vote_count": votes
    })
}

/// Answer `/search/movie?query=<query>` with `results`.
pub async fn mock_search(server: &MockServer, query: &str, results: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .and(query_param("query", query))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1,
            "results": results,
            "total_results": 1
        })))
        .mount(server)
        .await;
}

pub async fn mock_details(server: &MockServer, id: u64, runtime: u32, language: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/movie/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "runtime": runtime,
            "original_language": language,
            "imdb_id": "tt0000001"
        })))
        .mount(server)
        .await;
}

pub fn torrent(name: &str, release_type: &str, resolution: &str) -> Value {
    json!({
        "type": "torrent",
        "id": "1",
        "attributes": {
            "name": name,
            "type": release_type,
            "resolution": resolution
        }
    })
}

/// Answer the torrent filter for `tmdb_id` with `torrents`.
pub async fn mock_torrents(server: &MockServer, tmdb_id: u64, torrents: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/api/torrents/filter"))
        .and(query_param("tmdbId", tmdb_id.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": torrents })))
        .mount(server)
        .await;
}

/// Every other torrent filter query finds nothing.
pub async fn mock_no_torrents(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/torrents/filter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .with_priority(10)
        .mount(server)
        .await;
}

/// Answer every torrent filter query on the second tracker with `torrents`.
pub async fn mock_other_torrents(server: &MockServer, torrents: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/ait/api/torrents/filter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": torrents })))
        .mount(server)
        .await;
}
