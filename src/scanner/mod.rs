//! Filesystem discovery of candidate movie files.
//!
//! The scanner only finds files; whether a file is acceptable (extension,
//! size, name) is the ban policy's decision.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::store::FileKey;

/// Extensions the scanner reports even when not configured, so the ban
/// policy can record why they were excluded.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "m4v", "avi", "mov", "wmv", "ts", "m2ts", "mpg", "mpeg", "iso", "webm",
];

/// A file found under a scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub root: PathBuf,
    pub extension: String,
    pub file_key: FileKey,
}

impl Candidate {
    pub fn size(&self) -> u64 {
        self.file_key.size
    }
}

pub struct Scanner {
    extensions: Vec<String>,
    skip_dirs: Option<Regex>,
    follow_links: bool,
}

impl Scanner {
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        let skip_dirs = config
            .skip_dirs_pattern
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(Regex::new)
            .transpose()
            .context("Invalid scan.skip_dirs_pattern")?;

        let mut extensions: Vec<String> = VIDEO_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        for ext in &config.extensions {
            let ext = ext.trim_start_matches('.').to_lowercase();
            if !ext.is_empty() && !extensions.contains(&ext) {
                extensions.push(ext);
            }
        }

        Ok(Self {
            extensions,
            skip_dirs,
            follow_links: config.follow_links,
        })
    }

    fn is_skipped_dir(&self, name: &str) -> bool {
        self.skip_dirs.as_ref().is_some_and(|re| re.is_match(name))
    }

    /// Walk `root` and return candidate files, sorted by path.
    pub fn scan(&self, root: &Path) -> Result<Vec<Candidate>> {
        if !root.is_dir() {
            anyhow::bail!("Scan root is not a directory: {:?}", root);
        }
        info!("Scanning directory: {:?}", root);

        let mut candidates = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(self.follow_links)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                let skip = self.is_skipped_dir(&name);
                if skip {
                    debug!(dir = %e.path().display(), "Skipping directory");
                }
                !skip
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let extension = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if !self.extensions.contains(&extension) {
                continue;
            }

            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(e) => {
                    warn!("Failed to stat {:?}: {}", path, e);
                    continue;
                }
            };

            candidates.push(Candidate {
                path: path.to_path_buf(),
                root: root.to_path_buf(),
                extension,
                file_key: FileKey::from_metadata(&meta),
            });
        }

        candidates.sort_by(|a, b| a.path.cmp(&b.path));
        info!(
            "Scan complete: {} candidate files under {:?}",
            candidates.len(),
            root
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path, bytes: usize) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, vec![0u8; bytes]).unwrap();
    }

    #[test]
    fn finds_video_files_and_prunes_series_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("Movie.2014.1080p.BluRay.x264-GRP.mkv"), 10);
        touch(&root.join("sub/Other.2001.720p.WEB-DL-GRP.mp4"), 20);
        touch(&root.join("sub/notes.txt"), 5);
        touch(&root.join("Show/Season 01/Show.S01E01.mkv"), 5);
        touch(&root.join("Show/S02/Show.S02E01.mkv"), 5);

        let scanner = Scanner::from_config(&ScanConfig::default()).unwrap();
        let found = scanner.scan(root).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|c| c.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            names,
            vec![
                "Movie.2014.1080p.BluRay.x264-GRP.mkv".to_string(),
                "Other.2001.720p.WEB-DL-GRP.mp4".to_string(),
            ]
        );
        assert_eq!(found[1].size(), 20);
        assert_eq!(found[1].extension, "mp4");
        assert_eq!(found[0].root, root);
    }

    #[test]
    fn pruning_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Season 1/Ep.mkv"), 1);
        let config = ScanConfig {
            skip_dirs_pattern: None,
            ..Default::default()
        };
        let found = Scanner::from_config(&config).unwrap().scan(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn configured_extensions_are_added() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Movie.2010.1080p.rmvb"), 1);
        let config = ScanConfig {
            extensions: vec![".RMVB".to_string()],
            ..Default::default()
        };
        let found = Scanner::from_config(&config).unwrap().scan(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn missing_root_is_an_error() {
        let scanner = Scanner::from_config(&ScanConfig::default()).unwrap();
        assert!(scanner.scan(Path::new("/definitely/not/here")).is_err());
    }
}
