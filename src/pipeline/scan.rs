use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};
use uploadcheck_parser::Parser;

use super::Pipeline;
use crate::scanner::Scanner;
use crate::store::{record_key, FileRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub found: usize,
    pub added: usize,
    /// Files whose contents or parse result changed; later stages reset.
    pub changed: usize,
    pub unchanged: usize,
    pub banned: usize,
    /// Records dropped because their file is gone.
    pub removed: usize,
}

impl fmt::Display for ScanStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scan: {} found, {} new, {} changed, {} unchanged, {} banned, {} removed",
            self.found, self.added, self.changed, self.unchanged, self.banned, self.removed
        )
    }
}

impl Pipeline {
    /// Walk `roots`, parse every candidate and record it.
    ///
    /// Unchanged files keep their later stage results. Records under a root
    /// whose file no longer exists are removed.
    pub fn scan(&self, roots: &[PathBuf]) -> Result<ScanStats> {
        let scanner = Scanner::from_config(&self.config.scan)?;
        let parser = Parser::new(self.config.parser_config());
        let mut stats = ScanStats::default();

        for root in roots {
            let root = root
                .canonicalize()
                .with_context(|| format!("Cannot read scan root {:?}", root))?;
            let candidates = scanner.scan(&root)?;

            let mut seen = HashSet::with_capacity(candidates.len());
            let mut updates = Vec::new();

            for candidate in candidates {
                stats.found += 1;
                seen.insert(record_key(&candidate.path));

                let attrs = parser.parse(&candidate.path, candidate.size());
                if let Some(reason) = &attrs.ban_reason {
                    stats.banned += 1;
                    debug!(path = %candidate.path.display(), %reason, "Banned");
                }

                match self.store.get(&candidate.path) {
                    Some(existing)
                        if existing.file_key == candidate.file_key
                            && existing.root == root
                            && existing.attributes == attrs =>
                    {
                        stats.unchanged += 1;
                        continue;
                    }
                    Some(_) => stats.changed += 1,
                    None => stats.added += 1,
                }

                updates.push(FileRecord::new(
                    &candidate.path,
                    &root,
                    candidate.file_key,
                    attrs,
                ));
            }

            self.store
                .put_many(updates)
                .context("Failed to write scan results")?;

            let vanished: Vec<PathBuf> = self
                .store
                .select(|r| r.root == root && !seen.contains(&r.key()))
                .into_iter()
                .map(|r| r.path)
                .collect();
            for path in &vanished {
                debug!(path = %path.display(), "File no longer present");
            }
            stats.removed += self
                .store
                .remove_all(vanished.iter().map(PathBuf::as_path))
                .context("Failed to drop vanished records")?;
        }

        info!("{}", stats);
        Ok(stats)
    }
}
