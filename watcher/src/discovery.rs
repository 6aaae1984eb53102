//! Heuristic discovery of log directories.
//!
//! Discovery probes a list of well-known roots, keeps the ones that exist and
//! can be listed, then looks one level below each of them for directories
//! holding at least one file that looks like a log.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{DiscoveryConfig, expand_home};

/// A path considered for monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryCandidate {
    /// Path as probed.
    pub path: PathBuf,

    /// Whether the path exists as a directory.
    pub exists: bool,

    /// Whether the directory listing could be opened.
    pub readable: bool,
}

impl DirectoryCandidate {
    /// Probe a path on the filesystem.
    pub fn probe(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let exists = path.is_dir();
        let readable = exists && fs::read_dir(&path).is_ok();

        Self {
            path,
            exists,
            readable,
        }
    }

    /// Whether the candidate can be watched.
    pub fn is_usable(&self) -> bool {
        self.exists && self.readable
    }
}

/// Discovers log directories on the local host.
#[derive(Debug, Clone, Default)]
pub struct LogDirectoryDiscovery {
    config: DiscoveryConfig,
}

impl LogDirectoryDiscovery {
    /// Create a discovery pass using the given heuristics.
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    /// The heuristics in use.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Run discovery and return the set of log-like directories.
    ///
    /// Inaccessible paths are skipped; discovery never fails as a whole.
    pub fn discover(&self) -> BTreeSet<PathBuf> {
        let mut found = BTreeSet::new();

        for pattern in &self.config.candidate_roots {
            for root in expand_pattern(pattern) {
                let candidate = DirectoryCandidate::probe(&root);
                if candidate.is_usable() {
                    found.insert(candidate.path);
                } else if candidate.exists {
                    debug!("Skipping unreadable root: {}", root.display());
                } else {
                    debug!("Skipping missing root: {}", root.display());
                }
            }
        }

        let roots: Vec<PathBuf> = found.iter().cloned().collect();
        for root in &roots {
            found.extend(self.log_subdirectories(root));
        }

        info!("Discovered {} log directories", found.len());
        found
    }

    /// Immediate subdirectories of `root` that contain a log-like file.
    fn log_subdirectories(&self, root: &Path) -> Vec<PathBuf> {
        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true);

        let mut subdirs = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping entry under {}: {e}", root.display());
                    continue;
                }
            };

            if entry.file_type().is_dir() && self.contains_log_files(entry.path()) {
                subdirs.push(entry.into_path());
            }
        }

        subdirs
    }

    fn contains_log_files(&self, dir: &Path) -> bool {
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true);

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file()
                        && self
                            .config
                            .is_log_file_name(&entry.file_name().to_string_lossy())
                    {
                        return true;
                    }
                }
                // Dangling links and unreadable entries do not disqualify the rest.
                Err(e) => debug!("Cannot scan entry in {}: {e}", dir.display()),
            }
        }

        false
    }
}

/// Expand one candidate root pattern into concrete paths.
///
/// Patterns without glob metacharacters come back as-is so the caller can
/// report them as missing; wildcard patterns yield only matching directories.
fn expand_pattern(pattern: &str) -> Vec<PathBuf> {
    let Some(path) = expand_home(pattern) else {
        debug!("No home directory for pattern: {pattern}");
        return Vec::new();
    };

    let expanded = path.to_string_lossy();
    if !expanded.contains(['*', '?', '[']) {
        return vec![path];
    }

    match glob::glob(&expanded) {
        Ok(paths) => paths
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .collect(),
        Err(e) => {
            debug!("Invalid root pattern {pattern}: {e}");
            Vec::new()
        }
    }
}
