//! Configuration types for discovery and monitoring.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::event::EventType;

/// Top-level configuration, usually loaded from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogWatchConfig {
    /// How log directories are discovered.
    pub discovery: DiscoveryConfig,

    /// How discovered directories are watched.
    pub monitor: MonitorConfig,
}

impl LogWatchConfig {
    /// Load a configuration file. Missing fields fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Configuration for the log directory heuristic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Root paths to probe. A leading `~/` is the home directory and a single
    /// `*` component matches every subdirectory at that level.
    pub candidate_roots: Vec<String>,

    /// File extensions that mark a file as a log (compared case-insensitively).
    pub extensions: Vec<String>,

    /// Substrings of a file name that mark it as a log (case-insensitive).
    pub keywords: Vec<String>,
}

impl DiscoveryConfig {
    /// Create a config that probes only the given roots.
    pub fn with_roots<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidate_roots: roots.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add a candidate root.
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.candidate_roots.push(root.into());
        self
    }

    /// Replace the extension list.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the keyword list.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Check whether a file name looks like a log file.
    pub fn is_log_file_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();

        self.extensions
            .iter()
            .any(|ext| name.ends_with(&ext.to_lowercase()))
            || self
                .keywords
                .iter()
                .any(|keyword| name.contains(&keyword.to_lowercase()))
    }

    fn default_roots() -> Vec<String> {
        [
            // System logs
            "/var/log",
            "/var/log/apache2",
            "/var/log/nginx",
            "/var/log/mysql",
            "/var/log/postgresql",
            "/var/log/syslog",
            "/var/log/auth",
            "/var/log/kern",
            "/var/log/mail",
            "/var/log/cron",
            "/var/log/daemon",
            "/var/log/user",
            "/var/log/messages",
            "/var/log/journal",
            // Containers
            "/var/log/docker",
            "/var/log/pods",
            "/var/log/containers",
            // Applications
            "/opt/*/logs",
            "/opt/*/log",
            "/usr/local/*/logs",
            "/usr/share/*/logs",
            "/var/log/*/logs",
            "/etc/*/logs",
            // Users
            "/tmp/logs",
            "/home/*/logs",
            "~/.local/share/logs",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn default_extensions() -> Vec<String> {
        [
            ".log", ".txt", ".out", ".err", ".access", ".error", ".debug", ".info",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn default_keywords() -> Vec<String> {
        ["log", "access", "error", "debug", "audit"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            candidate_roots: Self::default_roots(),
            extensions: Self::default_extensions(),
            keywords: Self::default_keywords(),
        }
    }
}

/// Configuration for the monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Event types requested from the OS.
    pub events: Vec<EventType>,

    /// Maximum number of discovered directories to watch.
    pub max_dirs: usize,
}

impl MonitorConfig {
    /// Set the event mask.
    pub fn with_events(mut self, events: impl IntoIterator<Item = EventType>) -> Self {
        self.events = events.into_iter().collect();
        self
    }

    /// Set the directory cap.
    pub fn with_max_dirs(mut self, max_dirs: usize) -> Self {
        self.max_dirs = max_dirs;
        self
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            events: EventType::ALL.to_vec(),
            max_dirs: 50,
        }
    }
}

/// Expand `~/` at the start of a pattern to the home directory.
pub(crate) fn expand_home(pattern: &str) -> Option<PathBuf> {
    match pattern.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None if pattern == "~" => dirs::home_dir(),
        None => Some(PathBuf::from(pattern)),
    }
}
