// config.rs: Daemon configuration.
//
// Loaded from `.grc/grc.toml` in the project root. Every section and field
// is optional; `for_project()` fills in defaults under `.grc/` and resolves
// relative paths against the project root.
//
// ```toml
// [server]
// bind = "127.0.0.1:7420"
//
// [store]
// dir = ".grc/store"
// ephemeral = false
//
// [events]
// enabled = true
// log = ".grc/events.jsonl"
// ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DaemonError;

pub const CONFIG_FILE: &str = "grc.toml";
pub const DEFAULT_BIND: &str = "127.0.0.1:7420";

/// Top-level configuration from `.grc/grc.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrcConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub events: EventsConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Where documents live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory for the JSON document store.
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,

    /// Keep everything in memory and discard it on exit.
    #[serde(default)]
    pub ephemeral: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            ephemeral: false,
        }
    }
}

/// Register event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// JSONL file the log sink appends to.
    #[serde(default = "default_events_log")]
    pub log: PathBuf,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log: default_events_log(),
        }
    }
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_store_dir() -> PathBuf {
    PathBuf::from(".grc").join("store")
}

fn default_events_log() -> PathBuf {
    PathBuf::from(".grc").join("events.jsonl")
}

fn default_true() -> bool {
    true
}

impl GrcConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let content = std::fs::read_to_string(path).map_err(|source| DaemonError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| DaemonError::Config {
            path: path.display().to_string(),
            source,
        })
    }

    /// Try to load config, returning defaults if the file is missing.
    /// A file that exists but does not parse is reported and ignored.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("ignoring {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Config for a project: `.grc/grc.toml` if present, paths resolved
    /// against `project_root`.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref();
        Self::load_or_default(&root.join(".grc").join(CONFIG_FILE)).resolved(root)
    }

    /// Make relative store and log paths absolute under `root`.
    pub fn resolved(mut self, root: &Path) -> Self {
        if self.store.dir.is_relative() {
            self.store.dir = root.join(&self.store.dir);
        }
        if self.events.log.is_relative() {
            self.events.log = root.join(&self.events.log);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults_under_project() {
        let dir = tempdir().unwrap();
        let config = GrcConfig::for_project(dir.path());
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.store.dir, dir.path().join(".grc/store"));
        assert_eq!(config.events.log, dir.path().join(".grc/events.jsonl"));
        assert!(config.events.enabled);
        assert!(!config.store.ephemeral);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".grc")).unwrap();
        std::fs::write(
            dir.path().join(".grc/grc.toml"),
            "[server]\nbind = \"0.0.0.0:9000\"\n\n[events]\nenabled = false\n",
        )
        .unwrap();

        let config = GrcConfig::for_project(dir.path());
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert!(!config.events.enabled);
        assert_eq!(config.store.dir, dir.path().join(".grc/store"));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let config = GrcConfig {
            store: StoreConfig {
                dir: PathBuf::from("/srv/grc"),
                ephemeral: false,
            },
            ..Default::default()
        }
        .resolved(Path::new("/home/project"));
        assert_eq!(config.store.dir, PathBuf::from("/srv/grc"));
        assert_eq!(config.events.log, PathBuf::from("/home/project/.grc/events.jsonl"));
    }

    #[test]
    fn malformed_file_is_an_error_but_load_or_default_recovers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grc.toml");
        std::fs::write(&path, "[server\nbind = 1").unwrap();
        assert!(matches!(GrcConfig::load(&path), Err(DaemonError::Config { .. })));
        assert_eq!(GrcConfig::load_or_default(&path), GrcConfig::default());
    }
}
