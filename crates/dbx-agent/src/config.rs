use std::path::{Path, PathBuf};

use dbx_sync::ConcurrencyMode;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, AgentResult};

pub const DEFAULT_CONTROL_ADDR: &str = "127.0.0.1:9876";

/// Agent configuration, read from TOML. Every field has a default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// `host:port` of the control process.
    pub control_addr: String,
    pub store_root: PathBuf,
    pub key_file: PathBuf,
    pub ledger_journal: PathBuf,
    /// Close the connection after a failed `synchronize`.
    pub teardown_on_failure: bool,
    pub sync: ConcurrencyMode,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let base = PathBuf::from(".driftbox");
        Self {
            control_addr: DEFAULT_CONTROL_ADDR.to_string(),
            store_root: base.join("store"),
            key_file: base.join("session.key"),
            ledger_journal: base.join("anchors.jsonl"),
            teardown_on_failure: true,
            sync: ConcurrencyMode::default(),
        }
    }
}

impl AgentConfig {
    pub fn load(path: impl AsRef<Path>) -> AgentResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| AgentError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text).map_err(|e| match e {
            AgentError::Config(msg) => AgentError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn from_toml(text: &str) -> AgentResult<Self> {
        toml::from_str(text).map_err(|e| AgentError::Config(e.to_string()))
    }

    /// Use `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> AgentResult<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    pub fn to_toml(&self) -> AgentResult<String> {
        toml::to_string_pretty(self).map_err(|e| AgentError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = AgentConfig::default();
        assert_eq!(c.control_addr, "127.0.0.1:9876");
        assert!(c.teardown_on_failure);
        assert_eq!(c.sync, ConcurrencyMode::Concurrent { limit: 8 });
        assert_eq!(c.ledger_journal, PathBuf::from(".driftbox/anchors.jsonl"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let c = AgentConfig::from_toml(
            r#"
            control_addr = "sync.example.net:80"
            teardown_on_failure = false

            [sync]
            mode = "serial"
            "#,
        )
        .unwrap();
        assert_eq!(c.control_addr, "sync.example.net:80");
        assert!(!c.teardown_on_failure);
        assert_eq!(c.sync, ConcurrencyMode::Serial);
        assert_eq!(c.store_root, AgentConfig::default().store_root);
    }

    #[test]
    fn concurrent_limit_is_read() {
        let c = AgentConfig::from_toml("[sync]\nmode = \"concurrent\"\nlimit = 2\n").unwrap();
        assert_eq!(c.sync.limit(), 2);
    }

    #[test]
    fn round_trips_through_toml() {
        let c = AgentConfig::default();
        assert_eq!(AgentConfig::from_toml(&c.to_toml().unwrap()).unwrap(), c);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        assert!(matches!(
            AgentConfig::from_toml("control_addr = 5"),
            Err(AgentError::Config(_))
        ));
    }

    #[test]
    fn load_reads_file_and_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");
        std::fs::write(&path, "teardown_on_failure = false\n").unwrap();
        assert!(!AgentConfig::load(&path).unwrap().teardown_on_failure);

        let err = AgentConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
        assert_eq!(AgentConfig::load_or_default(None).unwrap(), AgentConfig::default());
    }
}
