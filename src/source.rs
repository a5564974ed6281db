//! Settings source: materializes the raw key/value mapping from a JSON file
//! and applies environment-variable overrides
//!
//! The resolver itself only consumes the already-materialized mapping; this
//! module is the in-process loader feeding it. Loader failures are reported
//! as [`SourceError`], separate from resolution failures.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::error::SourceError;
use crate::schema::{RawSettings, SettingSchema};

/// Environment lookup abstraction, swappable in tests
pub trait EnvSource: Send + Sync {
    /// Value of an environment variable, if set
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl EnvSource for SystemEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Loader producing [`RawSettings`] from a JSON file plus env overrides
///
/// # Example
///
/// ```no_run
/// use syncgw_config::{SettingSchema, SettingsSource};
///
/// let raw = SettingsSource::new("/etc/syncgw/settings.json")
///     .with_env_prefix("SYNCGW")
///     .load(&SettingSchema::gateway())
///     .unwrap();
/// ```
pub struct SettingsSource {
    path: PathBuf,
    env_prefix: Option<String>,
    env: Arc<dyn EnvSource>,
}

impl SettingsSource {
    /// Source reading from the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_prefix: None,
            env: Arc::new(SystemEnv),
        }
    }

    /// Default settings path under the OS config directory
    /// (e.g., `~/.config/syncgw/settings.json`)
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("syncgw"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("settings.json")
    }

    /// Enable env-var overrides: `{PREFIX}_{KEY}` with dots mapped to
    /// underscores, all uppercase (`SYNCGW_IMAP_HOST` overrides `imap.host`)
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Replace the environment lookup (test injection)
    #[must_use]
    pub fn with_env_source(mut self, env: Arc<dyn EnvSource>) -> Self {
        self.env = env;
        self
    }

    /// Materialize the raw settings mapping
    ///
    /// Reads and parses the file, then checks one env var per schema key.
    /// Env values are coerced: JSON first, then boolean and number
    /// heuristics, then string.
    pub fn load(&self, schema: &SettingSchema) -> Result<RawSettings, SourceError> {
        let mut raw = self.read_file()?;

        if self.env_prefix.is_some() {
            for key in schema.keys() {
                if let Some(value) = self.env_override(key) {
                    debug!("Setting {key} overridden from environment");
                    raw.insert(key.to_string(), value);
                }
            }
        }

        Ok(raw)
    }

    fn read_file(&self) -> Result<RawSettings, SourceError> {
        let path: &Path = &self.path;
        let content = std::fs::read_to_string(path).map_err(|source| SourceError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let value: Value = serde_json::from_str(&content).map_err(|source| SourceError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        match value {
            Value::Object(map) => Ok(map),
            _ => Err(SourceError::NotAnObject {
                path: path.to_path_buf(),
            }),
        }
    }

    fn env_override(&self, key: &str) -> Option<Value> {
        let prefix = self.env_prefix.as_ref()?;
        let env_key = key.replace(['.', '-'], "_").to_uppercase();
        let name = format!("{}_{env_key}", prefix.to_uppercase());
        self.env.var(&name).map(coerce_env_value)
    }
}

/// Coercion ladder for env values: JSON, then bool, integer, float, string
fn coerce_env_value(env_value: String) -> Value {
    serde_json::from_str(&env_value).unwrap_or_else(|_| {
        if env_value.eq_ignore_ascii_case("true") {
            Value::Bool(true)
        } else if env_value.eq_ignore_ascii_case("false") {
            Value::Bool(false)
        } else if let Ok(n) = env_value.parse::<i64>() {
            Value::Number(n.into())
        } else if let Ok(n) = env_value.parse::<f64>() {
            serde_json::Number::from_f64(n)
                .map_or_else(|| Value::String(env_value.clone()), Value::Number)
        } else {
            Value::String(env_value)
        }
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    /// Fixed map standing in for the process environment
    struct FakeEnv(HashMap<String, String>);

    impl FakeEnv {
        fn new(vars: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self(
                vars.iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            ))
        }
    }

    impl EnvSource for FakeEnv {
        fn var(&self, name: &str) -> Option<String> {
            self.0.get(name).cloned()
        }
    }

    #[test]
    fn test_env_var_name_mapping() {
        let env = FakeEnv::new(&[
            ("SYNCGW_IMAP_HOST", "imap.override.example"),
            ("SYNCGW_LOG_AUTH_FAILURES", "true"),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"imap.host": "imap.file.example"}"#).unwrap();

        let raw = SettingsSource::new(&path)
            .with_env_prefix("SYNCGW")
            .with_env_source(env)
            .load(&SettingSchema::gateway())
            .unwrap();

        // "imap.host" and "log.auth-failures" both map through underscores
        assert_eq!(raw.get("imap.host"), Some(&json!("imap.override.example")));
        assert_eq!(raw.get("log.auth-failures"), Some(&json!(true)));
    }

    #[test]
    fn test_coercion_ladder() {
        assert_eq!(coerce_env_value("true".into()), json!(true));
        assert_eq!(coerce_env_value("FALSE".into()), json!(false));
        assert_eq!(coerce_env_value("993".into()), json!(993));
        assert_eq!(coerce_env_value("1.5".into()), json!(1.5));
        assert_eq!(coerce_env_value("INBOX".into()), json!("INBOX"));
        // Quoted JSON strings survive verbatim
        assert_eq!(coerce_env_value("\"993\"".into()), json!("993"));
    }

    #[test]
    fn test_missing_file() {
        let err = SettingsSource::new("/nonexistent/settings.json")
            .load(&SettingSchema::gateway())
            .unwrap_err();
        assert!(matches!(err, SourceError::FileRead { .. }));
    }

    #[test]
    fn test_top_level_must_be_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let err = SettingsSource::new(&path)
            .load(&SettingSchema::gateway())
            .unwrap_err();
        assert!(matches!(err, SourceError::NotAnObject { .. }));
    }
}
