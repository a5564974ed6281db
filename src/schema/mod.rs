//! Setting schema: the full set of recognized gateway settings and the
//! validation that turns raw input into a normalized, typed map
//!
//! Validation iterates keys in lexicographic order so that for a given input
//! the first reported error is always the same.

mod types;

pub use types::{IntegerConstraints, SettingSpec, SettingType, TextConstraints};

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::mail::FolderRole;

/// Raw key/value input as materialized by the settings loader
pub type RawSettings = Map<String, Value>;

// =============================================================================
// Well-known Setting Keys
// =============================================================================

/// Keys recognized by the gateway schema.
///
/// The key format is "`category.setting_name`" (e.g., "imap.host").
pub mod keys {
    pub const TIMEZONE: &str = "general.timezone";
    pub const LOGIN_FULL_EMAIL: &str = "login.full-email";
    pub const AUTODISCOVER_LOGIN_TYPE: &str = "autodiscover.login-type";
    pub const LOG_LEVEL: &str = "log.level";
    pub const LOG_AUTH_FAILURES: &str = "log.auth-failures";
    pub const RETRY_AFTER_SECS: &str = "sync.retry-after-secs";
    pub const BACKEND_PROVIDER: &str = "backend.provider";
    pub const IPC_PROVIDER: &str = "ipc.provider";
    pub const IPC_CACHE_SERVERS: &str = "ipc.cache-servers";
    pub const IMAP_HOST: &str = "imap.host";
    pub const IMAP_PORT: &str = "imap.port";
    pub const IMAP_SECURITY: &str = "imap.security";
    pub const IMAP_FOLDERS_CONFIGURED: &str = "imap.folders-configured";
    pub const IMAP_USERNAME: &str = "imap.username";
    pub const IMAP_PASSWORD: &str = "imap.password";
    pub const SMTP_METHOD: &str = "smtp.method";
    pub const SMTP_PARAMS: &str = "smtp.params";
}

/// Anchored pattern for IANA-style timezone identifiers ("UTC", "America/Sao_Paulo")
const TIMEZONE_PATTERN: &str = r"^[A-Za-z_]+(/[A-Za-z0-9_+-]+)*$";

/// Anchored pattern for hostnames
const HOSTNAME_PATTERN: &str = r"^[A-Za-z0-9]([A-Za-z0-9.-]*[A-Za-z0-9])?$";

// =============================================================================
// Setting Schema
// =============================================================================

/// Registry of recognized setting keys and their specifications
///
/// # Example
///
/// ```
/// use syncgw_config::{SettingSchema, SettingSpec};
///
/// let mut schema = SettingSchema::new();
/// schema.register("pool.size", SettingSpec::integer(4).min(1).max(64));
///
/// let raw = serde_json::json!({"pool.size": 16});
/// let settings = schema.validate(raw.as_object().unwrap()).unwrap();
/// assert_eq!(settings.get_i64("pool.size"), Some(16));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SettingSchema {
    specs: BTreeMap<String, SettingSpec>,
}

impl SettingSchema {
    /// Create an empty schema
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The full schema of the synchronization gateway
    ///
    /// Every setting the resolver consumes is declared here; raw input
    /// containing any other key is rejected.
    #[must_use]
    pub fn gateway() -> Self {
        let mut schema = Self::new();

        schema.register(
            keys::TIMEZONE,
            SettingSpec::text("UTC").pattern(TIMEZONE_PATTERN),
        );
        schema.register(keys::LOGIN_FULL_EMAIL, SettingSpec::toggle(false));
        schema.register(
            keys::AUTODISCOVER_LOGIN_TYPE,
            SettingSpec::select("email", &["email", "username"]),
        );

        schema.register(
            keys::LOG_LEVEL,
            SettingSpec::select("info", &["off", "error", "warn", "info", "debug", "trace"]),
        );
        schema.register(keys::LOG_AUTH_FAILURES, SettingSpec::toggle(false));
        schema.register(
            keys::RETRY_AFTER_SECS,
            SettingSpec::integer(300).min(1).max(86_400),
        );

        schema.register(
            keys::BACKEND_PROVIDER,
            SettingSpec::text_required().pattern(r"^\S+$"),
        );
        schema.register(
            keys::IPC_PROVIDER,
            SettingSpec::text("shared-memory").pattern(r"^\S+$"),
        );
        schema.register(
            keys::IPC_CACHE_SERVERS,
            SettingSpec::text("localhost:11211"),
        );

        schema.register(
            keys::IMAP_HOST,
            SettingSpec::text_required().pattern(HOSTNAME_PATTERN),
        );
        schema.register(
            keys::IMAP_PORT,
            SettingSpec::integer_required().min(1).max(65_535),
        );
        schema.register(keys::IMAP_SECURITY, SettingSpec::text("ssl"));
        schema.register(keys::IMAP_FOLDERS_CONFIGURED, SettingSpec::toggle(false));
        for role in FolderRole::ALL {
            schema.register(role.setting_key(), SettingSpec::text_optional());
        }
        schema.register(keys::IMAP_USERNAME, SettingSpec::text_optional());
        schema.register(keys::IMAP_PASSWORD, SettingSpec::text_optional());

        // Outbound mail defaults to reusing the backend connection; the
        // nested parameter map is only needed for direct SMTP.
        schema.register(
            keys::SMTP_METHOD,
            SettingSpec::select("backend", &["smtp", "backend"]),
        );
        schema.register(keys::SMTP_PARAMS, SettingSpec::map());

        schema
    }

    /// Add a recognized key to the schema, replacing any previous spec
    pub fn register(&mut self, key: impl Into<String>, spec: SettingSpec) {
        self.specs.insert(key.into(), spec);
    }

    /// Iterate over all registered keys in lexicographic order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Look up the spec registered for a key
    #[must_use]
    pub fn spec(&self, key: &str) -> Option<&SettingSpec> {
        self.specs.get(key)
    }

    /// Validate raw input against the schema
    ///
    /// Unknown keys are rejected first, then every registered key is checked
    /// in lexicographic order: present values are type- and constraint-checked,
    /// absent keys receive their default or fail as missing when required.
    pub fn validate(&self, raw: &RawSettings) -> Result<Settings, SchemaError> {
        let mut unknown: Vec<&String> = raw
            .keys()
            .filter(|key| !self.specs.contains_key(*key))
            .collect();
        unknown.sort();
        if let Some(key) = unknown.first() {
            return Err(SchemaError::UnknownKey((*key).clone()));
        }

        let mut values = BTreeMap::new();
        for (key, spec) in &self.specs {
            match raw.get(key) {
                Some(value) => {
                    spec.check(key, value)?;
                    values.insert(key.clone(), value.clone());
                }
                None => {
                    if let Some(default) = &spec.default {
                        values.insert(key.clone(), default.clone());
                    } else if spec.required {
                        return Err(SchemaError::MissingRequired(key.clone()));
                    }
                }
            }
        }

        Ok(Settings { values })
    }
}

// =============================================================================
// Normalized Settings
// =============================================================================

/// Normalized, validated settings produced by [`SettingSchema::validate`]
///
/// Required keys and keys with defaults are guaranteed present; optional keys
/// without defaults may be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<String, Value>,
}

impl Settings {
    /// Raw value of a key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String value of a Text or Select key
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Boolean value of a Toggle key
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    /// Integer value of an Integer key
    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(Value::as_i64)
    }

    /// Nested object value of a Map key
    #[must_use]
    pub fn get_map(&self, key: &str) -> Option<&Map<String, Value>> {
        self.values.get(key).and_then(Value::as_object)
    }

    /// Whether the key carries a value
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

// =============================================================================
// Tests
// =============================================================================
