//! Error types for the configuration core

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::mail::FolderRole;
use crate::providers::ProviderKind;

/// Result type alias for full configuration resolution
pub type Result<T> = std::result::Result<T, ConfigError>;

// -------------------------------------------------------------------------
// Schema Errors
// -------------------------------------------------------------------------

/// Raised while validating raw input against the setting schema
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unknown setting key: {0}")]
    UnknownKey(String),

    #[error("Type mismatch for {key}: expected {expected}, got {actual}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Invalid value for {key}: {reason}")]
    ValidationFailed { key: String, reason: String },

    #[error("Missing required setting: {0}")]
    MissingRequired(String),
}

impl SchemaError {
    /// The setting key the error refers to
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            SchemaError::UnknownKey(key) | SchemaError::MissingRequired(key) => key,
            SchemaError::TypeMismatch { key, .. } | SchemaError::ValidationFailed { key, .. } => {
                key
            }
        }
    }
}

// -------------------------------------------------------------------------
// Provider Errors
// -------------------------------------------------------------------------

/// Raised while resolving provider names through the registry
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("No {kind} provider registered under '{name}'")]
    NotFound { kind: ProviderKind, name: String },

    #[error("Registry is sealed, cannot register {kind} provider '{name}'")]
    RegistryClosed { kind: ProviderKind, name: String },

    #[error("A {kind} provider named '{name}' is already registered")]
    AlreadyRegistered { kind: ProviderKind, name: String },
}

// -------------------------------------------------------------------------
// Connection Errors
// -------------------------------------------------------------------------

/// Raised while assembling mail or cache connection parameters
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Folder map is enabled but incomplete, missing roles: {}", join_roles(.missing))]
    IncompleteFolderMap { missing: Vec<FolderRole> },

    #[error("Unknown transport security mode: '{0}'")]
    UnknownSecurityMode(String),

    #[error("Authentication requested without a credential source")]
    MissingCredentialSource,

    #[error("Outbound mail parameters incomplete, missing: {}", .missing.join(", "))]
    IncompleteSendParams { missing: Vec<&'static str> },

    #[error("Outbound mail port out of range: {value}")]
    InvalidSendPort { value: i64 },

    #[error("Malformed cache server entry: '{entry}'")]
    InvalidCacheServer { entry: String },
}

fn join_roles(roles: &[FolderRole]) -> String {
    roles
        .iter()
        .map(|role| role.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// -------------------------------------------------------------------------
// Resolution Errors
// -------------------------------------------------------------------------

/// Stage of the resolution pipeline at which a failure was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SchemaValidation,
    ProviderResolution,
    Assembly,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::SchemaValidation => write!(f, "schema validation"),
            Stage::ProviderResolution => write!(f, "provider resolution"),
            Stage::Assembly => write!(f, "parameter assembly"),
        }
    }
}

/// The first stage error encountered during resolution
#[derive(Error, Debug)]
pub enum ResolveCause {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Terminal failure of [`resolve`](crate::ConfigResolver::resolve)
///
/// The process must refuse to start on this error; no partially built
/// configuration is ever exposed.
#[derive(Error, Debug)]
#[error("Configuration resolution failed during {stage}: {cause}")]
pub struct ConfigError {
    pub stage: Stage,
    #[source]
    pub cause: ResolveCause,
}

impl ConfigError {
    pub(crate) fn at(stage: Stage, cause: impl Into<ResolveCause>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }

    /// Stage at which resolution aborted
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Check if this failure came out of schema validation
    #[must_use]
    pub fn is_schema(&self) -> bool {
        matches!(self.cause, ResolveCause::Schema(_))
    }

    /// Check if this failure came out of provider lookup
    #[must_use]
    pub fn is_provider(&self) -> bool {
        matches!(self.cause, ResolveCause::Provider(_))
    }

    /// Check if this failure came out of parameter assembly
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self.cause, ResolveCause::Connection(_))
    }
}

// -------------------------------------------------------------------------
// Source Errors
// -------------------------------------------------------------------------

/// Raised while materializing raw settings from disk or environment
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read settings file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Settings file '{path}' must contain a top-level object")]
    NotAnObject { path: PathBuf },
}
