//! # syncgw-config
//!
//! Typed configuration resolution and backend selection for a mobile-device
//! synchronization gateway bridging a push-protocol client fleet to a mail
//! backend (IMAP/SMTP) and an inter-process cache.
//!
//! ## Features
//!
//! - **Setting Schema**: every recognized key declared with type, default,
//!   and constraints; unknown keys are rejected, never ignored
//! - **Provider Registry**: backend and IPC implementations selected by name
//!   through a sealed registry of factories, so invalid selections fail at
//!   startup instead of mid-session
//! - **Connection Assembly**: validated, immutable IMAP/SMTP descriptors
//!   with transport security, folder-role mapping, and credential sources
//! - **Fail Fast**: the first schema, provider, or assembly error aborts
//!   resolution with the stage and offending key in the message
//!
//! ## Quick Start
//!
//! ```rust
//! use syncgw_config::{ConfigResolver, ProviderRegistry};
//!
//! let mut registry = ProviderRegistry::with_builtins();
//!
//! let raw = serde_json::json!({
//!     "general.timezone": "America/Sao_Paulo",
//!     "backend.provider": "imap",
//!     "ipc.provider": "shared-memory",
//!     "imap.host": "imap-ha.skymail.net.br",
//!     "imap.port": 993,
//!     "imap.security": "ssl",
//!     "sync.retry-after-secs": 30,
//! });
//!
//! let config = ConfigResolver::new()
//!     .resolve(&mut registry, raw.as_object().unwrap())
//!     .unwrap();
//!
//! let (backend, params) = config.backend_provider();
//! assert_eq!(backend, "imap");
//! assert_eq!(params.port(), 993);
//! assert_eq!(config.retry_after_secs(), 30);
//! ```
//!
//! ## Loading from Disk
//!
//! The resolver consumes an already-materialized mapping; [`SettingsSource`]
//! produces one from a JSON file with optional env-var overrides:
//!
//! ```rust,no_run
//! use syncgw_config::{ConfigResolver, ProviderRegistry, SettingSchema, SettingsSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let raw = SettingsSource::new(SettingsSource::default_path())
//!     .with_env_prefix("SYNCGW")   // SYNCGW_IMAP_HOST overrides "imap.host"
//!     .load(&SettingSchema::gateway())?;
//!
//! let mut registry = ProviderRegistry::with_builtins();
//! let config = ConfigResolver::new().resolve(&mut registry, &raw)?;
//! # let _ = config;
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Providers
//!
//! Hosts may register additional providers before resolution begins; the
//! resolver seals the registry as its first act.
//!
//! ```rust
//! use syncgw_config::{IpcChannel, IpcParams, ProviderRegistry};
//!
//! struct RedisChannel;
//! impl IpcChannel for RedisChannel {
//!     fn provider(&self) -> &str { "redis" }
//! }
//!
//! let mut registry = ProviderRegistry::with_builtins();
//! registry
//!     .register_ipc("redis", |_params: &IpcParams| {
//!         Box::new(RedisChannel) as Box<dyn IpcChannel>
//!     })
//!     .unwrap();
//! ```

mod error;
pub mod ipc;
pub mod mail;
pub mod providers;
pub mod resolver;
pub mod schema;
pub mod source;

pub use error::{
    ConfigError, ConnectionError, ProviderError, ResolveCause, Result, SchemaError, SourceError,
    Stage,
};
pub use ipc::{CacheServer, DEFAULT_CACHE_PORT, IpcParams};
pub use mail::{
    CredentialSource, FolderMap, FolderRole, Folders, MailConnectionParams, MailSendParams,
    SecurityMode, SendMethod,
};
pub use providers::{
    BackendDescriptor, BackendFactory, IpcChannel, IpcDescriptor, IpcFactory, MailBackend,
    ProviderKind, ProviderRegistry,
};
pub use resolver::{AutodiscoverLoginType, ConfigResolver, LoginIdentityMode, ResolvedConfig};
pub use schema::{
    RawSettings, SettingSchema, SettingSpec, SettingType, Settings, keys,
};
pub use source::{EnvSource, SettingsSource, SystemEnv};
