//! Config resolver: drives raw input through schema validation, provider
//! lookup, and parameter assembly into one immutable [`ResolvedConfig`]
//!
//! Resolution runs its stages strictly in order; the first failure aborts
//! with the stage recorded in the error, and no partially built
//! configuration is ever exposed. A resolver is consumed by [`resolve`]
//! whether it succeeds or fails, so there is no retry-in-place.
//!
//! [`resolve`]: ConfigResolver::resolve

use log::{LevelFilter, debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Stage};
use crate::ipc::IpcParams;
use crate::mail::{MailConnectionParams, MailSendParams};
use crate::providers::{BackendDescriptor, IpcChannel, IpcDescriptor, MailBackend, ProviderRegistry};
use crate::schema::{RawSettings, SettingSchema, Settings, keys};

// =============================================================================
// Identity Modes
// =============================================================================

/// How devices identify themselves when logging in to the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoginIdentityMode {
    /// The full email address is the login name
    FullEmail,
    /// Only the local part is the login name
    UsernameOnly,
}

/// Which identity the autodiscover endpoint hands out to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutodiscoverLoginType {
    Email,
    Username,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// The terminal, immutable configuration aggregate
///
/// Constructed exactly once per process by [`ConfigResolver::resolve`] and
/// shared read-only by every downstream collaborator. `Send + Sync`, so no
/// locking is needed to share it across request-handling threads.
///
/// Equality is structural; provider selections compare by name, since
/// factories have no identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    timezone: String,
    login_identity: LoginIdentityMode,
    autodiscover_login: AutodiscoverLoginType,
    backend: BackendDescriptor,
    backend_params: MailConnectionParams,
    mail_send: MailSendParams,
    ipc: IpcDescriptor,
    ipc_params: IpcParams,
    log_level: LevelFilter,
    log_auth_failures: bool,
    retry_after_secs: u32,
}

impl ResolvedConfig {
    /// IANA timezone identifier the gateway operates in
    #[must_use]
    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    #[must_use]
    pub fn login_identity_mode(&self) -> LoginIdentityMode {
        self.login_identity
    }

    #[must_use]
    pub fn autodiscover_login_type(&self) -> AutodiscoverLoginType {
        self.autodiscover_login
    }

    /// Selected backend provider name and its connection parameters
    #[must_use]
    pub fn backend_provider(&self) -> (&str, &MailConnectionParams) {
        (self.backend.name(), &self.backend_params)
    }

    /// Instantiate the mail backend through the selected provider factory
    #[must_use]
    pub fn create_backend(&self) -> Box<dyn MailBackend> {
        self.backend.create(&self.backend_params)
    }

    /// Outbound mail parameters
    #[must_use]
    pub fn mail_send(&self) -> &MailSendParams {
        &self.mail_send
    }

    /// Selected IPC provider name and its provider-specific parameters
    #[must_use]
    pub fn ipc_provider(&self) -> (&str, &IpcParams) {
        (self.ipc.name(), &self.ipc_params)
    }

    /// Instantiate the IPC channel through the selected provider factory
    #[must_use]
    pub fn create_ipc_channel(&self) -> Box<dyn IpcChannel> {
        self.ipc.create(&self.ipc_params)
    }

    /// Log verbosity for the host's logger installation
    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    /// Whether failed authentication attempts are logged
    #[must_use]
    pub fn log_auth_failures(&self) -> bool {
        self.log_auth_failures
    }

    /// Server-advised wait communicated to clients that must back off
    #[must_use]
    pub fn retry_after_secs(&self) -> u32 {
        self.retry_after_secs
    }
}

// =============================================================================
// Config Resolver
// =============================================================================

/// One-shot resolver turning raw settings into a [`ResolvedConfig`]
///
/// # Example
///
/// ```
/// use syncgw_config::{ConfigResolver, ProviderRegistry};
///
/// let mut registry = ProviderRegistry::with_builtins();
/// let raw = serde_json::json!({
///     "backend.provider": "imap",
///     "imap.host": "mail.example.com",
///     "imap.port": 993,
/// });
///
/// let config = ConfigResolver::new()
///     .resolve(&mut registry, raw.as_object().unwrap())
///     .unwrap();
/// assert_eq!(config.backend_provider().0, "imap");
/// assert_eq!(config.retry_after_secs(), 300);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    schema: SettingSchema,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigResolver {
    /// Resolver using the gateway schema
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: SettingSchema::gateway(),
        }
    }

    /// Resolver using a caller-supplied schema
    #[must_use]
    pub fn with_schema(schema: SettingSchema) -> Self {
        Self { schema }
    }

    /// Resolve raw settings into an immutable configuration
    ///
    /// Seals the registry first, so provider registration races with
    /// resolution are impossible. Stages run in order: schema validation,
    /// provider resolution, parameter assembly. The returned error names the
    /// stage and the offending key or provider.
    ///
    /// Resolution is a pure function of the registry contents and the raw
    /// input; resolving identical input twice yields structurally equal
    /// configurations.
    pub fn resolve(
        self,
        registry: &mut ProviderRegistry,
        raw: &RawSettings,
    ) -> Result<ResolvedConfig, ConfigError> {
        registry.seal();

        let settings = self
            .schema
            .validate(raw)
            .map_err(|e| ConfigError::at(Stage::SchemaValidation, e))?;
        debug!("Raw settings validated against the gateway schema");

        let backend_name = settings.get_str(keys::BACKEND_PROVIDER).unwrap_or_default();
        let backend = registry
            .resolve_backend(backend_name)
            .map_err(|e| ConfigError::at(Stage::ProviderResolution, e))?;
        let ipc_name = settings.get_str(keys::IPC_PROVIDER).unwrap_or_default();
        let ipc = registry
            .resolve_ipc(ipc_name)
            .map_err(|e| ConfigError::at(Stage::ProviderResolution, e))?;
        debug!("Selected backend provider '{backend_name}', IPC provider '{ipc_name}'");

        let backend_params = MailConnectionParams::from_settings(&settings)
            .map_err(|e| ConfigError::at(Stage::Assembly, e))?;
        let mail_send = MailSendParams::from_settings(&settings)
            .map_err(|e| ConfigError::at(Stage::Assembly, e))?;
        let ipc_params = IpcParams::from_settings(&settings)
            .map_err(|e| ConfigError::at(Stage::Assembly, e))?;

        let config = ResolvedConfig {
            timezone: settings.get_str(keys::TIMEZONE).unwrap_or_default().to_string(),
            login_identity: login_identity(&settings),
            autodiscover_login: autodiscover_login(&settings),
            backend,
            backend_params,
            mail_send,
            ipc,
            ipc_params,
            log_level: log_level(&settings),
            log_auth_failures: settings.get_bool(keys::LOG_AUTH_FAILURES).unwrap_or_default(),
            retry_after_secs: retry_after(&settings),
        };

        info!(
            "Configuration ready: backend '{}' at {}:{} ({}), IPC '{}', retry-after {}s",
            config.backend.name(),
            config.backend_params.host(),
            config.backend_params.port(),
            config.backend_params.security(),
            config.ipc.name(),
            config.retry_after_secs,
        );
        Ok(config)
    }
}

fn login_identity(settings: &Settings) -> LoginIdentityMode {
    if settings.get_bool(keys::LOGIN_FULL_EMAIL).unwrap_or_default() {
        LoginIdentityMode::FullEmail
    } else {
        LoginIdentityMode::UsernameOnly
    }
}

fn autodiscover_login(settings: &Settings) -> AutodiscoverLoginType {
    match settings.get_str(keys::AUTODISCOVER_LOGIN_TYPE) {
        Some("username") => AutodiscoverLoginType::Username,
        _ => AutodiscoverLoginType::Email,
    }
}

fn log_level(settings: &Settings) -> LevelFilter {
    settings
        .get_str(keys::LOG_LEVEL)
        .unwrap_or_default()
        .parse()
        .unwrap_or(LevelFilter::Info)
}

fn retry_after(settings: &Settings) -> u32 {
    let secs = settings.get_i64(keys::RETRY_AFTER_SECS).unwrap_or_default();
    u32::try_from(secs).unwrap_or_default()
}

// =============================================================================
// Tests
// =============================================================================
