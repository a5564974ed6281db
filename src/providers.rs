//! Provider registry: named factories for the mail backend and the
//! inter-process cache, with an Open → Sealed lifecycle
//!
//! Registration happens single-threaded during startup; the resolver seals
//! the registry before looking anything up, so an invalid provider name
//! fails resolution instead of surfacing mid-session.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::error::ProviderError;
use crate::ipc::IpcParams;
use crate::mail::MailConnectionParams;

// =============================================================================
// Provider Kinds and Seam Traits
// =============================================================================

/// Which registry a provider name is resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Mailbox access (e.g., an IMAP client)
    Backend,
    /// Cross-process shared state (e.g., shared memory, a distributed cache)
    Ipc,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Backend => write!(f, "backend"),
            ProviderKind::Ipc => write!(f, "IPC"),
        }
    }
}

/// Mailbox access seam implemented by backend providers
///
/// The actual protocol client lives outside this crate; a provider factory
/// only has to hand back something connectable.
pub trait MailBackend: Send + Sync {
    /// Name of the provider that produced this backend
    fn provider(&self) -> &str;

    /// Human-readable connection summary for startup diagnostics
    fn describe(&self) -> String {
        self.provider().to_string()
    }
}

/// Cross-process coordination seam implemented by IPC providers
pub trait IpcChannel: Send + Sync {
    /// Name of the provider that produced this channel
    fn provider(&self) -> &str;

    /// Human-readable connection summary for startup diagnostics
    fn describe(&self) -> String {
        self.provider().to_string()
    }
}

/// Factory producing a mail backend from assembled connection parameters
pub type BackendFactory = Arc<dyn Fn(&MailConnectionParams) -> Box<dyn MailBackend> + Send + Sync>;

/// Factory producing an IPC channel from its provider-specific parameters
pub type IpcFactory = Arc<dyn Fn(&IpcParams) -> Box<dyn IpcChannel> + Send + Sync>;

// =============================================================================
// Provider Descriptors
// =============================================================================

/// A resolved backend provider: its registered name plus factory
#[derive(Clone)]
pub struct BackendDescriptor {
    name: String,
    factory: BackendFactory,
}

impl BackendDescriptor {
    /// Registered provider name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instantiate the backend for the given connection parameters
    #[must_use]
    pub fn create(&self, params: &MailConnectionParams) -> Box<dyn MailBackend> {
        (self.factory)(params)
    }
}

impl fmt::Debug for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// Factories have no identity; descriptors compare by name.
impl PartialEq for BackendDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// A resolved IPC provider: its registered name plus factory
#[derive(Clone)]
pub struct IpcDescriptor {
    name: String,
    factory: IpcFactory,
}

impl IpcDescriptor {
    /// Registered provider name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instantiate the channel for the given IPC parameters
    #[must_use]
    pub fn create(&self, params: &IpcParams) -> Box<dyn IpcChannel> {
        (self.factory)(params)
    }
}

impl fmt::Debug for IpcDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IpcDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for IpcDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

// =============================================================================
// Provider Registry
// =============================================================================

/// Registry mapping provider names to factories
///
/// Starts Open; [`seal`](Self::seal) transitions it to Sealed, after which
/// registration fails with [`ProviderError::RegistryClosed`]. Lookups on a
/// sealed registry never observe writes and need no synchronization.
///
/// # Example
///
/// ```
/// use syncgw_config::ProviderRegistry;
///
/// let mut registry = ProviderRegistry::with_builtins();
/// assert!(registry.resolve_backend("imap").is_ok());
/// assert!(registry.resolve_ipc("memcached").is_ok());
/// ```
#[derive(Default)]
pub struct ProviderRegistry {
    backends: BTreeMap<String, BackendFactory>,
    ipc: BTreeMap<String, IpcFactory>,
    sealed: bool,
}

impl ProviderRegistry {
    /// Create an empty, open registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the providers the gateway ships:
    /// backend `imap`, IPC `shared-memory` and `memcached`
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        // A fresh open registry with distinct names cannot refuse these.
        let _ = registry.register_backend("imap", |params: &MailConnectionParams| {
            Box::new(builtin::ImapBackend::new(params)) as Box<dyn MailBackend>
        });
        let _ = registry.register_ipc("shared-memory", |_: &IpcParams| {
            Box::new(builtin::SharedMemoryChannel) as Box<dyn IpcChannel>
        });
        let _ = registry.register_ipc("memcached", |params: &IpcParams| {
            Box::new(builtin::MemcachedChannel::new(params)) as Box<dyn IpcChannel>
        });

        registry
    }

    /// Register a backend provider under a case-sensitive name
    ///
    /// Fails once the registry is sealed or when the name is taken.
    pub fn register_backend<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), ProviderError>
    where
        F: Fn(&MailConnectionParams) -> Box<dyn MailBackend> + Send + Sync + 'static,
    {
        let name = name.into();
        self.check_open(ProviderKind::Backend, &name)?;
        if self.backends.contains_key(&name) {
            return Err(ProviderError::AlreadyRegistered {
                kind: ProviderKind::Backend,
                name,
            });
        }
        debug!("Registered backend provider '{name}'");
        self.backends.insert(name, Arc::new(factory));
        Ok(())
    }

    /// Register an IPC provider under a case-sensitive name
    ///
    /// Fails once the registry is sealed or when the name is taken.
    pub fn register_ipc<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), ProviderError>
    where
        F: Fn(&IpcParams) -> Box<dyn IpcChannel> + Send + Sync + 'static,
    {
        let name = name.into();
        self.check_open(ProviderKind::Ipc, &name)?;
        if self.ipc.contains_key(&name) {
            return Err(ProviderError::AlreadyRegistered {
                kind: ProviderKind::Ipc,
                name,
            });
        }
        debug!("Registered IPC provider '{name}'");
        self.ipc.insert(name, Arc::new(factory));
        Ok(())
    }

    /// Transition the registry from Open to Sealed
    ///
    /// Idempotent; sealing an already sealed registry has no effect.
    pub fn seal(&mut self) {
        if !self.sealed {
            debug!(
                "Provider registry sealed with {} backend and {} IPC providers",
                self.backends.len(),
                self.ipc.len()
            );
            self.sealed = true;
        }
    }

    /// Whether the registry has been sealed
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Look up a backend provider by name
    pub fn resolve_backend(&self, name: &str) -> Result<BackendDescriptor, ProviderError> {
        self.backends
            .get(name)
            .map(|factory| BackendDescriptor {
                name: name.to_string(),
                factory: Arc::clone(factory),
            })
            .ok_or_else(|| ProviderError::NotFound {
                kind: ProviderKind::Backend,
                name: name.to_string(),
            })
    }

    /// Look up an IPC provider by name
    pub fn resolve_ipc(&self, name: &str) -> Result<IpcDescriptor, ProviderError> {
        self.ipc
            .get(name)
            .map(|factory| IpcDescriptor {
                name: name.to_string(),
                factory: Arc::clone(factory),
            })
            .ok_or_else(|| ProviderError::NotFound {
                kind: ProviderKind::Ipc,
                name: name.to_string(),
            })
    }

    fn check_open(&self, kind: ProviderKind, name: &str) -> Result<(), ProviderError> {
        if self.sealed {
            return Err(ProviderError::RegistryClosed {
                kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("backends", &self.backends.keys().collect::<Vec<_>>())
            .field("ipc", &self.ipc.keys().collect::<Vec<_>>())
            .field("sealed", &self.sealed)
            .finish()
    }
}

// =============================================================================
// Built-in Providers
// =============================================================================

mod builtin {
    use super::{IpcChannel, MailBackend};
    use crate::ipc::{CacheServer, IpcParams};
    use crate::mail::MailConnectionParams;

    /// Connection handle for the shipped IMAP backend
    pub(super) struct ImapBackend {
        endpoint: String,
    }

    impl ImapBackend {
        pub(super) fn new(params: &MailConnectionParams) -> Self {
            Self {
                endpoint: format!("{}:{}", params.host(), params.port()),
            }
        }
    }

    impl MailBackend for ImapBackend {
        fn provider(&self) -> &str {
            "imap"
        }

        fn describe(&self) -> String {
            format!("IMAP at {}", self.endpoint)
        }
    }

    /// Single-host shared memory channel; needs no parameters
    pub(super) struct SharedMemoryChannel;

    impl IpcChannel for SharedMemoryChannel {
        fn provider(&self) -> &str {
            "shared-memory"
        }

        fn describe(&self) -> String {
            "shared memory".to_string()
        }
    }

    /// Distributed cache channel talking to a memcached server list
    pub(super) struct MemcachedChannel {
        servers: Vec<CacheServer>,
    }

    impl MemcachedChannel {
        pub(super) fn new(params: &IpcParams) -> Self {
            Self {
                servers: params.servers().to_vec(),
            }
        }
    }

    impl IpcChannel for MemcachedChannel {
        fn provider(&self) -> &str {
            "memcached"
        }

        fn describe(&self) -> String {
            let servers: Vec<String> = self.servers.iter().map(ToString::to_string).collect();
            format!("memcached at {}", servers.join(", "))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_unknown_name() {
        let registry = ProviderRegistry::with_builtins();

        let err = registry.resolve_backend("exchange").unwrap_err();
        assert!(matches!(
            err,
            ProviderError::NotFound { kind: ProviderKind::Backend, ref name } if name == "exchange"
        ));

        let err = registry.resolve_ipc("redis").unwrap_err();
        assert!(matches!(
            err,
            ProviderError::NotFound { kind: ProviderKind::Ipc, ref name } if name == "redis"
        ));
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let registry = ProviderRegistry::with_builtins();
        assert!(registry.resolve_backend("IMAP").is_err());
        assert!(registry.resolve_backend("imap").is_ok());
    }

    #[test]
    fn test_register_after_seal_fails() {
        let mut registry = ProviderRegistry::with_builtins();
        registry.seal();

        let err = registry
            .register_ipc("redis", |_| Box::new(NullChannel) as Box<dyn IpcChannel>)
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::RegistryClosed { kind: ProviderKind::Ipc, ref name } if name == "redis"
        ));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ProviderRegistry::with_builtins();
        let err = registry
            .register_ipc("memcached", |_| Box::new(NullChannel) as Box<dyn IpcChannel>)
            .unwrap_err();
        assert!(matches!(err, ProviderError::AlreadyRegistered { .. }));
    }

    #[test]
    fn test_seal_is_idempotent() {
        let mut registry = ProviderRegistry::new();
        registry.seal();
        registry.seal();
        assert!(registry.is_sealed());
    }

    #[test]
    fn test_lookup_survives_sealing() {
        let mut registry = ProviderRegistry::with_builtins();
        registry.seal();
        let descriptor = registry.resolve_backend("imap").unwrap();
        assert_eq!(descriptor.name(), "imap");
    }

    struct NullChannel;

    impl IpcChannel for NullChannel {
        fn provider(&self) -> &str {
            "null"
        }
    }
}
