//! Common test utilities for syncgw-config integration tests
//!
//! Provides the deployment fixture raw settings and registry helpers.

#![allow(dead_code)]

use serde_json::json;
use syncgw_config::{ProviderRegistry, RawSettings};

/// Raw settings of the São Paulo deployment: SSL IMAP on port 993,
/// Portuguese folder names, shared-memory IPC, 30s retry-after.
pub fn deployment_raw() -> RawSettings {
    json!({
        "general.timezone": "America/Sao_Paulo",
        "login.full-email": true,
        "log.level": "debug",
        "log.auth-failures": true,
        "sync.retry-after-secs": 30,
        "backend.provider": "imap",
        "ipc.provider": "shared-memory",
        "imap.host": "imap-ha.skymail.net.br",
        "imap.port": 993,
        "imap.security": "ssl",
        "imap.folders-configured": true,
        "imap.folder.inbox": "INBOX",
        "imap.folder.sent": "Itens Enviados",
        "imap.folder.draft": "Rascunhos",
        "imap.folder.trash": "Itens Excluídos",
        "imap.folder.spam": "Spam",
        "imap.folder.archive": "Archive",
        "smtp.method": "smtp",
        "smtp.params": {
            "host": "ssl://smtp-ha.skymail.net.br",
            "port": 993,
            "auth": true,
            "username": "imap_username",
            "password": "imap_password",
        },
    })
    .as_object()
    .expect("fixture must be an object")
    .clone()
}

/// Minimal valid raw settings: required keys only, defaults everywhere else
pub fn minimal_raw() -> RawSettings {
    json!({
        "backend.provider": "imap",
        "imap.host": "mail.example.com",
        "imap.port": 143,
    })
    .as_object()
    .expect("fixture must be an object")
    .clone()
}

/// Registry with the shipped providers
pub fn registry() -> ProviderRegistry {
    ProviderRegistry::with_builtins()
}
