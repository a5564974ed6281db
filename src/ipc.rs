//! IPC provider parameters: the cache server list handed to distributed
//! cache providers

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConnectionError;
use crate::schema::{Settings, keys};

/// Port a cache server listens on when the entry names none
pub const DEFAULT_CACHE_PORT: u16 = 11211;

/// A single cache server endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheServer {
    host: String,
    port: u16,
}

impl CacheServer {
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Parse a `host[:port]` entry
    fn parse(entry: &str) -> Result<Self, ConnectionError> {
        let malformed = || ConnectionError::InvalidCacheServer {
            entry: entry.to_string(),
        };

        let (host, port) = match entry.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().ok().filter(|p| *p > 0).ok_or_else(malformed)?;
                (host, port)
            }
            None => (entry, DEFAULT_CACHE_PORT),
        };

        if host.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for CacheServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Provider-specific parameters for the selected IPC provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcParams {
    servers: Vec<CacheServer>,
}

impl IpcParams {
    /// Parse the comma-separated `ipc.cache-servers` list from validated
    /// settings
    pub fn from_settings(settings: &Settings) -> Result<Self, ConnectionError> {
        let list = settings.get_str(keys::IPC_CACHE_SERVERS).unwrap_or_default();
        let servers = list
            .split(',')
            .map(str::trim)
            .map(CacheServer::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { servers })
    }

    /// Configured cache servers, in declaration order
    #[must_use]
    pub fn servers(&self) -> &[CacheServer] {
        &self.servers
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_server_with_port() {
        let server = CacheServer::parse("localhost:11211").unwrap();
        assert_eq!(server.host(), "localhost");
        assert_eq!(server.port(), 11211);
    }

    #[test]
    fn test_default_port_applied() {
        let server = CacheServer::parse("cache-1.internal").unwrap();
        assert_eq!(server.port(), DEFAULT_CACHE_PORT);
    }

    #[test]
    fn test_malformed_entries() {
        for entry in [":11211", "cache-1:", "cache-1:0", "cache-1:http", ""] {
            let err = CacheServer::parse(entry).unwrap_err();
            assert!(
                matches!(err, ConnectionError::InvalidCacheServer { entry: ref e } if e == entry),
                "entry {entry:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_server_list_order_preserved() {
        let schema = crate::schema::SettingSchema::gateway();
        let raw = serde_json::json!({
            "backend.provider": "imap",
            "imap.host": "mail.example.com",
            "imap.port": 993,
            "ipc.cache-servers": "cache-1:11211, cache-2 ,cache-3:11311",
        });
        let settings = schema.validate(raw.as_object().unwrap()).unwrap();

        let params = IpcParams::from_settings(&settings).unwrap();
        let rendered: Vec<String> = params.servers().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["cache-1:11211", "cache-2:11211", "cache-3:11311"]);
    }
}
