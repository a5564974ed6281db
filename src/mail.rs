//! Mail connection parameters: transport security, folder-role mapping,
//! credentials, and the inbound/outbound parameter assemblers

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConnectionError;
use crate::schema::{Settings, keys};

// =============================================================================
// Transport Security
// =============================================================================

/// Transport security mode of a mail connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityMode {
    /// Plaintext connection
    None,
    /// Implicit TLS from the first byte
    Ssl,
    /// Plaintext upgraded via STARTTLS
    StartTls,
}

impl SecurityMode {
    /// Parse a security token into mode plus certificate-validation flag
    ///
    /// Accepts the plain tokens `none`, `ssl`, `starttls`, and legacy
    /// slash-delimited option strings (`"/ssl/novalidate-cert"`). Recognized
    /// option flags: `ssl`, `tls`, `starttls`, `notls`, `norsh`,
    /// `validate-cert`, `novalidate-cert`. Certificate validation defaults
    /// to on.
    pub fn parse(input: &str) -> Result<(Self, bool), ConnectionError> {
        if let Some(options) = input.strip_prefix('/') {
            return Self::parse_options(input, options);
        }

        let mode = match input.to_ascii_lowercase().as_str() {
            "none" => SecurityMode::None,
            "ssl" => SecurityMode::Ssl,
            "starttls" => SecurityMode::StartTls,
            _ => return Err(ConnectionError::UnknownSecurityMode(input.to_string())),
        };
        Ok((mode, true))
    }

    fn parse_options(input: &str, options: &str) -> Result<(Self, bool), ConnectionError> {
        let mut mode = SecurityMode::None;
        let mut validate_cert = true;

        for flag in options.split('/').filter(|flag| !flag.is_empty()) {
            match flag.to_ascii_lowercase().as_str() {
                "ssl" => mode = SecurityMode::Ssl,
                "tls" | "starttls" => mode = SecurityMode::StartTls,
                "notls" => mode = SecurityMode::None,
                "validate-cert" => validate_cert = true,
                "novalidate-cert" => validate_cert = false,
                // Connection flag without a security meaning
                "norsh" => {}
                _ => return Err(ConnectionError::UnknownSecurityMode(input.to_string())),
            }
        }

        Ok((mode, validate_cert))
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SecurityMode::None => "none",
            SecurityMode::Ssl => "ssl",
            SecurityMode::StartTls => "starttls",
        }
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Folder Roles
// =============================================================================

/// Logical mailbox category mapped to a server-side folder name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderRole {
    Inbox,
    Sent,
    Draft,
    Trash,
    Spam,
    Archive,
}

impl FolderRole {
    /// Every role, in declaration order
    pub const ALL: [FolderRole; 6] = [
        FolderRole::Inbox,
        FolderRole::Sent,
        FolderRole::Draft,
        FolderRole::Trash,
        FolderRole::Spam,
        FolderRole::Archive,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FolderRole::Inbox => "inbox",
            FolderRole::Sent => "sent",
            FolderRole::Draft => "draft",
            FolderRole::Trash => "trash",
            FolderRole::Spam => "spam",
            FolderRole::Archive => "archive",
        }
    }

    /// Schema key carrying this role's folder name
    #[must_use]
    pub fn setting_key(self) -> &'static str {
        match self {
            FolderRole::Inbox => "imap.folder.inbox",
            FolderRole::Sent => "imap.folder.sent",
            FolderRole::Draft => "imap.folder.draft",
            FolderRole::Trash => "imap.folder.trash",
            FolderRole::Spam => "imap.folder.spam",
            FolderRole::Archive => "imap.folder.archive",
        }
    }
}

impl fmt::Display for FolderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete mapping from folder role to server-side folder name
///
/// Every name is non-empty; an incomplete mapping never leaves the assembler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderMap {
    inbox: String,
    sent: String,
    draft: String,
    trash: String,
    spam: String,
    archive: String,
}

impl FolderMap {
    /// Server-side folder name for a role
    #[must_use]
    pub fn get(&self, role: FolderRole) -> &str {
        match role {
            FolderRole::Inbox => &self.inbox,
            FolderRole::Sent => &self.sent,
            FolderRole::Draft => &self.draft,
            FolderRole::Trash => &self.trash,
            FolderRole::Spam => &self.spam,
            FolderRole::Archive => &self.archive,
        }
    }
}

/// Folder configuration of a mail connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Folders {
    /// All six roles explicitly mapped to server-side names
    Configured(FolderMap),
    /// No mapping declared; the backend client discovers folders itself
    AutoDiscover,
}

// =============================================================================
// Credentials
// =============================================================================

/// Where a mail connection's credentials come from
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialSource {
    /// Reuse the login the device presented to the gateway
    Forwarded,
    /// Fixed credential pair from the configuration
    Literal { username: String, password: String },
}

// Manual Debug keeps the password out of logs and panic messages.
impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Forwarded => write!(f, "Forwarded"),
            CredentialSource::Literal { username, .. } => f
                .debug_struct("Literal")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

// =============================================================================
// Inbound Connection Parameters
// =============================================================================

/// Immutable connection descriptor for the mail backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailConnectionParams {
    host: String,
    port: u16,
    security: SecurityMode,
    validate_cert: bool,
    folders: Folders,
    credentials: CredentialSource,
}

impl MailConnectionParams {
    /// Assemble inbound connection parameters from validated settings
    ///
    /// When `imap.folders-configured` is true, all six folder roles must be
    /// present and non-empty; otherwise folder keys are ignored and the
    /// result is marked for auto-discovery.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConnectionError> {
        let host = settings.get_str(keys::IMAP_HOST).unwrap_or_default().to_string();
        let port = settings.get_i64(keys::IMAP_PORT).unwrap_or_default();
        let port = u16::try_from(port).unwrap_or_default();

        let security_token = settings.get_str(keys::IMAP_SECURITY).unwrap_or_default();
        let (security, validate_cert) = SecurityMode::parse(security_token)?;

        let folders = if settings.get_bool(keys::IMAP_FOLDERS_CONFIGURED).unwrap_or_default() {
            Folders::Configured(read_folder_map(settings)?)
        } else {
            Folders::AutoDiscover
        };

        let credentials = read_credentials(
            settings.get_str(keys::IMAP_USERNAME),
            settings.get_str(keys::IMAP_PASSWORD),
        )?;

        Ok(Self {
            host,
            port,
            security,
            validate_cert,
            folders,
            credentials,
        })
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn security(&self) -> SecurityMode {
        self.security
    }

    /// Whether the server certificate is verified on TLS connections
    #[must_use]
    pub fn validate_cert(&self) -> bool {
        self.validate_cert
    }

    #[must_use]
    pub fn folders(&self) -> &Folders {
        &self.folders
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialSource {
        &self.credentials
    }
}

fn read_folder_map(settings: &Settings) -> Result<FolderMap, ConnectionError> {
    let mut missing = Vec::new();
    let mut name = |role: FolderRole| {
        let value = settings
            .get_str(role.setting_key())
            .unwrap_or_default()
            .to_string();
        if value.is_empty() {
            missing.push(role);
        }
        value
    };

    let map = FolderMap {
        inbox: name(FolderRole::Inbox),
        sent: name(FolderRole::Sent),
        draft: name(FolderRole::Draft),
        trash: name(FolderRole::Trash),
        spam: name(FolderRole::Spam),
        archive: name(FolderRole::Archive),
    };

    if missing.is_empty() {
        Ok(map)
    } else {
        Err(ConnectionError::IncompleteFolderMap { missing })
    }
}

/// Both halves of a literal pair make a literal source, neither makes a
/// forwarded one; a half-specified pair is a configuration mistake.
fn read_credentials(
    username: Option<&str>,
    password: Option<&str>,
) -> Result<CredentialSource, ConnectionError> {
    match (username, password) {
        (Some(username), Some(password)) => Ok(CredentialSource::Literal {
            username: username.to_string(),
            password: password.to_string(),
        }),
        (None, None) => Ok(CredentialSource::Forwarded),
        _ => Err(ConnectionError::MissingCredentialSource),
    }
}

// =============================================================================
// Outbound Mail Parameters
// =============================================================================

/// How outbound mail leaves the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendMethod {
    /// Direct SMTP connection
    Smtp,
    /// Reuse the mail-backend connection
    Backend,
}

/// Immutable descriptor for outbound mail
///
/// Host, port, and credentials are only populated for [`SendMethod::Smtp`];
/// the backend method needs nothing beyond the inbound connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailSendParams {
    method: SendMethod,
    host: Option<String>,
    port: Option<u16>,
    auth_required: bool,
    credentials: Option<CredentialSource>,
}

impl MailSendParams {
    /// Assemble outbound mail parameters from validated settings
    ///
    /// `smtp.method = "backend"` needs no nested map. `"smtp"` requires
    /// `smtp.params` with a non-empty `host` and a port in 1..=65535; when
    /// `auth` is true the map must also carry a credential source, either a
    /// literal `username`/`password` pair or `forward-login: true`.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConnectionError> {
        match settings.get_str(keys::SMTP_METHOD) {
            Some("smtp") => Self::from_params(settings.get_map(keys::SMTP_PARAMS)),
            _ => Ok(Self {
                method: SendMethod::Backend,
                host: None,
                port: None,
                auth_required: false,
                credentials: None,
            }),
        }
    }

    fn from_params(params: Option<&Map<String, Value>>) -> Result<Self, ConnectionError> {
        let Some(params) = params else {
            return Err(ConnectionError::IncompleteSendParams {
                missing: vec!["host", "port"],
            });
        };

        let host = params
            .get("host")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let port = params.get("port").and_then(Value::as_i64);

        let mut missing = Vec::new();
        if host.is_empty() {
            missing.push("host");
        }
        if port.is_none() {
            missing.push("port");
        }
        if !missing.is_empty() {
            return Err(ConnectionError::IncompleteSendParams { missing });
        }

        let port = port.unwrap_or_default();
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p > 0)
            .ok_or(ConnectionError::InvalidSendPort { value: port })?;

        let auth_required = params
            .get("auth")
            .and_then(Value::as_bool)
            .unwrap_or_default();
        let credentials = if auth_required {
            Some(read_send_credentials(params)?)
        } else {
            None
        };

        Ok(Self {
            method: SendMethod::Smtp,
            host: Some(host.to_string()),
            port: Some(port),
            auth_required,
            credentials,
        })
    }

    #[must_use]
    pub fn method(&self) -> SendMethod {
        self.method
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    #[must_use]
    pub fn auth_required(&self) -> bool {
        self.auth_required
    }

    #[must_use]
    pub fn credentials(&self) -> Option<&CredentialSource> {
        self.credentials.as_ref()
    }
}

fn read_send_credentials(params: &Map<String, Value>) -> Result<CredentialSource, ConnectionError> {
    if params
        .get("forward-login")
        .and_then(Value::as_bool)
        .unwrap_or_default()
    {
        return Ok(CredentialSource::Forwarded);
    }

    let username = params.get("username").and_then(Value::as_str);
    let password = params.get("password").and_then(Value::as_str);
    match (username, password) {
        (Some(username), Some(password)) if !username.is_empty() => {
            Ok(CredentialSource::Literal {
                username: username.to_string(),
                password: password.to_string(),
            })
        }
        _ => Err(ConnectionError::MissingCredentialSource),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::schema::SettingSchema;
    use serde_json::json;

    fn validated(mut extra: serde_json::Value) -> Result<Settings, SchemaError> {
        let mut raw = json!({
            "backend.provider": "imap",
            "imap.host": "mail.example.com",
            "imap.port": 993,
        });
        raw.as_object_mut()
            .unwrap()
            .append(extra.as_object_mut().unwrap());
        SettingSchema::gateway().validate(raw.as_object().unwrap())
    }

    #[test]
    fn test_security_plain_tokens() {
        assert_eq!(SecurityMode::parse("none").unwrap(), (SecurityMode::None, true));
        assert_eq!(SecurityMode::parse("ssl").unwrap(), (SecurityMode::Ssl, true));
        assert_eq!(
            SecurityMode::parse("STARTTLS").unwrap(),
            (SecurityMode::StartTls, true)
        );

        let err = SecurityMode::parse("tlsv3").unwrap_err();
        assert!(matches!(err, ConnectionError::UnknownSecurityMode(ref t) if t == "tlsv3"));
    }

    #[test]
    fn test_security_option_strings() {
        assert_eq!(
            SecurityMode::parse("/ssl/norsh").unwrap(),
            (SecurityMode::Ssl, true)
        );
        assert_eq!(
            SecurityMode::parse("/ssl/novalidate-cert").unwrap(),
            (SecurityMode::Ssl, false)
        );
        assert_eq!(
            SecurityMode::parse("/tls/validate-cert").unwrap(),
            (SecurityMode::StartTls, true)
        );
        assert_eq!(
            SecurityMode::parse("/notls").unwrap(),
            (SecurityMode::None, true)
        );

        let err = SecurityMode::parse("/ssl/readonly").unwrap_err();
        assert!(matches!(err, ConnectionError::UnknownSecurityMode(ref t) if t == "/ssl/readonly"));
    }

    #[test]
    fn test_auto_discover_ignores_folder_keys() {
        let settings = validated(json!({
            "imap.folders-configured": false,
            "imap.folder.inbox": "INBOX",
        }))
        .unwrap();

        let params = MailConnectionParams::from_settings(&settings).unwrap();
        assert_eq!(params.folders(), &Folders::AutoDiscover);
    }

    #[test]
    fn test_incomplete_folder_map_lists_missing_roles() {
        let settings = validated(json!({
            "imap.folders-configured": true,
            "imap.folder.inbox": "INBOX",
            "imap.folder.sent": "Sent",
            "imap.folder.draft": "Drafts",
            "imap.folder.spam": "",
        }))
        .unwrap();

        let err = MailConnectionParams::from_settings(&settings).unwrap_err();
        match err {
            ConnectionError::IncompleteFolderMap { missing } => {
                assert_eq!(
                    missing,
                    vec![FolderRole::Trash, FolderRole::Spam, FolderRole::Archive]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_complete_folder_map() {
        let settings = validated(json!({
            "imap.folders-configured": true,
            "imap.folder.inbox": "INBOX",
            "imap.folder.sent": "Itens Enviados",
            "imap.folder.draft": "Rascunhos",
            "imap.folder.trash": "Itens Excluídos",
            "imap.folder.spam": "Spam",
            "imap.folder.archive": "Archive",
        }))
        .unwrap();

        let params = MailConnectionParams::from_settings(&settings).unwrap();
        let Folders::Configured(map) = params.folders() else {
            panic!("expected a configured folder map");
        };
        assert_eq!(map.get(FolderRole::Sent), "Itens Enviados");
        assert_eq!(map.get(FolderRole::Trash), "Itens Excluídos");
    }

    #[test]
    fn test_literal_credentials_need_both_halves() {
        let settings = validated(json!({
            "imap.username": "gateway",
            "imap.password": "hunter2",
        }))
        .unwrap();
        let params = MailConnectionParams::from_settings(&settings).unwrap();
        assert!(matches!(
            params.credentials(),
            CredentialSource::Literal { username, .. } if username == "gateway"
        ));

        let settings = validated(json!({"imap.username": "gateway"})).unwrap();
        let err = MailConnectionParams::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ConnectionError::MissingCredentialSource));

        let settings = validated(json!({})).unwrap();
        let params = MailConnectionParams::from_settings(&settings).unwrap();
        assert_eq!(params.credentials(), &CredentialSource::Forwarded);
    }

    #[test]
    fn test_debug_redacts_password() {
        let source = CredentialSource::Literal {
            username: "gateway".into(),
            password: "hunter2".into(),
        };
        let printed = format!("{source:?}");
        assert!(printed.contains("gateway"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_send_backend_method_needs_no_params() {
        let settings = validated(json!({"smtp.method": "backend"})).unwrap();
        let send = MailSendParams::from_settings(&settings).unwrap();
        assert_eq!(send.method(), SendMethod::Backend);
        assert_eq!(send.host(), None);
        assert!(!send.auth_required());
    }

    #[test]
    fn test_send_smtp_requires_params_map() {
        let settings = validated(json!({"smtp.method": "smtp"})).unwrap();
        let err = MailSendParams::from_settings(&settings).unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::IncompleteSendParams { ref missing } if missing == &["host", "port"]
        ));
    }

    #[test]
    fn test_send_smtp_full_params() {
        let settings = validated(json!({
            "smtp.method": "smtp",
            "smtp.params": {
                "host": "ssl://smtp-ha.skymail.net.br",
                "port": 993,
                "auth": true,
                "username": "imap_username",
                "password": "imap_password",
            },
        }))
        .unwrap();

        let send = MailSendParams::from_settings(&settings).unwrap();
        assert_eq!(send.method(), SendMethod::Smtp);
        assert_eq!(send.host(), Some("ssl://smtp-ha.skymail.net.br"));
        assert_eq!(send.port(), Some(993));
        assert!(send.auth_required());
        assert!(matches!(
            send.credentials(),
            Some(CredentialSource::Literal { username, .. }) if username == "imap_username"
        ));
    }

    #[test]
    fn test_send_port_out_of_range() {
        let settings = validated(json!({
            "smtp.method": "smtp",
            "smtp.params": {"host": "smtp.example.com", "port": 700_000},
        }))
        .unwrap();

        let err = MailSendParams::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidSendPort { value: 700_000 }));
    }

    #[test]
    fn test_send_auth_without_source() {
        let settings = validated(json!({
            "smtp.method": "smtp",
            "smtp.params": {"host": "smtp.example.com", "port": 587, "auth": true},
        }))
        .unwrap();

        let err = MailSendParams::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ConnectionError::MissingCredentialSource));
    }

    #[test]
    fn test_send_auth_forwarded() {
        let settings = validated(json!({
            "smtp.method": "smtp",
            "smtp.params": {
                "host": "smtp.example.com",
                "port": 587,
                "auth": true,
                "forward-login": true,
            },
        }))
        .unwrap();

        let send = MailSendParams::from_settings(&settings).unwrap();
        assert_eq!(send.credentials(), Some(&CredentialSource::Forwarded));
    }
}
