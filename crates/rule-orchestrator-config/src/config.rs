// crates/rule-orchestrator-config/src/config.rs
// ============================================================================
// Module: Rule Orchestrator Configuration
// Description: Configuration loading and validation for the rule orchestrator.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: rule-orchestrator-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. Client registrations carry
//! credentials, so every auth field is length- and shape-checked before a
//! client can be registered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rule_orchestrator_core::ClientId;
use rule_orchestrator_core::ConflictStrategy;
use rule_orchestrator_core::DEFAULT_CACHE_CAPACITY;
use rule_orchestrator_core::DEFAULT_MAX_FILE_BYTES;
use rule_orchestrator_core::FileEventSink;
use rule_orchestrator_core::NoopEventSink;
use rule_orchestrator_core::RuleCategory;
use rule_orchestrator_core::SharedEventSink;
use rule_orchestrator_core::StderrEventSink;
use rule_orchestrator_core::SyncOperation;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "rule-orchestrator.toml";
/// Environment variable for config path overrides.
pub const CONFIG_ENV_VAR: &str = "RULE_ORCHESTRATOR_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default rule root, relative to the working directory.
pub const DEFAULT_RULES_ROOT: &str = ".cursor/rules";
/// Upper bound for the per-file parse limit.
pub(crate) const MAX_RULE_FILE_BYTES: usize = 64 * 1024 * 1024;
/// Upper bound for the composition cache capacity.
pub(crate) const MAX_CACHE_CAPACITY: usize = 100_000;
/// Default cache TTL in seconds.
pub(crate) const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
/// Default number of sync results retained per client.
pub const DEFAULT_MAX_HISTORY: usize = 100;
/// Upper bound for retained sync results per client.
pub(crate) const MAX_HISTORY: usize = 10_000;
/// Default session token lifetime in seconds.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
/// Maximum number of registered clients.
pub(crate) const MAX_CLIENTS: usize = 256;
/// Maximum length of a client identifier.
pub(crate) const MAX_CLIENT_ID_LENGTH: usize = 128;
/// Maximum length of a client display name.
pub(crate) const MAX_CLIENT_NAME_LENGTH: usize = 256;
/// Default requests allowed per minute.
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 100;
/// Maximum requests allowed per minute.
pub(crate) const MAX_RATE_LIMIT_PER_MINUTE: u32 = 100_000;
/// Default auto-sync interval in seconds.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;
/// Minimum length of a bearer or access token.
pub const MIN_AUTH_TOKEN_LENGTH: usize = 11;
/// Maximum length of a secret, bearer token, or access token.
pub const MAX_AUTH_TOKEN_LENGTH: usize = 256;
/// Maximum number of allow-listed bearer tokens per client.
pub(crate) const MAX_AUTH_TOKENS: usize = 64;
/// Maximum length of a certificate subject string.
pub(crate) const MAX_AUTH_SUBJECT_LENGTH: usize = 512;

// ============================================================================
// SECTION: Configuration Root
// ============================================================================

/// Rule orchestrator configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrchestratorConfig {
    /// Rule tree settings.
    #[serde(default)]
    pub rules: RulesConfig,
    /// Composition cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Synchronization bookkeeping settings.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Event logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Statically registered sync clients.
    #[serde(default)]
    pub clients: Vec<ClientConfig>,
}

impl OrchestratorConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Loads configuration, falling back to defaults when no file is named
    /// anywhere and the default file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a named or discovered file fails to load.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if path.is_none()
            && env::var_os(CONFIG_ENV_VAR).is_none()
            && !Path::new(DEFAULT_CONFIG_NAME).exists()
        {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rules.validate()?;
        self.cache.validate()?;
        self.sync.validate()?;
        self.logging.validate()?;
        if self.clients.len() > MAX_CLIENTS {
            return Err(ConfigError::Invalid("too many clients".to_string()));
        }
        let mut seen = BTreeSet::new();
        for client in &self.clients {
            client.validate()?;
            if !seen.insert(client.client_id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate client_id: {}",
                    client.client_id
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Rule tree configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    /// Root directory of the rule tree.
    #[serde(default = "default_rules_root")]
    pub root: PathBuf,
    /// Maximum bytes read from a single rule file.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            root: default_rules_root(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

impl RulesConfig {
    /// Validates rule tree settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("rules.root", &self.root.to_string_lossy())?;
        if self.max_file_bytes == 0 {
            return Err(ConfigError::Invalid("rules.max_file_bytes must be > 0".to_string()));
        }
        if self.max_file_bytes > MAX_RULE_FILE_BYTES {
            return Err(ConfigError::Invalid("rules.max_file_bytes exceeds limit".to_string()));
        }
        Ok(())
    }
}

/// Default rule root.
fn default_rules_root() -> PathBuf {
    PathBuf::from(DEFAULT_RULES_ROOT)
}

/// Default per-file parse limit.
const fn default_max_file_bytes() -> usize {
    DEFAULT_MAX_FILE_BYTES
}

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Composition cache configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CacheConfig {
    /// Maximum cached compositions; zero disables caching.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// Lifetime of a cached composition in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub default_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            default_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CacheConfig {
    /// Returns the default TTL as a duration.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// Validates cache settings.
    fn validate(self) -> Result<(), ConfigError> {
        if self.capacity > MAX_CACHE_CAPACITY {
            return Err(ConfigError::Invalid("cache.capacity exceeds limit".to_string()));
        }
        if self.default_ttl_secs == 0 {
            return Err(ConfigError::Invalid("cache.default_ttl_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Default cache capacity.
const fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

/// Default cache TTL.
const fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

// ============================================================================
// SECTION: Sync
// ============================================================================

/// Synchronization bookkeeping configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SyncConfig {
    /// Sync results retained per client.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Session token lifetime in seconds.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

impl SyncConfig {
    /// Returns the session lifetime as a duration.
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Validates sync settings.
    fn validate(self) -> Result<(), ConfigError> {
        if self.max_history == 0 || self.max_history > MAX_HISTORY {
            return Err(ConfigError::Invalid(format!(
                "sync.max_history must be between 1 and {MAX_HISTORY}"
            )));
        }
        if self.session_ttl_secs == 0 {
            return Err(ConfigError::Invalid("sync.session_ttl_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Default retained history.
const fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}

/// Default session lifetime.
const fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Destination for engine events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `logging.path`.
    File,
    /// Discard events.
    None,
}

/// Event logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: LogSinkKind,
    /// Output path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds the configured event sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file sink cannot be opened and
    /// [`ConfigError::Invalid`] when the file sink has no path.
    pub fn build_sink(&self) -> Result<SharedEventSink, ConfigError> {
        match self.sink {
            LogSinkKind::Stderr => Ok(Arc::new(StderrEventSink)),
            LogSinkKind::None => Ok(Arc::new(NoopEventSink)),
            LogSinkKind::File => {
                let path = self.path.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("logging.path required for file sink".to_string())
                })?;
                let sink = FileEventSink::new(path).map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
        }
    }

    /// Validates logging settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.sink, &self.path) {
            (LogSinkKind::File, None) => {
                Err(ConfigError::Invalid("logging.path required for file sink".to_string()))
            }
            (_, Some(path)) => validate_path_string("logging.path", &path.to_string_lossy()),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Clients
// ============================================================================

/// Credentials a client is registered with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ClientAuthConfig {
    /// Pre-shared secret compared in constant time.
    SharedSecret {
        /// Expected secret.
        secret: String,
    },
    /// Bearer token; an empty allow-list accepts any well-formed token.
    BearerToken {
        /// Accepted tokens.
        #[serde(default)]
        allowed_tokens: Vec<String>,
    },
    /// OAuth2 client credentials.
    #[serde(rename = "oauth2")]
    OAuth2 {
        /// Expected OAuth2 client identifier.
        oauth_client_id: String,
    },
    /// Client certificate subject.
    Certificate {
        /// Expected certificate subject.
        subject: String,
    },
}

impl ClientAuthConfig {
    /// Returns a stable label for the auth method.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::SharedSecret {
                ..
            } => "shared_secret",
            Self::BearerToken {
                ..
            } => "bearer_token",
            Self::OAuth2 {
                ..
            } => "oauth2",
            Self::Certificate {
                ..
            } => "certificate",
        }
    }

    /// Validates credential shape.
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::SharedSecret {
                secret,
            } => validate_secret("auth.secret", secret),
            Self::BearerToken {
                allowed_tokens,
            } => {
                if allowed_tokens.len() > MAX_AUTH_TOKENS {
                    return Err(ConfigError::Invalid("too many auth tokens".to_string()));
                }
                for token in allowed_tokens {
                    if !is_well_formed_token(token) {
                        return Err(ConfigError::Invalid(
                            "auth.allowed_tokens entry is malformed".to_string(),
                        ));
                    }
                }
                Ok(())
            }
            Self::OAuth2 {
                oauth_client_id,
            } => validate_secret("auth.oauth_client_id", oauth_client_id),
            Self::Certificate {
                subject,
            } => {
                if subject.trim().is_empty() {
                    return Err(ConfigError::Invalid("auth.subject must be non-empty".to_string()));
                }
                if subject.len() > MAX_AUTH_SUBJECT_LENGTH {
                    return Err(ConfigError::Invalid("auth.subject too long".to_string()));
                }
                Ok(())
            }
        }
    }
}

/// Registration of one synchronization client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Client identifier.
    pub client_id: ClientId,
    /// Display name.
    pub client_name: String,
    /// Registered credentials.
    pub auth: ClientAuthConfig,
    /// Operations the client may request.
    pub permissions: BTreeSet<SyncOperation>,
    /// Requests allowed per 60 second window.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
    /// Advisory auto-sync interval in seconds.
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,
    /// Categories the client may push; every category when omitted.
    #[serde(default = "default_categories")]
    pub allowed_categories: BTreeSet<RuleCategory>,
    /// Whether the client expects periodic syncs.
    #[serde(default = "default_auto_sync")]
    pub auto_sync: bool,
    /// Default conflict strategy.
    #[serde(default)]
    pub conflict_strategy: ConflictStrategy,
}

impl ClientConfig {
    /// Creates a client registration with default limits.
    #[must_use]
    pub fn new(
        client_id: impl Into<ClientId>,
        client_name: impl Into<String>,
        auth: ClientAuthConfig,
        permissions: impl IntoIterator<Item = SyncOperation>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_name: client_name.into(),
            auth,
            permissions: permissions.into_iter().collect(),
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            allowed_categories: default_categories(),
            auto_sync: true,
            conflict_strategy: ConflictStrategy::default(),
        }
    }

    /// Validates the registration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let id = self.client_id.as_str();
        if id.trim().is_empty() {
            return Err(ConfigError::Invalid("client_id must be non-empty".to_string()));
        }
        if id.len() > MAX_CLIENT_ID_LENGTH {
            return Err(ConfigError::Invalid("client_id too long".to_string()));
        }
        if id.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
            return Err(ConfigError::Invalid(
                "client_id must not contain whitespace".to_string(),
            ));
        }
        if self.client_name.trim().is_empty() {
            return Err(ConfigError::Invalid("client_name must be non-empty".to_string()));
        }
        if self.client_name.len() > MAX_CLIENT_NAME_LENGTH {
            return Err(ConfigError::Invalid("client_name too long".to_string()));
        }
        self.auth.validate()?;
        if self.permissions.is_empty() {
            return Err(ConfigError::Invalid("permissions must be non-empty".to_string()));
        }
        if self.rate_limit_per_minute == 0 {
            return Err(ConfigError::Invalid("rate_limit_per_minute must be > 0".to_string()));
        }
        if self.rate_limit_per_minute > MAX_RATE_LIMIT_PER_MINUTE {
            return Err(ConfigError::Invalid("rate_limit_per_minute exceeds limit".to_string()));
        }
        Ok(())
    }

    /// Returns true when the client may request `operation`.
    #[must_use]
    pub fn permits(&self, operation: SyncOperation) -> bool {
        self.permissions.contains(&operation)
    }

    /// Returns true when the client may push documents of `category`.
    #[must_use]
    pub fn allows_category(&self, category: RuleCategory) -> bool {
        self.allowed_categories.contains(&category)
    }
}

/// Default rate limit.
const fn default_rate_limit() -> u32 {
    DEFAULT_RATE_LIMIT_PER_MINUTE
}

/// Default sync interval.
const fn default_sync_interval() -> u64 {
    DEFAULT_SYNC_INTERVAL_SECS
}

/// Every category.
fn default_categories() -> BTreeSet<RuleCategory> {
    RuleCategory::ALL.into_iter().collect()
}

/// Auto-sync default.
const fn default_auto_sync() -> bool {
    true
}

/// Returns true when `token` has the shape of a bearer or access token:
/// printable ASCII without whitespace, within the length bounds.
#[must_use]
pub fn is_well_formed_token(token: &str) -> bool {
    (MIN_AUTH_TOKEN_LENGTH ..= MAX_AUTH_TOKEN_LENGTH).contains(&token.len())
        && token.chars().all(|ch| ch.is_ascii_graphic())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Returns a stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Parse(_) => "parse",
            Self::Invalid(_) => "invalid_config",
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a secret-like string: non-empty, bounded, no surrounding space.
fn validate_secret(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if value.len() > MAX_AUTH_TOKEN_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} too long")));
    }
    if value.trim() != value {
        return Err(ConfigError::Invalid(format!("{field} must not contain whitespace")));
    }
    Ok(())
}
