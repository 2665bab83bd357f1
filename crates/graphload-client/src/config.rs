//! Connection configuration.
//!
//! Everything a client needs to reach a database lives in one explicit value
//! that is handed to [`crate::OrientClient::connect`]. Nothing is read from
//! process-wide state after construction.

use base64::Engine;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ADDRESS: &str = "http://localhost";
pub const DEFAULT_PORT: u16 = 2480;
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_LANGUAGE: &str = "sql";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const ENV_ADDRESS: &str = "ORIENTDB_ADDRESS";
pub const ENV_PORT: &str = "ORIENTDB_PORT";
pub const ENV_DATABASE: &str = "ORIENTDB_DATABASE";
pub const ENV_USER: &str = "ORIENTDB_USER";
pub const ENV_PASSWORD: &str = "ORIENTDB_PASSWORD";
pub const ENV_LANGUAGE: &str = "ORIENTDB_LANGUAGE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no database configured (set {ENV_DATABASE} or pass --database)")]
    MissingDatabase,
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct ConnectionConfig {
    /// Scheme and host, e.g. `http://localhost`.
    pub address: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Send the password base64-encoded (some server realms are configured
    /// with encoded credentials).
    pub password_base64: bool,
    /// Default query/command language.
    pub language: String,
    pub timeout_secs: u64,
}

// Hand-written so the password never ends up in logs.
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("password_base64", &self.password_base64)
            .field("language", &self.language)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            database: String::new(),
            user: DEFAULT_USER.to_string(),
            password: String::new(),
            password_base64: false,
            language: DEFAULT_LANGUAGE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ConnectionConfig {
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            ..Default::default()
        }
    }

    /// Load from environment variables, falling back to the defaults above.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(address) = lookup(ENV_ADDRESS) {
            config.address = address;
        }
        if let Some(port) = lookup(ENV_PORT) {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{ENV_PORT}=`{port}` is not a port")))?;
        }
        if let Some(user) = lookup(ENV_USER) {
            config.user = user;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            config.password = password;
        }
        if let Some(language) = lookup(ENV_LANGUAGE) {
            config.language = language;
        }
        config.database = lookup(ENV_DATABASE).unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn with_credentials(mut self, user: &str, password: &str) -> Self {
        self.user = user.to_string();
        self.password = password.to_string();
        self
    }

    pub fn with_address(mut self, address: &str, port: u16) -> Self {
        self.address = address.to_string();
        self.port = port;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::MissingDatabase);
        }
        let url = Url::parse(&self.server_address())
            .map_err(|e| ConfigError::Invalid(format!("address `{}`: {e}", self.address)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "address `{}` must use http or https",
                self.address
            )));
        }
        if self.language.trim().is_empty() {
            return Err(ConfigError::Invalid("language must not be empty".to_string()));
        }
        Ok(())
    }

    /// `address:port`, without a trailing slash.
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.address.trim_end_matches('/'), self.port)
    }

    /// The password as it is sent on the wire.
    pub fn wire_password(&self) -> String {
        if self.password_base64 {
            base64::engine::general_purpose::STANDARD.encode(self.password.as_bytes())
        } else {
            self.password.clone()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
