//! Environment-sourced runtime settings.
//!
//! Every required value is resolved exactly once at startup; a missing or
//! empty variable is fatal before any network connection is attempted.

use std::fmt;

use thiserror::Error;

/// Account used for schema provisioning. The elevated target always
/// authenticates as this user; only its password comes from the environment.
pub const ELEVATED_USER: &str = "root";

/// Architecture variant embedded in schema object names when `RELMON_ARCH`
/// is unset.
pub const DEFAULT_VARIANT: &str = "amd64";

const MYSQL_HOST: &str = "MYSQL_HOST";
const MYSQL_PORT: &str = "MYSQL_PORT";
const MYSQL_USER: &str = "MYSQL_USER";
const MYSQL_PASSWORD: &str = "MYSQL_PASSWORD";
const MYSQL_ROOT_PASSWORD: &str = "MYSQL_ROOT_PASSWORD";
const MYSQL_DATABASE: &str = "MYSQL_DATABASE";
const RELMON_ARCH: &str = "RELMON_ARCH";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{0} is not defined")]
    Missing(&'static str),

    #[error("{name} is not a valid TCP port: `{value}`")]
    InvalidPort { name: &'static str, value: String },
}

/// Connection coordinates resolved from the environment, immutable for the
/// process lifetime.
#[derive(Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub root_password: String,
    pub database: String,
    pub variant: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("root_password", &"<redacted>")
            .field("database", &self.database)
            .field("variant", &self.variant)
            .finish()
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve settings through an arbitrary lookup function. The process
    /// environment is one such function; tests supply maps.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        let host = require(&lookup, MYSQL_HOST)?;
        let port_raw = require(&lookup, MYSQL_PORT)?;
        let port =
            port_raw
                .parse::<u16>()
                .map_err(|_| SettingsError::InvalidPort {
                    name: MYSQL_PORT,
                    value: port_raw,
                })?;
        let user = require(&lookup, MYSQL_USER)?;
        let password = require(&lookup, MYSQL_PASSWORD)?;
        let root_password = require(&lookup, MYSQL_ROOT_PASSWORD)?;
        let database = require(&lookup, MYSQL_DATABASE)?;
        let variant = lookup(RELMON_ARCH)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_VARIANT.to_string());

        Ok(Settings {
            host,
            port,
            user,
            password,
            root_password,
            database,
            variant,
        })
    }

    /// Target used for steady-state work: readiness checks and the
    /// reconcile task.
    pub fn restricted_target(&self) -> ConnectTarget {
        ConnectTarget {
            host: self.host.clone(),
            port: self.port,
            username: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
        }
    }

    /// Target used exclusively for schema provisioning.
    pub fn elevated_target(&self) -> ConnectTarget {
        ConnectTarget {
            host: self.host.clone(),
            port: self.port,
            username: ELEVATED_USER.to_string(),
            password: self.root_password.clone(),
            database: self.database.clone(),
        }
    }
}

fn require(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, SettingsError> {
    match lookup(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(SettingsError::Missing(name)),
    }
}

/// One credential set against the backing store. The elevated and
/// restricted targets share everything but the credential pair.
#[derive(Clone)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl fmt::Debug for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

impl fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mysql://{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }
}
