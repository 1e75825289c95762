//! [`Config`]-related definitions.

use std::{path::PathBuf, time};

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;
use service::{infra::api::dummy_json, RemoteWrites};
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote API configuration.
    pub api: Api,

    /// Session configuration.
    pub session: Session,

    /// Users cache configuration.
    pub users: Users,

    /// Local storage configuration.
    pub storage: Storage,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }

    /// Returns the [`service::Config`] described by this [`Config`].
    #[must_use]
    pub fn service(&self) -> service::Config {
        service::Config {
            session: self.session.into(),
            users: self.users.into(),
        }
    }
}

/// Remote API configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Api {
    /// Base URL of the remote API.
    #[default(service::infra::DummyJson::DEFAULT_BASE_URL.to_owned())]
    pub base_url: String,

    /// Timeout of a single request.
    #[default(time::Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub timeout: time::Duration,
}

impl From<Api> for dummy_json::Config {
    fn from(value: Api) -> Self {
        let Api { base_url, timeout } = value;
        Self { base_url, timeout }
    }
}

/// Session configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Session {
    /// Lifetime of an issued or renewed session.
    #[default(time::Duration::from_secs(10 * 60))]
    #[serde(with = "humantime_serde")]
    pub duration: time::Duration,

    /// Remaining lifetime below which a session gets renewed.
    #[default(time::Duration::from_secs(2 * 60))]
    #[serde(with = "humantime_serde")]
    pub warning_threshold: time::Duration,

    /// Interval between session checks.
    #[default(time::Duration::from_secs(30))]
    #[serde(with = "humantime_serde")]
    pub check_interval: time::Duration,

    /// Delay before retrying a failed renewal.
    #[default(time::Duration::from_secs(5))]
    #[serde(with = "humantime_serde")]
    pub retry_delay: time::Duration,

    /// Number of consecutive failed renewals forcing a logout.
    #[default(3)]
    pub max_renewal_attempts: u8,
}

impl From<Session> for service::SessionConfig {
    fn from(value: Session) -> Self {
        let Session {
            duration,
            warning_threshold,
            check_interval,
            retry_delay,
            max_renewal_attempts,
        } = value;
        Self {
            duration,
            warning_threshold,
            check_interval,
            retry_delay,
            max_renewal_attempts,
        }
    }
}

/// Users cache configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Users {
    /// Age after which the cached users are re-fetched.
    #[default(time::Duration::from_secs(5 * 60))]
    #[serde(with = "humantime_serde")]
    pub staleness: time::Duration,

    /// Number of users requested per page.
    #[default(100)]
    pub page_size: usize,

    /// Propagation of user mutations to the remote API: `skip`, `mirror` or
    /// `authoritative`.
    pub remote_writes: RemoteWrites,
}

impl From<Users> for service::UsersConfig {
    fn from(value: Users) -> Self {
        let Users {
            staleness,
            page_size,
            remote_writes,
        } = value;
        Self {
            staleness,
            page_size,
            remote_writes,
        }
    }
}

/// Local storage configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Storage {
    /// Directory the session and the cached users are stored in.
    #[default(PathBuf::from(".idbrasil"))]
    pub dir: PathBuf,
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    Info,

    /// Designates hazardous situations.
    #[default]
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use service::RemoteWrites;

    use super::Config;

    #[test]
    fn defaults_match_service_defaults() {
        let config = Config::new("does-not-exist.toml").unwrap();
        let service = config.service();
        let defaults = service::Config::default();

        assert_eq!(service.session.duration, defaults.session.duration);
        assert_eq!(service.session.duration, Duration::from_secs(600));
        assert_eq!(service.users.page_size, defaults.users.page_size);
        assert_eq!(service.users.remote_writes, RemoteWrites::Mirror);
    }
}
