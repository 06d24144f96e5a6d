//! Server configuration, layered from environment variables over
//! defaults.

use std::net::SocketAddr;
use std::str::FromStr;

use mailroom_auth::AuthConfig;
use mailroom_db::DbConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub db: DbConfig,
    pub auth: AuthConfig,
    /// Adds `Secure` to the session cookie. Enable behind TLS.
    pub cookie_secure: bool,
    /// Domain part of the system-assigned sender address.
    pub sender_domain: String,
    /// Audit entries returned when the caller gives no limit.
    pub audit_limit: u64,
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            db: DbConfig::default(),
            auth: AuthConfig::default(),
            cookie_secure: false,
            sender_domain: "emailserver.com".into(),
            audit_limit: 100,
            sweep_interval_secs: 600,
        }
    }
}

impl ServerConfig {
    /// Read `MAILROOM_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unset variables keep
    /// their defaults; malformed ones are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = lookup("MAILROOM_BIND") {
            config.bind = parse("MAILROOM_BIND", v)?;
        }
        if let Some(v) = lookup("MAILROOM_DB_URL") {
            config.db.url = v;
        }
        if let Some(v) = lookup("MAILROOM_DB_NAMESPACE") {
            config.db.namespace = v;
        }
        if let Some(v) = lookup("MAILROOM_DB_DATABASE") {
            config.db.database = v;
        }
        if let Some(v) = lookup("MAILROOM_DB_USER") {
            config.db.username = v;
        }
        if let Some(v) = lookup("MAILROOM_DB_PASSWORD") {
            config.db.password = v;
        }
        if let Some(v) = lookup("MAILROOM_PEPPER") {
            config.auth.pepper = Some(v).filter(|p| !p.is_empty());
        }
        if let Some(v) = lookup("MAILROOM_SESSION_TTL_SECS") {
            config.auth.session_lifetime_secs = positive("MAILROOM_SESSION_TTL_SECS", v)?;
        }
        if let Some(v) = lookup("MAILROOM_COOKIE_SECURE") {
            config.cookie_secure = parse_bool("MAILROOM_COOKIE_SECURE", v)?;
        }
        if let Some(v) = lookup("MAILROOM_SENDER_DOMAIN") {
            config.sender_domain = v;
        }
        if let Some(v) = lookup("MAILROOM_AUDIT_LIMIT") {
            let limit = positive("MAILROOM_AUDIT_LIMIT", v.clone())?;
            if limit > mailroom_admin::validation::MAX_AUDIT_LIMIT {
                return Err(ConfigError::Invalid {
                    var: "MAILROOM_AUDIT_LIMIT",
                    value: v,
                    reason: "must not exceed 500".into(),
                });
            }
            config.audit_limit = limit;
        }
        if let Some(v) = lookup("MAILROOM_SWEEP_INTERVAL_SECS") {
            config.sweep_interval_secs = positive("MAILROOM_SWEEP_INTERVAL_SECS", v)?;
        }

        Ok(config)
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}

fn positive(var: &'static str, value: String) -> Result<u64, ConfigError> {
    let n: u64 = parse(var, value.clone())?;
    if n == 0 {
        return Err(ConfigError::Invalid {
            var,
            value,
            reason: "must be greater than zero".into(),
        });
    }
    Ok(n)
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value,
            reason: "expected a boolean".into(),
        }),
    }
}
