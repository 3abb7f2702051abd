use std::path::PathBuf;

use crate::model::Strategy;

/// Server settings, read from `SLOTFINDER_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub bind: String,
    pub data_dir: PathBuf,
    pub password: String,
    pub max_connections: usize,
    pub metrics_port: Option<u16>,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
    /// Used when a query does not name a strategy.
    pub default_strategy: Strategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5433,
            bind: "0.0.0.0".into(),
            data_dir: PathBuf::from("./data"),
            password: "slotfinder".into(),
            max_connections: 256,
            metrics_port: None,
            tls_cert: None,
            tls_key: None,
            default_strategy: Strategy::InMemory,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults, set but
    /// unparsable keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        Ok(Self {
            port: parse_or(&lookup, "SLOTFINDER_PORT", defaults.port)?,
            bind: lookup("SLOTFINDER_BIND").unwrap_or(defaults.bind),
            data_dir: lookup("SLOTFINDER_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            password: lookup("SLOTFINDER_PASSWORD").unwrap_or(defaults.password),
            max_connections: parse_or(&lookup, "SLOTFINDER_MAX_CONNECTIONS", defaults.max_connections)?,
            metrics_port: lookup("SLOTFINDER_METRICS_PORT")
                .map(|v| parse_value("SLOTFINDER_METRICS_PORT", &v))
                .transpose()?,
            tls_cert: lookup("SLOTFINDER_TLS_CERT"),
            tls_key: lookup("SLOTFINDER_TLS_KEY"),
            default_strategy: lookup("SLOTFINDER_STRATEGY")
                .map(|v| {
                    v.parse().map_err(|message| ConfigError::Invalid {
                        key: "SLOTFINDER_STRATEGY",
                        message,
                    })
                })
                .transpose()?
                .unwrap_or(defaults.default_strategy),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: format!("{value:?}: {e}"),
    })
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Invalid { key: &'static str, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { key, message } => write!(f, "invalid {key}: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.listen_addr(), "0.0.0.0:5433");
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_lookup(lookup(&[
            ("SLOTFINDER_PORT", "6000"),
            ("SLOTFINDER_BIND", "127.0.0.1"),
            ("SLOTFINDER_DATA_DIR", "/var/lib/slotfinder"),
            ("SLOTFINDER_PASSWORD", "secret"),
            ("SLOTFINDER_MAX_CONNECTIONS", "8"),
            ("SLOTFINDER_METRICS_PORT", "9090"),
            ("SLOTFINDER_STRATEGY", "store"),
        ]))
        .unwrap();
        assert_eq!(config.listen_addr(), "127.0.0.1:6000");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/slotfinder"));
        assert_eq!(config.password, "secret");
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.metrics_port, Some(9090));
        assert_eq!(config.default_strategy, Strategy::Store);
    }

    #[test]
    fn bad_number_is_an_error() {
        let err = Config::from_lookup(lookup(&[("SLOTFINDER_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("SLOTFINDER_PORT"));
        assert!(Config::from_lookup(lookup(&[("SLOTFINDER_METRICS_PORT", "70000")])).is_err());
    }

    #[test]
    fn bad_strategy_is_an_error() {
        let err = Config::from_lookup(lookup(&[("SLOTFINDER_STRATEGY", "guess")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "SLOTFINDER_STRATEGY",
                message: "unknown strategy: guess".into(),
            }
        );
    }
}
