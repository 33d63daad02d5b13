use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Clinic Desk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Printed at the top of every receipt unless `CLINIC_NAME` overrides it.
pub const CLINIC_NAME: &str = "Clinic Desk";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_ADMIN_USER: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin";
const DEFAULT_SESSION_TTL_SECS: u64 = 12 * 60 * 60;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "clinic_desk=info,clinic_desk_lib=info,tower_http=info"
}

/// Get the application data directory (`<data_dir>/ClinicDesk`).
/// Falls back to the working directory when the platform has none.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ClinicDesk")
}

/// Default SQLite file location.
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("clinic.db")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub clinic_name: String,
    pub admin_user: String,
    pub admin_password: String,
    pub session_ttl: Duration,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = get("CLINIC_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                key: "CLINIC_BIND_ADDR",
                value: bind_raw.clone(),
                reason: e.to_string(),
            })?;

        let session_ttl = match get("CLINIC_SESSION_TTL_SECS") {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| ConfigError::InvalidValue {
                        key: "CLINIC_SESSION_TTL_SECS",
                        value: raw.clone(),
                        reason: e.to_string(),
                    })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "CLINIC_SESSION_TTL_SECS",
                        value: raw,
                        reason: "must be positive".into(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        };

        Ok(Self {
            bind_addr,
            db_path: get("CLINIC_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_db_path),
            clinic_name: get("CLINIC_NAME").unwrap_or_else(|| CLINIC_NAME.to_string()),
            admin_user: get("CLINIC_ADMIN_USER").unwrap_or_else(|| DEFAULT_ADMIN_USER.to_string()),
            admin_password: get("CLINIC_ADMIN_PASSWORD")
                .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string()),
            session_ttl,
        })
    }

    /// True while the shipped password is still in use.
    pub fn uses_default_password(&self) -> bool {
        self.admin_password == DEFAULT_ADMIN_PASSWORD
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            db_path: default_db_path(),
            clinic_name: CLINIC_NAME.to_string(),
            admin_user: DEFAULT_ADMIN_USER.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.admin_user, "admin");
        assert!(config.uses_default_password());
        assert_eq!(config.session_ttl, Duration::from_secs(43_200));
        assert!(config.db_path.ends_with("ClinicDesk/clinic.db"));
        assert_eq!(config.clinic_name, CLINIC_NAME);
    }

    #[test]
    fn environment_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CLINIC_BIND_ADDR", "0.0.0.0:9000"),
            ("CLINIC_DB_PATH", "/tmp/clinic-test.db"),
            ("CLINIC_ADMIN_USER", "reception"),
            ("CLINIC_ADMIN_PASSWORD", "s3cret"),
            ("CLINIC_SESSION_TTL_SECS", "60"),
            ("CLINIC_NAME", "Hargeisa Dental"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.db_path, PathBuf::from("/tmp/clinic-test.db"));
        assert_eq!(config.admin_user, "reception");
        assert!(!config.uses_default_password());
        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert_eq!(config.clinic_name, "Hargeisa Dental");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("CLINIC_ADMIN_USER", "  ")])).unwrap();
        assert_eq!(config.admin_user, "admin");
    }

    #[test]
    fn malformed_bind_addr_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("CLINIC_BIND_ADDR", "not-an-addr")]))
            .unwrap_err();
        assert!(err.to_string().contains("CLINIC_BIND_ADDR"));
    }

    #[test]
    fn zero_ttl_rejected() {
        let result = AppConfig::from_lookup(lookup(&[("CLINIC_SESSION_TTL_SECS", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn db_path_under_app_data() {
        assert!(default_db_path().starts_with(app_data_dir()));
    }
}
