use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use crate::constants::DEFAULT_SESSION_TTL_MINUTES;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub cors_origin: String,
    /// JSON file with the default study behaviour, used until a study is set up.
    pub study_config_path: Option<String>,
    /// Exposes the `/api/admin` routes.
    pub admin_access: bool,
    pub session_ttl_minutes: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/comparison.sled"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            study_config_path: env_optional("STUDY_CONFIG_PATH"),
            admin_access: env_or_bool("ADMIN_ACCESS", false),
            session_ttl_minutes: env_or_parse(
                "SESSION_TTL_MINUTES",
                DEFAULT_SESSION_TTL_MINUTES,
            ),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.session_ttl_minutes <= 0 {
            return Err(format!(
                "SESSION_TTL_MINUTES must be positive, got {}",
                self.session_ttl_minutes
            ));
        }
        if self.sled_path.trim().is_empty() {
            return Err("SLED_PATH must not be empty".to_string());
        }
        Ok(())
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn managed_keys() -> &'static [&'static str] {
        &[
            "HOST",
            "PORT",
            "RUST_LOG",
            "ADMIN_ACCESS",
            "SESSION_TTL_MINUTES",
            "STUDY_CONFIG_PATH",
        ]
    }

    fn clear_keys(keys: &[&str]) {
        for key in keys {
            env::remove_var(key);
        }
    }

    #[test]
    fn loads_defaults_when_missing() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.session_ttl_minutes, 240);
        assert!(!cfg.admin_access);
        assert!(cfg.study_config_path.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parses_values_and_flags() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "4000");
        env::set_var("ADMIN_ACCESS", "yes");
        env::set_var("SESSION_TTL_MINUTES", "30");
        env::set_var("STUDY_CONFIG_PATH", " ./study.json ");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 4000);
        assert!(cfg.admin_access);
        assert_eq!(cfg.session_ttl_minutes, 30);
        assert_eq!(cfg.study_config_path.as_deref(), Some("./study.json"));
        clear_keys(managed_keys());
    }

    #[test]
    fn invalid_values_fall_back() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "bad");
        env::set_var("SESSION_TTL_MINUTES", "soon");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.session_ttl_minutes, 240);
        clear_keys(managed_keys());
    }

    #[test]
    fn non_positive_ttl_is_rejected() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        let mut cfg = Config::from_env();
        cfg.session_ttl_minutes = 0;
        assert!(cfg.validate().is_err());
    }
}
