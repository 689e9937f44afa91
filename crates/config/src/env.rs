use courtsync_common::error::{EtlError, EtlResult};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Upstream operational database (read-only).
    pub source_database_url: String,
    /// Downstream report store; also holds checkpoints and run logs.
    pub database_url: String,
    pub sync_interval_secs: u64,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub host: String,
    pub port: u16,
    /// Bearer token for the on-demand sync trigger. Absent means the
    /// trigger rejects every request (fail closed).
    pub sync_token: Option<String>,
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    /// Loads `.env` file if present, then reads required vars.
    pub fn from_env() -> EtlResult<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        Ok(Self {
            source_database_url: get_var("SOURCE_DATABASE_URL")?,
            database_url: get_var("DATABASE_URL")?,
            sync_interval_secs: parse_var("ETL_INTERVAL_SECONDS", "120")?,
            max_retries: parse_var("ETL_MAX_RETRIES", "3")?,
            retry_delay_secs: parse_var("ETL_RETRY_DELAY_SECONDS", "5")?,
            host: get_var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", "8081")?,
            sync_token: env::var("SYNC_TOKEN").ok().filter(|v| !v.trim().is_empty()),
            log_level: get_var_or("LOG_LEVEL", "info"),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn get_var(key: &str) -> EtlResult<String> {
    env::var(key).map_err(|_| EtlError::Config(format!("{key} is required but not set")))
}

fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_var<T>(key: &str, default: &str) -> EtlResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_var_or(key, default)
        .parse()
        .map_err(|e| EtlError::Config(format!("invalid {key}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_etl_vars() {
        for key in [
            "SOURCE_DATABASE_URL",
            "DATABASE_URL",
            "ETL_INTERVAL_SECONDS",
            "ETL_MAX_RETRIES",
            "ETL_RETRY_DELAY_SECONDS",
            "SYNC_TOKEN",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn config_from_env_succeeds_with_required_vars() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_etl_vars();

        env::set_var("SOURCE_DATABASE_URL", "postgres://localhost/league");
        env::set_var("DATABASE_URL", "postgres://localhost/reports");

        let cfg = AppConfig::from_env().expect("should parse config");
        assert_eq!(cfg.source_database_url, "postgres://localhost/league");
        assert_eq!(cfg.database_url, "postgres://localhost/reports");
        assert_eq!(cfg.sync_interval_secs, 120);
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.retry_delay_secs, 5);
        assert_eq!(cfg.port, 8081);
        assert!(cfg.sync_token.is_none());

        clear_etl_vars();
    }

    #[test]
    fn config_from_env_fails_without_source_url() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_etl_vars();

        env::set_var("DATABASE_URL", "postgres://localhost/reports");
        let result = AppConfig::from_env();
        assert!(result.is_err());

        clear_etl_vars();
    }

    #[test]
    fn config_rejects_malformed_interval() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_etl_vars();

        env::set_var("SOURCE_DATABASE_URL", "postgres://localhost/league");
        env::set_var("DATABASE_URL", "postgres://localhost/reports");
        env::set_var("ETL_INTERVAL_SECONDS", "often");

        let result = AppConfig::from_env();
        assert!(result.is_err());

        clear_etl_vars();
    }

    #[test]
    fn blank_sync_token_reads_as_unset() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_etl_vars();

        env::set_var("SOURCE_DATABASE_URL", "postgres://localhost/league");
        env::set_var("DATABASE_URL", "postgres://localhost/reports");
        env::set_var("SYNC_TOKEN", "   ");

        let cfg = AppConfig::from_env().expect("should parse config");
        assert!(cfg.sync_token.is_none());

        clear_etl_vars();
    }

    #[test]
    fn bind_addr_formats_correctly() {
        let cfg = AppConfig {
            source_database_url: String::new(),
            database_url: String::new(),
            sync_interval_secs: 120,
            max_retries: 3,
            retry_delay_secs: 5,
            host: "127.0.0.1".to_owned(),
            port: 3000,
            sync_token: None,
            log_level: "debug".to_owned(),
        };
        assert_eq!(cfg.bind_addr(), "127.0.0.1:3000");
    }
}
