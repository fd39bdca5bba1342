// Configuration module: reads the layered `.env.default` / `.env` files with
// dotenvy and turns the resulting environment into a typed `Config`.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Files loaded from the working directory, lowest priority first.
pub const CONFIG_LAYERS: [&str; 2] = [".env.default", ".env"];

pub const DEFAULT_BASE_URL: &str = "https://api.aimlapi.com";
pub const DEFAULT_MODELS_URL: &str = "https://api.aimlapi.com/models";
pub const DEFAULT_USER_ID: &str = "example-1";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
    #[error("Could not read {0}: {1}")]
    File(PathBuf, String),
}

/// Everything the client needs at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_token: String,
    pub base_url: String,
    pub models_url: String,
    pub user_id: String,
    pub poll_interval: Duration,
    pub run_timeout: Duration,
    /// `RUST_LOG` directives, e.g. `info,reqwest=warn`.
    pub log_filter: String,
}

impl Config {
    /// Load the config layers from the current directory, then read the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."))
    }

    /// Load `.env.default` then `.env` from `dir`. Values from later files
    /// override earlier ones and the process environment. Missing files are
    /// skipped.
    pub fn load_from(dir: &Path) -> Result<Self, ConfigError> {
        for layer in CONFIG_LAYERS {
            let path = dir.join(layer);
            if !path.is_file() {
                continue;
            }
            dotenvy::from_path_override(&path)
                .map_err(|e| ConfigError::File(path.clone(), e.to_string()))?;
            tracing::debug!(path = %path.display(), "loaded config layer");
        }
        Self::from_env()
    }

    /// Build the config from environment variables alone.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_token = std::env::var("API_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar("API_TOKEN".to_string()))?;

        let base_url = var_or("API_BASE_URL", DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        let models_url = var_or("MODELS_URL", DEFAULT_MODELS_URL);
        let user_id = var_or("ASSISTANT_USER_ID", DEFAULT_USER_ID);

        let poll_interval = Duration::from_millis(parse_positive("RUN_POLL_INTERVAL_MS", 1000)?);
        let run_timeout = Duration::from_secs(parse_positive("RUN_TIMEOUT_SECS", 300)?);

        let log_filter = var_or("RUST_LOG", "warn");
        EnvFilter::try_new(&log_filter).map_err(|e| {
            ConfigError::InvalidValue("RUST_LOG".to_string(), e.to_string())
        })?;

        Ok(Self {
            api_token,
            base_url,
            models_url,
            user_id,
            poll_interval,
            run_timeout,
            log_filter,
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// A non-zero integer from `name`, or `default` when unset.
fn parse_positive(name: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))?,
        Err(_) => default,
    };
    if value == 0 {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;

    const VARS: [&str; 7] = [
        "API_TOKEN",
        "API_BASE_URL",
        "MODELS_URL",
        "ASSISTANT_USER_ID",
        "RUN_POLL_INTERVAL_MS",
        "RUN_TIMEOUT_SECS",
        "RUST_LOG",
    ];

    fn clear_env_vars() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_config_error_display() {
        let missing_var = ConfigError::MissingVar("API_TOKEN".to_string());
        assert_eq!(
            format!("{}", missing_var),
            "Missing environment variable: API_TOKEN"
        );

        let invalid_value =
            ConfigError::InvalidValue("RUN_TIMEOUT_SECS".to_string(), "bad".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable RUN_TIMEOUT_SECS: bad"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env_vars();
        env::set_var("API_TOKEN", "tok-123");

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.api_token, "tok-123");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.models_url, DEFAULT_MODELS_URL);
        assert_eq!(config.user_id, "example-1");
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.run_timeout, Duration::from_secs(300));
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    #[serial]
    fn test_config_missing_token() {
        clear_env_vars();

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(var) => assert_eq!(var, "API_TOKEN"),
            _ => panic!("Expected MissingVar for API_TOKEN"),
        }

        env::set_var("API_TOKEN", "   ");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingVar(_))
        ));
    }

    #[test]
    #[serial]
    fn test_config_invalid_numbers() {
        clear_env_vars();
        env::set_var("API_TOKEN", "tok");
        env::set_var("RUN_POLL_INTERVAL_MS", "soon");

        match Config::from_env().unwrap_err() {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUN_POLL_INTERVAL_MS"),
            _ => panic!("Expected InvalidValue for RUN_POLL_INTERVAL_MS"),
        }

        env::remove_var("RUN_POLL_INTERVAL_MS");
        env::set_var("RUN_TIMEOUT_SECS", "0");
        match Config::from_env().unwrap_err() {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUN_TIMEOUT_SECS"),
            _ => panic!("Expected InvalidValue for RUN_TIMEOUT_SECS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_zero_poll_interval() {
        clear_env_vars();
        env::set_var("API_TOKEN", "tok");
        env::set_var("RUN_POLL_INTERVAL_MS", "0");

        match Config::from_env().unwrap_err() {
            ConfigError::InvalidValue(var, msg) => {
                assert_eq!(var, "RUN_POLL_INTERVAL_MS");
                assert!(msg.contains("greater than zero"));
            }
            _ => panic!("Expected InvalidValue for RUN_POLL_INTERVAL_MS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_accepts_filter_directives() {
        clear_env_vars();
        env::set_var("API_TOKEN", "tok");
        env::set_var("RUST_LOG", "info,reqwest=warn");

        let config = Config::from_env().expect("directives should be accepted");
        assert_eq!(config.log_filter, "info,reqwest=warn");
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_filter() {
        clear_env_vars();
        env::set_var("API_TOKEN", "tok");
        env::set_var("RUST_LOG", "reqwest=loud");

        match Config::from_env().unwrap_err() {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }

    #[test]
    #[serial]
    fn test_config_layers_override_in_order() {
        clear_env_vars();
        env::set_var("ASSISTANT_USER_ID", "from-process");

        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".env.default"),
            "API_TOKEN=default-token\nAPI_BASE_URL=https://default.example/\nASSISTANT_USER_ID=default-user\n",
        )
        .unwrap();
        fs::write(dir.path().join(".env"), "API_TOKEN=override-token\n").unwrap();

        let config = Config::load_from(dir.path()).expect("layers should load");

        assert_eq!(config.api_token, "override-token");
        assert_eq!(config.base_url, "https://default.example");
        assert_eq!(config.user_id, "default-user");
    }

    #[test]
    #[serial]
    fn test_config_missing_layers_are_skipped() {
        clear_env_vars();
        env::set_var("API_TOKEN", "process-token");

        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path()).expect("no files is fine");

        assert_eq!(config.api_token, "process-token");
    }
}
