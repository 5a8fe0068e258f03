//! Configuration resolution for sams-tt
//!
//! Layers the CLI, environment and TOML config: CLI → ENV → TOML → default.

use sams_common::config::{GeneratorConfig, StorageBackend, TomlConfig};
use sams_common::{Error, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

use crate::generator::{GeminiGenerator, GeneratorError, RetryPolicy};

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5740";
pub const GEMINI_API_KEY_ENV: &str = "SAMS_GEMINI_API_KEY";

/// Resolve the Gemini API key
///
/// **Priority:** ENV → TOML. `None` disables generation; the rest of the
/// service still runs.
pub fn resolve_gemini_api_key(toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(GEMINI_API_KEY_ENV).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config.generator.api_key.clone().filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "Gemini API key found in both environment and TOML config. Using environment (highest priority)."
        );
    }

    if let Some(key) = env_key {
        info!("Gemini API key loaded from environment variable");
        return Some(key);
    }

    if let Some(key) = toml_key {
        info!("Gemini API key loaded from TOML config");
        return Some(key);
    }

    warn!(
        "Gemini API key not configured; timetable generation is disabled. Set {} or \
         generator.api_key in the TOML config.",
        GEMINI_API_KEY_ENV
    );
    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Retry budget from the `[generator]` section, defaults for unset fields
pub fn retry_policy_from(config: &GeneratorConfig) -> RetryPolicy {
    let defaults = RetryPolicy::default();
    RetryPolicy {
        max_attempts: config.max_attempts.unwrap_or(defaults.max_attempts).max(1),
        attempt_timeout: config
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.attempt_timeout),
        ..defaults
    }
}

/// Build the Gemini generator when an API key is available
pub fn build_generator(toml_config: &TomlConfig) -> std::result::Result<Option<GeminiGenerator>, GeneratorError> {
    let Some(api_key) = resolve_gemini_api_key(toml_config) else {
        return Ok(None);
    };

    let policy = retry_policy_from(&toml_config.generator);
    let mut generator = GeminiGenerator::with_timeout(api_key, policy.attempt_timeout)?;
    if let Some(model) = &toml_config.generator.model {
        generator = generator.with_model(model.clone());
    }
    if let Some(base_url) = &toml_config.generator.base_url {
        generator = generator.with_base_url(base_url.clone());
    }

    info!(model = %generator.model(), "Schedule generator enabled");
    Ok(Some(generator))
}

/// Bind address: CLI → TOML → default
pub fn resolve_bind_address(cli_arg: Option<&str>, toml_config: &TomlConfig) -> Result<SocketAddr> {
    let raw = cli_arg
        .or(toml_config.bind_address.as_deref())
        .unwrap_or(DEFAULT_BIND_ADDRESS);

    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid bind address '{}': {}", raw, e)))
}

/// Storage backend: CLI → TOML → default (sqlite)
pub fn resolve_storage(cli_arg: Option<StorageBackend>, toml_config: &TomlConfig) -> StorageBackend {
    cli_arg.or(toml_config.storage).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn toml_with_key(key: Option<&str>) -> TomlConfig {
        TomlConfig {
            generator: GeneratorConfig {
                api_key: key.map(str::to_string),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    #[serial]
    fn test_env_key_wins_over_toml() {
        std::env::set_var(GEMINI_API_KEY_ENV, "env-key");
        let key = resolve_gemini_api_key(&toml_with_key(Some("toml-key")));
        std::env::remove_var(GEMINI_API_KEY_ENV);

        assert_eq!(key.as_deref(), Some("env-key"));
    }

    #[test]
    #[serial]
    fn test_toml_key_used_when_env_blank() {
        std::env::set_var(GEMINI_API_KEY_ENV, "   ");
        let key = resolve_gemini_api_key(&toml_with_key(Some("toml-key")));
        std::env::remove_var(GEMINI_API_KEY_ENV);

        assert_eq!(key.as_deref(), Some("toml-key"));
    }

    #[test]
    #[serial]
    fn test_no_key_disables_generator() {
        std::env::remove_var(GEMINI_API_KEY_ENV);
        assert_eq!(resolve_gemini_api_key(&toml_with_key(Some(""))), None);
        assert!(build_generator(&toml_with_key(None)).unwrap().is_none());
    }

    #[test]
    fn test_retry_policy_overrides() {
        let config = GeneratorConfig {
            timeout_secs: Some(5),
            max_attempts: Some(0),
            ..Default::default()
        };
        let policy = retry_policy_from(&config);
        assert_eq!(policy.attempt_timeout, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.initial_backoff, RetryPolicy::default().initial_backoff);
    }

    #[test]
    fn test_bind_address_priority() {
        let toml_config = TomlConfig {
            bind_address: Some("0.0.0.0:8080".to_string()),
            ..Default::default()
        };

        assert_eq!(
            resolve_bind_address(Some("127.0.0.1:9000"), &toml_config).unwrap().port(),
            9000
        );
        assert_eq!(resolve_bind_address(None, &toml_config).unwrap().port(), 8080);
        assert_eq!(
            resolve_bind_address(None, &TomlConfig::default()).unwrap().port(),
            5740
        );
        assert!(matches!(
            resolve_bind_address(Some("not an address"), &toml_config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_storage_priority() {
        let toml_config = TomlConfig {
            storage: Some(StorageBackend::Memory),
            ..Default::default()
        };
        assert_eq!(resolve_storage(None, &toml_config), StorageBackend::Memory);
        assert_eq!(
            resolve_storage(Some(StorageBackend::Sqlite), &toml_config),
            StorageBackend::Sqlite
        );
        assert_eq!(resolve_storage(None, &TomlConfig::default()), StorageBackend::Sqlite);
    }
}
