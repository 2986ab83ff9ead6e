//! Runtime configuration loading.
//!
//! Reads `relay.toml` (or a caller-supplied path) into a [`RuntimeConfig`].
//! A missing or malformed file is never fatal: defaults are used and the
//! problem is logged.

use std::path::Path;

use secrecy::SecretString;

use relay_types::config::{AdapterConfig, RuntimeConfig};

/// Load runtime configuration from `path`.
///
/// - Missing file: returns [`RuntimeConfig::default()`].
/// - Unreadable or unparsable file: logs a warning and returns the default.
pub async fn load_runtime_config(path: &Path) -> RuntimeConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            return RuntimeConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return RuntimeConfig::default();
        }
    };

    match toml::from_str::<RuntimeConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            RuntimeConfig::default()
        }
    }
}

/// Read the adapter's API key from the environment variable it names.
///
/// Empty values count as unset.
pub fn resolve_api_key(adapter: &AdapterConfig) -> Option<SecretString> {
    match std::env::var(&adapter.api_key_env) {
        Ok(value) if !value.trim().is_empty() => Some(SecretString::from(value)),
        Ok(_) => None,
        Err(_) => {
            tracing::debug!(env = %adapter.api_key_env, "API key variable not set");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::config::AdapterProvider;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_runtime_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_runtime_config(&tmp.path().join("relay.toml")).await;
        assert_eq!(config.event_channel_capacity, 256);
        assert!(config.remote_endpoints.is_empty());
    }

    #[tokio::test]
    async fn load_runtime_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("relay.toml");
        tokio::fs::write(
            &path,
            r#"
event_channel_capacity = 64

[adapter]
provider = "custom"
model = "local-model"
base_url = "http://localhost:11434/v1"

[[chains]]
name = "summarize"
description = "Summarize text"
url = "http://localhost:9000/summarize"
"#,
        )
        .await
        .unwrap();

        let config = load_runtime_config(&path).await;
        assert_eq!(config.event_channel_capacity, 64);
        assert_eq!(config.adapter.provider, AdapterProvider::Custom);
        assert_eq!(config.adapter.base_url.as_deref(), Some("http://localhost:11434/v1"));
        assert_eq!(config.chains.len(), 1);
    }

    #[tokio::test]
    async fn load_runtime_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("relay.toml");
        tokio::fs::write(&path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_runtime_config(&path).await;
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.adapter.model, "gpt-4o");
    }

    #[test]
    fn resolve_api_key_reads_named_variable() {
        let var = "RELAY_TEST_API_KEY_PRESENT";
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var(var, "sk-from-env") };
        let adapter = AdapterConfig {
            api_key_env: var.to_string(),
            ..Default::default()
        };
        let key = resolve_api_key(&adapter).unwrap();
        assert_eq!(key.expose_secret(), "sk-from-env");
        unsafe { std::env::remove_var(var) };
    }

    #[test]
    fn resolve_api_key_missing_or_empty_is_none() {
        let adapter = AdapterConfig {
            api_key_env: "RELAY_TEST_API_KEY_ABSENT".to_string(),
            ..Default::default()
        };
        assert!(resolve_api_key(&adapter).is_none());

        let var = "RELAY_TEST_API_KEY_EMPTY";
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var(var, "  ") };
        let adapter = AdapterConfig {
            api_key_env: var.to_string(),
            ..Default::default()
        };
        assert!(resolve_api_key(&adapter).is_none());
        unsafe { std::env::remove_var(var) };
    }
}
