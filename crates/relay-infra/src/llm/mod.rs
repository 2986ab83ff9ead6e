//! Service adapter implementations.
//!
//! Also provides [`create_service_adapter`], which builds the configured
//! adapter from an [`AdapterConfig`].

pub mod openai_compat;

use secrecy::SecretString;

use relay_core::adapter::BoxServiceAdapter;
use relay_types::config::{AdapterConfig, AdapterProvider};
use relay_types::error::AdapterError;

use self::openai_compat::OpenAiCompatibleAdapter;
use self::openai_compat::config::{OpenAiCompatConfig, openai_defaults, unify_defaults};

/// Build a [`BoxServiceAdapter`] from configuration.
///
/// `api_key` is the already-resolved key; OpenAI and Unify require one,
/// custom endpoints do not.
pub fn create_service_adapter(
    config: &AdapterConfig,
    api_key: Option<SecretString>,
) -> Result<BoxServiceAdapter, AdapterError> {
    let mut compat = match config.provider {
        AdapterProvider::OpenAi => {
            openai_defaults(api_key.ok_or(AdapterError::AuthenticationFailed)?, &config.model)
        }
        AdapterProvider::Unify => {
            unify_defaults(api_key.ok_or(AdapterError::AuthenticationFailed)?, &config.model)
        }
        AdapterProvider::Custom => {
            let base_url = config.base_url.clone().ok_or_else(|| {
                AdapterError::InvalidRequest("custom adapter requires base_url".to_string())
            })?;
            OpenAiCompatConfig {
                provider_name: "custom".to_string(),
                base_url,
                api_key,
                model: config.model.clone(),
            }
        }
    };

    if let Some(base_url) = &config.base_url {
        compat.base_url = base_url.clone();
    }

    tracing::debug!(provider = %config.provider, model = %config.model, base_url = %compat.base_url, "service adapter configured");
    Ok(BoxServiceAdapter::new(OpenAiCompatibleAdapter::new(compat)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: AdapterProvider, base_url: Option<&str>) -> AdapterConfig {
        AdapterConfig {
            provider,
            base_url: base_url.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn openai_requires_api_key() {
        let err = create_service_adapter(&config(AdapterProvider::OpenAi, None), None).unwrap_err();
        assert!(matches!(err, AdapterError::AuthenticationFailed));
    }

    #[test]
    fn unify_adapter_is_named_unify() {
        let adapter = create_service_adapter(
            &config(AdapterProvider::Unify, None),
            Some(SecretString::from("unify-key".to_string())),
        )
        .unwrap();
        assert_eq!(adapter.name(), "unify");
    }

    #[test]
    fn custom_requires_base_url() {
        let err = create_service_adapter(&config(AdapterProvider::Custom, None), None).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidRequest(_)));

        let adapter = create_service_adapter(
            &config(AdapterProvider::Custom, Some("http://localhost:11434/v1")),
            None,
        )
        .unwrap();
        assert_eq!(adapter.name(), "custom");
    }
}
