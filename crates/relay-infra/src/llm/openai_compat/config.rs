//! Configuration and per-provider defaults for OpenAI-compatible backends.

use secrecy::SecretString;

/// Configuration for an [`super::OpenAiCompatibleAdapter`].
///
/// No `Debug`: the API key must never end up in logs.
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g., "openai", "unify").
    pub provider_name: String,
    /// Base URL up to and excluding `/chat/completions`.
    pub base_url: String,
    /// Sent as a bearer token when present.
    pub api_key: Option<SecretString>,
    /// Default model; a forwarded model overrides it per request.
    pub model: String,
}

/// OpenAI: `https://api.openai.com/v1`.
pub fn openai_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: "https://api.openai.com/v1".into(),
        api_key: Some(api_key),
        model: model.into(),
    }
}

/// Unify router: `https://api.unify.ai/v0`.
///
/// Model names carry the routed provider, e.g. `llama-3-8b-chat@fireworks-ai`.
pub fn unify_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "unify".into(),
        base_url: "https://api.unify.ai/v0".into(),
        api_key: Some(api_key),
        model: model.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_openai_defaults() {
        let config = openai_defaults(SecretString::from("sk-test".to_string()), "gpt-4o");
        assert_eq!(config.provider_name, "openai");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.api_key.unwrap().expose_secret(), "sk-test");
    }

    #[test]
    fn test_unify_defaults() {
        let config = unify_defaults(
            SecretString::from("unify-key".to_string()),
            "llama-3-8b-chat@fireworks-ai",
        );
        assert_eq!(config.provider_name, "unify");
        assert_eq!(config.base_url, "https://api.unify.ai/v0");
        assert_eq!(config.model, "llama-3-8b-chat@fireworks-ai");
    }
}
