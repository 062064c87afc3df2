//! Provider credentials and endpoints
//!
//! Missing credentials are not an error when loading; they surface as
//! [`ClientError::Configuration`] on the first call that needs them.

use crate::error::ClientError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_REPLICATE_BASE_URL: &str = "https://api.replicate.com/v1";

/// Credentials and base URLs for every supported provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub replicate_api_token: Option<String>,
    pub replicate_base_url: String,
}

impl ProviderConfig {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - OPENAI_API_KEY (needed for OpenAI jobs)
    /// - REPLICATE_API_TOKEN (needed for Replicate jobs)
    /// - OPENAI_BASE_URL (optional, default: https://api.openai.com/v1)
    /// - REPLICATE_BASE_URL (optional, default: https://api.replicate.com/v1)
    pub fn from_env() -> Self {
        Self {
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            openai_base_url: non_empty_var("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            replicate_api_token: non_empty_var("REPLICATE_API_TOKEN"),
            replicate_base_url: non_empty_var("REPLICATE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_REPLICATE_BASE_URL.to_string()),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            replicate_api_token: None,
            replicate_base_url: DEFAULT_REPLICATE_BASE_URL.to_string(),
        }
    }
}

pub(crate) fn missing_credential(var: &str) -> ClientError {
    ClientError::Configuration(format!("Server is missing {var} configuration."))
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_message() {
        let err = missing_credential("OPENAI_API_KEY");
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "Server is missing OPENAI_API_KEY configuration.");
    }

    #[test]
    fn test_defaults_have_no_credentials() {
        let config = ProviderConfig::default();
        assert!(config.openai_api_key.is_none());
        assert!(config.replicate_api_token.is_none());
        assert_eq!(config.openai_base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.replicate_base_url, DEFAULT_REPLICATE_BASE_URL);
    }
}
