//! Process configuration
//! Resolved once from the environment at startup; read-only afterwards

use crate::error::ChatError;

pub const VALYU_API_KEY: &str = "VALYU_API_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub valyu_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub mock_mode: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let (host, port) = resolve_host_and_port();
        Self {
            host,
            port,
            valyu_api_key: non_empty_env(VALYU_API_KEY),
            openai_api_key: non_empty_env(OPENAI_API_KEY),
            openai_base_url: non_empty_env("OPENAI_BASE_URL")
                .or_else(|| non_empty_env("PUBLIC_OPENAI_BASE_URL")),
            mock_mode: flag_env("MOCK_MODE"),
        }
    }

    /// Credential checks run before any network call so a misconfigured
    /// deployment fails fast with a message naming the missing key.
    pub fn require_valyu_key(&self) -> Result<&str, ChatError> {
        self.valyu_api_key
            .as_deref()
            .ok_or(ChatError::MissingCredential(VALYU_API_KEY))
    }

    pub fn require_openai_key(&self) -> Result<&str, ChatError> {
        self.openai_api_key
            .as_deref()
            .ok_or(ChatError::MissingCredential(OPENAI_API_KEY))
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn flag_env(name: &str) -> bool {
    matches!(
        non_empty_env(name).map(|value| value.to_ascii_lowercase()).as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

fn resolve_host_and_port() -> (String, u16) {
    let host = non_empty_env("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let port = non_empty_env("PORT")
        .and_then(|value| value.parse().ok())
        .unwrap_or(3001);
    (host, port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;

    fn config_without_keys() -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 3001,
            valyu_api_key: None,
            openai_api_key: None,
            openai_base_url: None,
            mock_mode: false,
        }
    }

    #[test]
    fn missing_keys_name_the_credential() {
        let config = config_without_keys();
        assert!(matches!(
            config.require_valyu_key(),
            Err(ChatError::MissingCredential(VALYU_API_KEY))
        ));
        assert!(matches!(
            config.require_openai_key(),
            Err(ChatError::MissingCredential(OPENAI_API_KEY))
        ));
    }

    #[test]
    fn present_keys_pass_through() {
        let mut config = config_without_keys();
        config.valyu_api_key = Some("vk-test".to_string());
        assert_eq!(config.require_valyu_key().unwrap(), "vk-test");
    }
}
