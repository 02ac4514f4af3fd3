use serde::{Deserialize, Serialize};

// Endpoints on these hosts reject unauthenticated calls, so a missing key is
// a configuration error rather than a call failure.
const HOSTED_PROVIDER_HOSTS: [&str; 4] = [
    "openai.com",
    "anthropic.com",
    "openrouter.ai",
    "groq.com",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("No endpoint configured. Open Settings and set a base URL.".to_string());
        }
        if self.model.trim().is_empty() {
            return Err("No model configured. Open Settings and set a model name.".to_string());
        }
        if self.api_key.trim().is_empty() && self.requires_api_key() {
            return Err(format!(
                "The endpoint at {} requires an API key. Open Settings and set one.",
                self.base_url.trim()
            ));
        }
        Ok(())
    }

    pub fn requires_api_key(&self) -> bool {
        let lowered = self.base_url.to_ascii_lowercase();
        HOSTED_PROVIDER_HOSTS
            .iter()
            .any(|host| lowered.contains(host))
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;

    fn settings(base_url: &str, model: &str, api_key: &str) -> Settings {
        Settings {
            base_url: base_url.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    #[test]
    fn validate_rejects_blank_endpoint() {
        let error = settings("  ", "gpt-4o-mini", "sk-test")
            .validate()
            .expect_err("blank endpoint should be rejected");
        assert!(error.contains("base URL"));
    }

    #[test]
    fn validate_rejects_blank_model() {
        let error = settings("http://localhost:8080/v1", "", "")
            .validate()
            .expect_err("blank model should be rejected");
        assert!(error.contains("model"));
    }

    #[test]
    fn validate_requires_key_for_hosted_provider() {
        let error = settings("https://api.openai.com/v1", "gpt-4o-mini", "")
            .validate()
            .expect_err("hosted provider without key should be rejected");
        assert!(error.contains("API key"));
    }

    #[test]
    fn validate_allows_local_endpoint_without_key() {
        settings("http://localhost:8080/v1", "qwen3", "")
            .validate()
            .expect("local endpoint without key should validate");
    }

    #[test]
    fn validate_accepts_hosted_provider_with_key() {
        settings("https://openrouter.ai/api/v1", "mistral-small", "or-key")
            .validate()
            .expect("hosted provider with key should validate");
    }
}
