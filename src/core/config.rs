use std::env;
use std::error::Error;
use std::fmt;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// Runtime configuration for one chat session.
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Config {
    /// Build a config from the environment plus CLI-provided overrides.
    pub fn from_env(model: String, max_tokens: u32) -> Result<Self, Box<dyn Error>> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            "OPENAI_API_KEY environment variable not set\n\n\
             Set your API key first:\n\
             export OPENAI_API_KEY=\"your-api-key-here\"\n\n\
             Optionally point at a different endpoint:\n\
             export OPENAI_BASE_URL=\"https://api.openai.com/v1\""
        })?;

        let base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            api_key,
            base_url,
            model,
            max_tokens,
        })
    }
}

// The credential is opaque and must stay out of logs and debug dumps.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_the_credential() {
        let config = Config {
            api_key: "sk-secret".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        };
        let dump = format!("{config:?}");
        assert!(!dump.contains("sk-secret"));
        assert!(dump.contains("<redacted>"));
    }
}
