//! Text-generation service clients.
//!
//! The enrichment adapter talks to the model only through [`LlmClient`];
//! concrete providers are picked at startup by [`create_llm_client`].

mod client;
mod ollama;
mod openai;

pub use client::{CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmUsage};
pub use ollama::OllamaClient;
pub use openai::OpenAiCompatibleClient;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{LlmConfig, LlmProvider};

/// Build the configured client. `api_key` is the already resolved credential.
pub fn create_llm_client(
    config: &LlmConfig,
    api_key: Option<String>,
) -> Result<Arc<dyn LlmClient>, LlmError> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let api_base = || {
        config
            .api_base
            .clone()
            .ok_or_else(|| LlmError::NotConfigured("llm.api_base".to_string()))
    };

    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::AzureOpenAi => {
            let key = api_key.ok_or_else(|| LlmError::NotConfigured(config.api_key_env.clone()))?;
            Arc::new(OpenAiCompatibleClient::azure(
                &api_base()?,
                config.model.clone(),
                &config.api_version,
                key,
                timeout,
            )?)
        }
        LlmProvider::OpenAi => Arc::new(OpenAiCompatibleClient::openai(
            &api_base()?,
            config.model.clone(),
            api_key,
            timeout,
        )?),
        LlmProvider::Ollama => {
            let client = OllamaClient::new(config.model.clone(), timeout)?;
            match &config.api_base {
                Some(base) => Arc::new(client.with_api_base(base.clone())),
                None => Arc::new(client),
            }
        }
    };

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm_config(provider: LlmProvider, api_base: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider,
            model: "gpt-4o".to_string(),
            api_base: api_base.map(str::to_string),
            api_version: "2024-10-21".to_string(),
            api_key_env: "AOAI_API_KEY".to_string(),
            request_timeout_secs: 30,
            max_tokens: 5000,
            temperature: 0.1,
        }
    }

    #[test]
    fn test_azure_requires_key() {
        let config = llm_config(LlmProvider::AzureOpenAi, Some("https://x.openai.azure.com"));
        let result = create_llm_client(&config, None);
        assert!(matches!(result, Err(LlmError::NotConfigured(name)) if name == "AOAI_API_KEY"));

        let client = create_llm_client(&config, Some("k".to_string())).unwrap();
        assert_eq!(client.provider(), "azure_openai");
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let config = llm_config(LlmProvider::Ollama, None);
        let client = create_llm_client(&config, None).unwrap();
        assert_eq!(client.provider(), "ollama");
        assert_eq!(client.model(), "gpt-4o");
    }

    #[test]
    fn test_openai_requires_api_base() {
        let config = llm_config(LlmProvider::OpenAi, None);
        assert!(matches!(
            create_llm_client(&config, None),
            Err(LlmError::NotConfigured(_))
        ));
    }
}
