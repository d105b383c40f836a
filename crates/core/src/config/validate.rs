use super::{
    types::{Config, LlmProvider},
    ConfigError,
};

/// Validate configuration
/// Currently validates:
/// - Worker count and call timeout are positive
/// - An explicit window reaches back at least one day
/// - The LLM section names a model and, for hosted providers, an endpoint
/// - Temperatures are within 0.0-2.0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.enrichment.workers == 0 {
        return Err(ConfigError::ValidationError(
            "enrichment.workers must be at least 1".to_string(),
        ));
    }

    if config.enrichment.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "enrichment.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.window.days_back == Some(0) {
        return Err(ConfigError::ValidationError(
            "window.days_back must be at least 1".to_string(),
        ));
    }

    if config.llm.model.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "llm.model cannot be empty".to_string(),
        ));
    }

    if config.llm.provider != LlmProvider::Ollama && config.llm.api_base.is_none() {
        return Err(ConfigError::ValidationError(format!(
            "llm provider {:?} requires api_base",
            config.llm.provider
        )));
    }

    for (name, value) in [
        ("llm.temperature", config.llm.temperature),
        (
            "enrichment.summary_temperature",
            config.enrichment.summary_temperature,
        ),
    ] {
        if !(0.0..=2.0).contains(&value) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between 0.0 and 2.0, got {}",
                name, value
            )));
        }
    }

    if config.output.file_prefix.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "output.file_prefix cannot be empty".to_string(),
        ));
    }

    Ok(())
}
