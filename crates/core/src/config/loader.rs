use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides.
///
/// Nested keys are addressed with a double underscore, e.g.
/// `AIPRO_NEWS_ENRICHMENT__WORKERS=4`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("AIPRO_NEWS_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmProvider;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[database]
path = "news.db"

[llm]
provider = "azure_open_ai"
model = "gpt-4o"
api_base = "https://example.openai.azure.com"
"#;

    #[test]
    fn test_load_config_from_str_applies_defaults() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::AzureOpenAi);
        assert_eq!(config.llm.api_key_env, "AOAI_API_KEY");
        assert_eq!(config.enrichment.workers, 8);
        assert_eq!(config.enrichment.timeout_secs, 60);
        assert_eq!(config.enrichment.summary_max_tokens, 500);
        assert!(config.window.days_back.is_none());
        assert!(config.output.utf8_bom);
        assert_eq!(config.logging.level, "info");
        assert!(config.metrics.textfile.is_none());
    }

    #[test]
    fn test_load_config_from_str_missing_llm() {
        let toml = r#"
[database]
path = "news.db"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"{MINIMAL}
[enrichment]
workers = 3
timeout_secs = 15

[window]
days_back = 5
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.enrichment.workers, 3);
        assert_eq!(config.enrichment.timeout_secs, 15);
        assert_eq!(config.window.days_back, Some(5));
    }
}
