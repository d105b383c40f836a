//! Command-line arguments.

use std::path::PathBuf;

use aipro_news_core::Config;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "aipro-news")]
#[command(about = "Tag and summarize yesterday's financial news with an LLM")]
#[command(version)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "AIPRO_NEWS_CONFIG", default_value = "config/config.toml")]
    pub config: PathBuf,

    /// Dotenv file holding credentials
    #[arg(long, default_value = "config/.env")]
    pub env_file: PathBuf,

    /// Start the window this many days before today (overrides the Monday rule)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub days_back: Option<u32>,

    /// Concurrent enrichment calls
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Per-call timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl Cli {
    /// Command-line values win over file and environment.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(days_back) = self.days_back {
            config.window.days_back = Some(days_back);
        }
        if let Some(workers) = self.workers {
            config.enrichment.workers = workers;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.enrichment.timeout_secs = timeout_secs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aipro_news_core::load_config_from_str;

    fn config() -> Config {
        load_config_from_str(
            r#"
[database]
path = "news.db"

[llm]
provider = "ollama"
model = "qwen2.5"

[enrichment]
workers = 4
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["aipro-news"]).unwrap();
        assert_eq!(cli.env_file, PathBuf::from("config/.env"));
        assert!(cli.days_back.is_none());
        assert!(cli.workers.is_none());
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let cli = Cli::try_parse_from([
            "aipro-news",
            "--days-back",
            "5",
            "--workers",
            "16",
            "--timeout-secs",
            "30",
        ])
        .unwrap();
        let mut config = config();

        cli.apply_overrides(&mut config);

        assert_eq!(config.window.days_back, Some(5));
        assert_eq!(config.enrichment.workers, 16);
        assert_eq!(config.enrichment.timeout_secs, 30);
    }

    #[test]
    fn test_absent_overrides_keep_config() {
        let cli = Cli::try_parse_from(["aipro-news", "--config", "other.toml"]).unwrap();
        let mut config = config();

        cli.apply_overrides(&mut config);

        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert_eq!(config.enrichment.workers, 4);
        assert_eq!(config.enrichment.timeout_secs, 60);
    }

    #[test]
    fn test_zero_days_back_is_rejected() {
        assert!(Cli::try_parse_from(["aipro-news", "--days-back", "0"]).is_err());
    }
}
