//! Prompt templates for the enrichment tasks.
//!
//! Templates use two placeholders: `{json_schema}` for the single-field
//! schema of the task and `{news_text}` for the article body.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::TaskKind;

const SYSTEM_FILE: &str = "system_financial_tagger.txt";
const EXTRACT_TAG_FILE: &str = "extract_stock_target.txt";
const SUMMARIZE_FILE: &str = "summarize_news.txt";

const DEFAULT_SYSTEM: &str = "你是一個金融文件標籤模型，負責將「新聞、投顧報告」轉換成固定json結構，請務必遵守json schema格式回覆，不可加入額外文字及註解。";

const DEFAULT_EXTRACT_TAG: &str = r#"嚴格遵守以下規格:依照以下json schema產出，確保可自動化執行，只回傳所需資訊。
json schema規格如下:
{json_schema}

以下為新聞原文:
{news_text}

1.股票標的:
  -回傳格式限定於「公司行號 or 股票標的、4碼數字」，格式統一為「文字(4碼數字)」
  -若報告提及多檔標的，只留一檔最主要的「公司行號 or 股票標的、4碼數字」
  -若股票名稱中有股份有限公司直接刪除
  -若未提及所需公司行號 or 股票標的，則顯示「無」"#;

const DEFAULT_SUMMARIZE: &str = r#"嚴格遵守以下規格:依照以下json schema產出，確保可自動化執行，只回傳所需資訊，字數約100字~150字。
json schema規格如下:
{json_schema}

以下為新聞原文:
{news_text}

幫我自新聞原文進行摘要。"#;

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Failed to read prompt {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Prompt {} does not contain the {{news_text}} placeholder", .path.display())]
    MissingPlaceholder { path: PathBuf },
}

/// System prompt plus one user template per task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    system: String,
    extract_tag: String,
    summarize: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM.to_string(),
            extract_tag: DEFAULT_EXTRACT_TAG.to_string(),
            summarize: DEFAULT_SUMMARIZE.to_string(),
        }
    }
}

impl PromptSet {
    /// Load overrides from `dir`; files that don't exist keep the built-in text.
    pub fn from_dir(dir: &Path) -> Result<Self, PromptError> {
        let mut prompts = Self::default();
        if let Some(system) = read_optional(&dir.join(SYSTEM_FILE), false)? {
            prompts.system = system;
        }
        if let Some(template) = read_optional(&dir.join(EXTRACT_TAG_FILE), true)? {
            prompts.extract_tag = template;
        }
        if let Some(template) = read_optional(&dir.join(SUMMARIZE_FILE), true)? {
            prompts.summarize = template;
        }
        Ok(prompts)
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    /// Render the user prompt for `task` over `news_text`.
    pub fn render(&self, task: TaskKind, news_text: &str) -> String {
        let template = match task {
            TaskKind::ExtractTag => &self.extract_tag,
            TaskKind::Summarize => &self.summarize,
        };
        // Article text goes in last so its own braces are never substituted.
        template
            .replace("{json_schema}", &task.json_schema())
            .replace("{news_text}", news_text)
    }
}

fn read_optional(path: &Path, needs_text: bool) -> Result<Option<String>, PromptError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            if needs_text && !content.contains("{news_text}") {
                return Err(PromptError::MissingPlaceholder {
                    path: path.to_path_buf(),
                });
            }
            info!(path = %path.display(), "Loaded prompt override");
            Ok(Some(content))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No prompt override, using built-in");
            Ok(None)
        }
        Err(source) => Err(PromptError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
