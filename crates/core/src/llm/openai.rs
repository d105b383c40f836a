//! OpenAI chat-completions client, usable against Azure OpenAI deployments
//! and OpenAI-compatible endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::client::{
    map_reqwest_error, CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmUsage,
};

#[derive(Debug, Clone)]
enum ApiAuth {
    /// Azure `api-key` header
    AzureKey(String),
    /// `Authorization: Bearer` header
    Bearer(String),
    None,
}

/// Chat-completions client.
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    provider: &'static str,
    url: String,
    auth: ApiAuth,
    model: String,
    /// Azure addresses the model through the URL, not the body.
    send_model: bool,
    timeout: Duration,
}

impl OpenAiCompatibleClient {
    /// Client for an Azure OpenAI deployment.
    pub fn azure(
        endpoint: &str,
        deployment: impl Into<String>,
        api_version: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let deployment = deployment.into();
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint.trim_end_matches('/'),
            urlencoding::encode(&deployment),
            urlencoding::encode(api_version)
        );
        Ok(Self {
            client: build_http_client(timeout)?,
            provider: "azure_openai",
            url,
            auth: ApiAuth::AzureKey(api_key.into()),
            model: deployment,
            send_model: false,
            timeout,
        })
    }

    /// Client for OpenAI or any endpoint speaking the same protocol.
    pub fn openai(
        api_base: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let base = api_base.trim_end_matches('/');
        let url = if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        };
        Ok(Self {
            client: build_http_client(timeout)?,
            provider: "openai",
            url,
            auth: api_key.map(ApiAuth::Bearer).unwrap_or(ApiAuth::None),
            model: model.into(),
            send_model: true,
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_body(&self, request: CompletionRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt,
        });

        ChatRequest {
            model: self.send_model.then(|| self.model.clone()),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: 1.0,
            response_format: request.json_output.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Http(e.to_string()))
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn provider(&self) -> &str {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.build_body(request);

        let mut builder = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .json(&body);
        builder = match &self.auth {
            ApiAuth::AzureKey(key) => builder.header("api-key", key),
            ApiAuth::Bearer(key) => builder.bearer_auth(key),
            ApiAuth::None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        let status = response.status().as_u16();

        if status != 200 {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(LlmError::Api { status, message });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Json(e.to_string()))?;

        let text = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        let usage = chat_response
            .usage
            .map(|u| LlmUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            text,
            usage,
            model: chat_response.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}
