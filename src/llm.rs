use crate::config::{ApiKey, CredentialPolicy, LlmConfig};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// LLM provider — determines API format and endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI or any OpenAI-compatible API (together.ai, local ollama, etc.)
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    OpenRouter,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-3.5-turbo",
            Self::Anthropic => "claude-3-5-haiku-latest",
            Self::OpenRouter => "openai/gpt-3.5-turbo",
        }
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "openrouter" => Ok(Self::OpenRouter),
            other => Err(Error::config(format!(
                "unknown provider '{other}' (expected openai, anthropic or openrouter)"
            ))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::OpenRouter => "openrouter",
        };
        f.write_str(name)
    }
}

/// One single-turn exchange: a system instruction and a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    /// Model that produced the text, as reported by the service.
    pub model: String,
}

/// Anything that can turn a [`CompletionRequest`] into text.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    fn model(&self) -> &str;
}

pub struct LlmClient {
    provider: Provider,
    api_key: Option<ApiKey>,
    model: String,
    max_tokens: u32,
    base_url: String,
    http: HttpClient,
}

// -- Anthropic format --

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Msg<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    model: Option<String>,
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    text: Option<String>,
}

// -- OpenAI-compatible format --

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Msg<'a>>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

// -- Shared --

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

impl LlmClient {
    pub fn new(
        provider: Provider,
        api_key: Option<ApiKey>,
        model: String,
        max_tokens: u32,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = HttpClient::new(
            concat!("agent-invoker/", env!("CARGO_PKG_VERSION")),
            timeout,
        )?;
        let base_url = base_url
            .unwrap_or_else(|| provider.default_base_url().into())
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            provider,
            api_key,
            model,
            max_tokens,
            base_url,
            http,
        })
    }

    /// Build from config, resolving the credential from the process environment.
    pub fn from_config(config: &LlmConfig, policy: CredentialPolicy) -> Result<Self> {
        let api_key = config.resolve_api_key(policy)?;
        Self::with_api_key(config, api_key)
    }

    /// Build from config with an already-resolved credential.
    pub fn with_api_key(config: &LlmConfig, api_key: Option<ApiKey>) -> Result<Self> {
        Self::new(
            config.provider.clone(),
            api_key,
            config.model(),
            config.max_tokens,
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn complete(&self, system: &str, user_message: &str) -> Result<Completion> {
        debug!(provider = %self.provider, model = %self.model, "sending LLM request");

        match self.provider {
            Provider::Anthropic => self.complete_anthropic(system, user_message).await,
            Provider::OpenAi | Provider::OpenRouter => {
                self.complete_openai(system, user_message).await
            }
        }
    }

    async fn complete_anthropic(&self, system: &str, user_message: &str) -> Result<Completion> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: vec![Msg {
                role: "user",
                content: user_message,
            }],
        };

        let body = serde_json::to_string(&request)
            .map_err(|e| Error::parse(format!("serialize request: {e}")))?;

        let mut headers = vec![("anthropic-version", "2023-06-01")];
        if let Some(key) = &self.api_key {
            headers.push(("x-api-key", key.expose()));
        }

        let url = format!("{}/messages", self.base_url);
        let response_text = self
            .http
            .post_json_raw(&url, &body, &headers)
            .await
            .map_err(|e| {
                warn!("Anthropic API error: {e}");
                e
            })?;

        let resp: AnthropicResponse = serde_json::from_str(&response_text)
            .map_err(|e| Error::parse(format!("parse Anthropic response: {e}")))?;

        let blocks: Vec<String> = resp.content.into_iter().filter_map(|b| b.text).collect();
        if blocks.is_empty() {
            return Err(Error::parse("no text content in Anthropic response"));
        }
        Ok(Completion {
            text: blocks.join("\n"),
            model: resp.model.unwrap_or_else(|| self.model.clone()),
        })
    }

    async fn complete_openai(&self, system: &str, user_message: &str) -> Result<Completion> {
        let request = OpenAiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user_message,
                },
            ],
        };

        let body = serde_json::to_string(&request)
            .map_err(|e| Error::parse(format!("serialize request: {e}")))?;

        let bearer = self
            .api_key
            .as_ref()
            .map(|k| format!("Bearer {}", k.expose()));
        let headers: Vec<(&str, &str)> = bearer
            .as_deref()
            .map(|b| ("Authorization", b))
            .into_iter()
            .collect();

        let url = format!("{}/chat/completions", self.base_url);
        let response_text = self
            .http
            .post_json_raw(&url, &body, &headers)
            .await
            .map_err(|e| {
                warn!("LLM API error: {e}");
                e
            })?;

        let resp: OpenAiResponse = serde_json::from_str(&response_text)
            .map_err(|e| Error::parse(format!("parse LLM response: {e}")))?;

        let model = resp.model.unwrap_or_else(|| self.model.clone());
        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| Completion { text, model })
            .ok_or_else(|| Error::parse("empty response from LLM"))
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        LlmClient::complete(self, &request.system, &request.user).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}
