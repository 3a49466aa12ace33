use crate::error::{Error, Result};
use crate::llm::Provider;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub crew: CrewConfig,
    #[serde(default)]
    pub graph: GraphConfig,
}

#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: Provider,
    /// Falls back to the provider's default model when unset.
    pub model: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Fail before any request when the credential is missing.
    #[serde(default)]
    pub require_api_key: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            max_tokens: default_max_tokens(),
            api_key_env: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
            require_api_key: false,
        }
    }
}

/// Persona and question for the plain single-prompt agent.
#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_persona")]
    pub persona: String,
    #[serde(default = "default_query")]
    pub query: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            persona: default_persona(),
            query: default_query(),
        }
    }
}

/// Role-playing agent plus its single task.
#[derive(Debug, Deserialize)]
pub struct CrewConfig {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default = "default_goal")]
    pub goal: String,
    #[serde(default = "default_backstory")]
    pub backstory: String,
    #[serde(default = "default_task")]
    pub task: String,
    #[serde(default = "default_expected_output")]
    pub expected_output: String,
    #[serde(default = "default_crew_question")]
    pub question: String,
}

impl Default for CrewConfig {
    fn default() -> Self {
        Self {
            role: default_role(),
            goal: default_goal(),
            backstory: default_backstory(),
            task: default_task(),
            expected_output: default_expected_output(),
            question: default_crew_question(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_graph_prompt")]
    pub prompt: String,
    #[serde(default = "default_graph_question")]
    pub question: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            prompt: default_graph_prompt(),
            question: default_graph_question(),
        }
    }
}

// Defaults
fn default_max_tokens() -> u32 {
    1024
}
fn default_timeout_secs() -> u64 {
    180
}
fn default_persona() -> String {
    "You are a friendly sales assistant.".into()
}
fn default_query() -> String {
    "Do you have any current promotions on laptops?".into()
}
fn default_role() -> String {
    "Sales Assistant".into()
}
fn default_goal() -> String {
    "Help customers with sales-related questions in a friendly tone".into()
}
fn default_backstory() -> String {
    "Experienced in retail and customer service".into()
}
fn default_task() -> String {
    "Answer the customer's question helpfully".into()
}
fn default_expected_output() -> String {
    "A helpful, accurate answer".into()
}
fn default_crew_question() -> String {
    "Do you offer discounts on bulk orders?".into()
}
fn default_graph_prompt() -> String {
    "You are a helpful sales assistant".into()
}
fn default_graph_question() -> String {
    "What is your return policy?".into()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config {}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| Error::config(format!("Failed to parse config: {e}")))
    }

    /// Like [`Config::load`], but a missing file yields the built-in defaults.
    pub fn load_optional(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

impl LlmConfig {
    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().into())
    }

    pub fn api_key_env(&self) -> String {
        self.api_key_env
            .clone()
            .unwrap_or_else(|| self.provider.default_api_key_env().into())
    }

    pub fn credential_policy(&self) -> CredentialPolicy {
        if self.require_api_key {
            CredentialPolicy::Required
        } else {
            CredentialPolicy::Deferred
        }
    }

    /// Apply CLI overrides. Switching provider without naming a model drops the
    /// configured model so the new provider's default is used.
    pub fn apply_override(&mut self, provider: Option<Provider>, model: Option<String>) {
        if let Some(provider) = provider {
            if provider != self.provider {
                self.model = None;
            }
            self.provider = provider;
        }
        if let Some(model) = model {
            self.model = Some(model);
        }
    }

    pub fn resolve_api_key(&self, policy: CredentialPolicy) -> Result<Option<ApiKey>> {
        self.resolve_api_key_with(policy, |var| std::env::var(var).ok())
    }

    /// Resolve the credential through `lookup` instead of the process environment.
    pub fn resolve_api_key_with<F>(
        &self,
        policy: CredentialPolicy,
        lookup: F,
    ) -> Result<Option<ApiKey>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = self.api_key_env();
        let key = lookup(&var).and_then(ApiKey::new);
        match (key, policy) {
            (Some(key), _) => Ok(Some(key)),
            (None, CredentialPolicy::Required) => Err(Error::config(format!(
                "{var} not found in environment variables. Please check your .env file."
            ))),
            (None, CredentialPolicy::Deferred) => Ok(None),
        }
    }
}

/// What to do when the credential variable is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialPolicy {
    /// Stop with a configuration error before any network activity.
    Required,
    /// Send the request unauthenticated and let the service reject it.
    Deferred,
}

/// API credential. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for empty or whitespace-only values.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}
