//! Single-turn agent invocation: persona + query → one completion call → answer.

pub mod crew;
pub mod graph;
pub mod prompt;

use crate::error::{Error, Result};
use crate::llm::{Completion, CompletionRequest, CompletionService};
use std::fmt;
use tracing::{debug, warn};

/// System-level instruction describing the assistant's role and tone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona(String);

/// The end-user's question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Persona {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        non_empty(text.into(), "persona").map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Query {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        non_empty(text.into(), "query").map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn non_empty(text: String, what: &str) -> Result<String> {
    if text.trim().is_empty() {
        Err(Error::config(format!("{what} must not be empty")))
    } else {
        Ok(text)
    }
}

/// Text generated by the model, passed through untouched, plus the model
/// name the service reported for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    text: String,
    model: String,
}

impl Answer {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl From<Completion> for Answer {
    fn from(completion: Completion) -> Self {
        Self {
            text: completion.text,
            model: completion.model,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Performs exactly one request/response exchange per [`respond`](Self::respond).
///
/// Errors from the service are returned as-is: no retry, no fallback.
pub struct AgentInvoker<S> {
    service: S,
}

impl<S: CompletionService> AgentInvoker<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub async fn respond(&self, persona: &Persona, query: &Query) -> Result<Answer> {
        let request = CompletionRequest {
            system: persona.as_str().to_owned(),
            user: query.as_str().to_owned(),
        };
        debug!(
            model = self.service.model(),
            persona_len = request.system.len(),
            query_len = request.user.len(),
            "invoking agent"
        );

        match self.service.complete(&request).await {
            Ok(completion) => Ok(Answer::from(completion)),
            Err(e) => {
                warn!(kind = ?e.kind(), "agent invocation failed: {e}");
                Err(e)
            }
        }
    }
}
