//! Message-state agent: takes a list of messages, answers the latest user
//! message under a fixed prompt, and returns the state with the reply appended.

use super::{AgentInvoker, Persona, Query};
use crate::error::{Error, Result};
use crate::llm::CompletionService;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            model: None,
        }
    }
}

/// Full envelope returned by [`GraphAgent::invoke`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphState {
    pub messages: Vec<Message>,
}

impl GraphState {
    pub fn with_user_message(content: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(content)],
        }
    }

    /// Text of the last assistant message, if any.
    pub fn last_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }
}

pub struct GraphAgent<S> {
    invoker: AgentInvoker<S>,
    prompt: Persona,
}

impl<S: CompletionService> GraphAgent<S> {
    pub fn new(service: S, prompt: Persona) -> Self {
        Self {
            invoker: AgentInvoker::new(service),
            prompt,
        }
    }

    /// Only the most recent user message is sent; earlier history is carried
    /// through to the output unchanged.
    pub async fn invoke(&self, mut state: GraphState) -> Result<GraphState> {
        let question = state
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .ok_or_else(|| Error::config("graph state has no user message"))?;
        let query = Query::new(question.content.clone())?;

        let answer = self.invoker.respond(&self.prompt, &query).await?;
        let model = answer.model().to_string();
        state.messages.push(Message {
            role: Role::Assistant,
            content: answer.into_string(),
            model: Some(model),
        });
        Ok(state)
    }
}
