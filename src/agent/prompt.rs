use super::{AgentInvoker, Persona, Query};
use crate::error::Result;
use crate::llm::CompletionService;
use serde::Serialize;

/// An agent defined by nothing but a system prompt.
pub struct PromptAgent<S> {
    invoker: AgentInvoker<S>,
    system_prompt: Persona,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub output: String,
}

impl<S: CompletionService> PromptAgent<S> {
    pub fn new(service: S, system_prompt: Persona) -> Self {
        Self {
            invoker: AgentInvoker::new(service),
            system_prompt,
        }
    }

    pub fn system_prompt(&self) -> &Persona {
        &self.system_prompt
    }

    pub async fn run(&self, query: &Query) -> Result<RunResult> {
        let answer = self.invoker.respond(&self.system_prompt, query).await?;
        Ok(RunResult {
            output: answer.into_string(),
        })
    }
}
