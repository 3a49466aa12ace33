//! Role-playing agent with a single task.
//!
//! The agent's role, goal and backstory become the system prompt; the task
//! description and expected output become the user message. Kickoff inputs
//! fill `{key}` placeholders in any of those fields. Inputs that no
//! placeholder consumed are appended as a context block so they still reach
//! the model.

use super::{AgentInvoker, Persona, Query};
use crate::error::Result;
use crate::llm::CompletionService;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrewAgent {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrewTask {
    pub description: String,
    pub expected_output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrewOutput {
    pub raw: String,
}

pub struct Crew<S> {
    invoker: AgentInvoker<S>,
    agent: CrewAgent,
    task: CrewTask,
}

impl<S: CompletionService> Crew<S> {
    pub fn new(service: S, agent: CrewAgent, task: CrewTask) -> Self {
        Self {
            invoker: AgentInvoker::new(service),
            agent,
            task,
        }
    }

    pub async fn kickoff(&self, inputs: &BTreeMap<String, String>) -> Result<CrewOutput> {
        let (persona, query) = build_prompts(&self.agent, &self.task, inputs)?;
        info!(role = %self.agent.role, "crew kickoff");
        let answer = self.invoker.respond(&persona, &query).await?;
        Ok(CrewOutput {
            raw: answer.into_string(),
        })
    }
}

/// Render the system prompt and task prompt for one kickoff.
pub fn build_prompts(
    agent: &CrewAgent,
    task: &CrewTask,
    inputs: &BTreeMap<String, String>,
) -> Result<(Persona, Query)> {
    let mut used = BTreeSet::new();
    let role = interpolate(&agent.role, inputs, &mut used);
    let goal = interpolate(&agent.goal, inputs, &mut used);
    let backstory = interpolate(&agent.backstory, inputs, &mut used);
    let description = interpolate(&task.description, inputs, &mut used);
    let expected_output = interpolate(&task.expected_output, inputs, &mut used);

    let persona = Persona::new(format!(
        "You are {role}. {backstory}\nYour personal goal is: {goal}"
    ))?;

    let mut prompt = format!(
        "Current Task: {description}\n\n\
         This is the expected criteria for your final answer: {expected_output}\n\
         you MUST return the actual complete content as the final answer, not a summary."
    );

    let unused: Vec<_> = inputs
        .iter()
        .filter(|(key, _)| !used.contains(key.as_str()))
        .collect();
    if !unused.is_empty() {
        prompt.push_str("\n\nContext:");
        for (key, value) in unused {
            prompt.push_str(&format!("\n{key}: {value}"));
        }
    }

    Ok((persona, Query::new(prompt)?))
}

/// Replace `{key}` tokens of `template` with their values in one pass,
/// recording which keys matched. Inserted values are never re-scanned.
fn interpolate<'a>(
    template: &str,
    inputs: &'a BTreeMap<String, String>,
    used: &mut BTreeSet<&'a str>,
) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        result.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(['{', '}']) {
            Some(close) if after.as_bytes()[close] == b'}' => {
                let name = &after[..close];
                match inputs.get_key_value(name) {
                    Some((key, value)) => {
                        result.push_str(value);
                        used.insert(key.as_str());
                    }
                    None => {
                        result.push('{');
                        result.push_str(name);
                        result.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                result.push('{');
                rest = after;
            }
        }
    }
    result.push_str(rest);
    result
}
