use agent_invoker::agent::crew::{Crew, CrewAgent, CrewTask};
use agent_invoker::agent::graph::{GraphAgent, GraphState, Message, Role};
use agent_invoker::agent::prompt::PromptAgent;
use agent_invoker::agent::{AgentInvoker, Persona, Query};
use agent_invoker::error::{Error, ErrorKind, Result};
use agent_invoker::llm::{Completion, CompletionRequest, CompletionService};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Records every request and answers with a canned reply or failure.
#[derive(Clone)]
struct RecordingService {
    reply: Option<String>,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl RecordingService {
    fn answering(reply: &str) -> Self {
        Self {
            reply: Some(reply.into()),
            calls: Arc::default(),
        }
    }

    fn failing() -> Self {
        Self {
            reply: None,
            calls: Arc::default(),
        }
    }

    fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for RecordingService {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        self.calls.lock().unwrap().push(request.clone());
        match &self.reply {
            Some(text) => Ok(Completion {
                text: text.clone(),
                model: "fake-model-2024-06".into(),
            }),
            None => Err(Error::api_with_status(
                "api.openai.com",
                "You exceeded your current quota",
                429,
            )),
        }
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

#[tokio::test]
async fn respond_sends_one_request_with_both_strings() {
    let service = RecordingService::answering("Yes, 10% off all laptops this week.");
    let invoker = AgentInvoker::new(service.clone());

    let persona = Persona::new("You are a friendly sales assistant.").unwrap();
    let query = Query::new("Do you have any current promotions on laptops?").unwrap();
    let answer = invoker.respond(&persona, &query).await.unwrap();

    assert_eq!(answer.as_str(), "Yes, 10% off all laptops this week.");
    assert_eq!(answer.model(), "fake-model-2024-06");
    let calls = service.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].system, "You are a friendly sales assistant.");
    assert_eq!(calls[0].user, "Do you have any current promotions on laptops?");
}

#[tokio::test]
async fn answer_is_not_transformed() {
    let raw = "  Line one\n\n**Line two**  \n";
    let service = RecordingService::answering(raw);
    let agent = PromptAgent::new(service, Persona::new("p").unwrap());

    let result = agent.run(&Query::new("q").unwrap()).await.unwrap();
    assert_eq!(result.output, raw);
}

#[tokio::test]
async fn service_failure_is_returned_without_retry() {
    let service = RecordingService::failing();
    let invoker = AgentInvoker::new(service.clone());

    let err = invoker
        .respond(&Persona::new("p").unwrap(), &Query::new("q").unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Service);
    assert_eq!(err.status_code(), Some(429));
    assert_eq!(service.calls().len(), 1);
}

#[tokio::test]
async fn various_inputs_reach_the_service_verbatim() {
    let cases = [
        ("You are terse.", "Price?"),
        ("Réponds en français.", "Avez-vous des promotions ?"),
        ("Use \"quotes\" and {braces}", "Line1\nLine2\ttab"),
        ("販売アシスタント", "ノートパソコンのセールはありますか？"),
    ];
    for (persona, query) in cases {
        let service = RecordingService::answering("ok");
        let invoker = AgentInvoker::new(service.clone());
        invoker
            .respond(&Persona::new(persona).unwrap(), &Query::new(query).unwrap())
            .await
            .unwrap();
        let calls = service.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system, persona);
        assert_eq!(calls[0].user, query);
    }
}

#[tokio::test]
async fn crew_kickoff_sends_question_and_returns_raw() {
    let service = RecordingService::answering("Yes, orders over 50 units get 15% off.");
    let crew = Crew::new(
        service.clone(),
        CrewAgent {
            role: "Sales Assistant".into(),
            goal: "Help customers with sales-related questions in a friendly tone".into(),
            backstory: "Experienced in retail and customer service".into(),
        },
        CrewTask {
            description: "Answer the customer's question helpfully".into(),
            expected_output: "A helpful, accurate answer".into(),
        },
    );
    let inputs = BTreeMap::from([(
        "question".to_string(),
        "Do you offer discounts on bulk orders?".to_string(),
    )]);

    let output = crew.kickoff(&inputs).await.unwrap();

    assert_eq!(output.raw, "Yes, orders over 50 units get 15% off.");
    let calls = service.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].system.starts_with("You are Sales Assistant."));
    assert!(calls[0].user.contains("Do you offer discounts on bulk orders?"));
}

#[tokio::test]
async fn graph_appends_assistant_reply() {
    let service = RecordingService::answering("Returns are accepted within 30 days.");
    let agent = GraphAgent::new(
        service.clone(),
        Persona::new("You are a helpful sales assistant").unwrap(),
    );

    let state = agent
        .invoke(GraphState::with_user_message("What is your return policy?"))
        .await
        .unwrap();

    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[0], Message::user("What is your return policy?"));
    assert_eq!(state.messages[1].role, Role::Assistant);
    assert_eq!(state.messages[1].model.as_deref(), Some("fake-model-2024-06"));
    assert_eq!(state.last_reply(), Some("Returns are accepted within 30 days."));

    let calls = service.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].system, "You are a helpful sales assistant");
    assert_eq!(calls[0].user, "What is your return policy?");
}

#[tokio::test]
async fn graph_sends_only_latest_user_message() {
    let service = RecordingService::answering("Free shipping over $35.");
    let agent = GraphAgent::new(service.clone(), Persona::new("p").unwrap());
    let state = GraphState {
        messages: vec![
            Message::user("Hi"),
            Message {
                role: Role::Assistant,
                content: "Hello!".into(),
                model: None,
            },
            Message::user("Do you ship for free?"),
        ],
    };

    let state = agent.invoke(state).await.unwrap();

    assert_eq!(state.messages.len(), 4);
    assert_eq!(service.calls()[0].user, "Do you ship for free?");
}

#[tokio::test]
async fn graph_without_user_message_makes_no_call() {
    let service = RecordingService::answering("unused");
    let agent = GraphAgent::new(service.clone(), Persona::new("p").unwrap());

    let err = agent.invoke(GraphState::default()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(service.calls().is_empty());
}
