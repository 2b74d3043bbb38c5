//! In-memory provider that replays a script of responses. Test-only.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    ChatProvider, ChatTurn, Completion, CompletionRequest, FinishReason, LlmError, ProviderKind,
};

/// One scripted reply.
pub enum Step {
    Reply(Completion),
    Fail(u16),
}

impl Step {
    pub fn stop(text: &str) -> Self {
        Step::Reply(Completion {
            text: text.to_string(),
            finish_reason: FinishReason::Stop,
            output_tokens: None,
        })
    }

    pub fn length(text: &str) -> Self {
        Step::Reply(Completion {
            text: text.to_string(),
            finish_reason: FinishReason::Length,
            output_tokens: None,
        })
    }

    pub fn fail() -> Self {
        Step::Fail(503)
    }
}

/// A call the provider received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
    pub prior_turns: Vec<ChatTurn>,
    pub temperature: f32,
    pub max_tokens: u32,
}

pub struct ScriptedProvider {
    kind: ProviderKind,
    script: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new(kind: ProviderKind, script: Vec<Step>) -> Self {
        Self {
            kind,
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            system: request.system.to_string(),
            user: request.user.to_string(),
            prior_turns: request.prior_turns.to_vec(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        });

        match self.script.lock().unwrap().pop_front() {
            Some(Step::Reply(completion)) => Ok(completion),
            Some(Step::Fail(status)) => Err(LlmError::Api {
                status,
                message: "scripted failure".to_string(),
            }),
            None => panic!("ScriptedProvider ran out of scripted responses"),
        }
    }
}

/// `n` words of filler ending in a full stop.
pub fn words(n: usize) -> String {
    let mut text = vec!["word"; n].join(" ");
    text.push('.');
    text
}
