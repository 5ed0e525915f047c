use std::sync::Arc;

use mimi_contracts::events::{EventPayload, EventWriter};
use serde_json::Value;

use crate::client::ModelClient;

mod chat;
mod describe;
mod game;

pub use chat::{ChatOutcome, ChatScreen};
pub use describe::{DescribeOutcome, DescribeScreen};
pub use game::{Banner, GameScreen, RoundReport, RoundStatus};

/// What a screen talks to: one client, one model and the shared event log.
#[derive(Clone)]
pub struct ScreenContext {
    pub client: Arc<dyn ModelClient>,
    pub model: String,
    pub events: EventWriter,
}

impl ScreenContext {
    pub fn new(
        client: Arc<dyn ModelClient>,
        model: impl Into<String>,
        events: EventWriter,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            events,
        }
    }

    /// Appends one event. A failed write is logged and dropped; the screen
    /// carries on with whatever the model returned.
    pub fn record(&self, event_type: &str, payload: EventPayload) {
        if let Err(err) = self.events.emit(event_type, payload) {
            tracing::warn!(event = event_type, "event log write failed: {err:#}");
        }
    }
}

pub(crate) fn map_object(value: Value) -> EventPayload {
    value.as_object().cloned().unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, Result};
    use mimi_contracts::events::EventWriter;
    use serde_json::Value;

    use super::ScreenContext;
    use crate::client::{GenerateRequest, GenerateResponse, ModelClient};

    /// Replays queued replies in order and records every request.
    #[derive(Clone, Default)]
    pub struct ScriptedClient {
        replies: Arc<Mutex<VecDeque<Result<String, String>>>>,
        requests: Arc<Mutex<Vec<GenerateRequest>>>,
    }

    impl ScriptedClient {
        pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
            let client = Self::default();
            if let Ok(mut queue) = client.replies.lock() {
                queue.extend(
                    replies
                        .into_iter()
                        .map(|reply| reply.map(str::to_string).map_err(str::to_string)),
                );
            }
            client
        }

        pub fn requests(&self) -> Vec<GenerateRequest> {
            self.requests
                .lock()
                .map(|rows| rows.clone())
                .unwrap_or_default()
        }
    }

    impl ModelClient for ScriptedClient {
        fn name(&self) -> &str {
            "scripted"
        }

        fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
            request.validate()?;
            self.requests
                .lock()
                .map_err(|_| anyhow!("request log poisoned"))?
                .push(request.clone());
            let next = self
                .replies
                .lock()
                .map_err(|_| anyhow!("reply queue poisoned"))?
                .pop_front()
                .ok_or_else(|| anyhow!("no scripted reply left"))?;
            let text = next.map_err(|message| anyhow!(message))?;
            Ok(GenerateResponse {
                text,
                model: request.model.clone(),
                finish_reason: Some("STOP".to_string()),
                input_tokens: None,
                output_tokens: None,
            })
        }
    }

    pub fn context(client: &ScriptedClient, events: EventWriter) -> ScreenContext {
        ScreenContext::new(Arc::new(client.clone()), "gemini-1.5-flash", events)
    }

    /// Points the log at a directory, so every append fails.
    pub fn unwritable_events(dir: &Path) -> EventWriter {
        EventWriter::new(dir, "s-1")
    }

    pub fn event_types(events: &EventWriter) -> Vec<String> {
        let Some(path) = events.path() else {
            return Vec::new();
        };
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter_map(|row| row.get("type").and_then(Value::as_str).map(str::to_string))
            .collect()
    }
}
