use std::path::Path;

use anyhow::{Context, Result};
use mimi_contracts::chat::{ChatState, Message, Transcript, CHAT_SYSTEM_INSTRUCTION};
use serde_json::json;

use super::{map_object, ScreenContext};
use crate::client::{error_chain_text, GenerateRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    /// Whitespace-only input; nothing was sent.
    Ignored,
    Replied(Message),
    /// The call failed. The sent message stays in the transcript on its own.
    NoReply { error: String },
}

pub struct ChatScreen {
    state: ChatState,
    ctx: ScreenContext,
}

impl ChatScreen {
    pub fn new(ctx: ScreenContext) -> Self {
        Self {
            state: ChatState::new(),
            ctx,
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn transcript(&self) -> &Transcript {
        self.state.transcript()
    }

    pub fn model(&self) -> &str {
        &self.ctx.model
    }

    /// Swaps client and model; the transcript carries over.
    pub fn set_context(&mut self, ctx: ScreenContext) {
        self.ctx = ctx;
    }

    pub fn send(&mut self, text: &str) -> Result<ChatOutcome> {
        let Some(pending) = self.state.send(text)? else {
            return Ok(ChatOutcome::Ignored);
        };
        self.ctx.record(
            "message_sent",
            map_object(json!({
                "message_id": pending.message_id,
                "model": self.ctx.model,
                "history_turns": pending.history.len(),
                "chars": pending.prompt.chars().count(),
            })),
        );

        let request = GenerateRequest::new(self.ctx.model.clone(), pending.prompt.clone())
            .with_system_instruction(CHAT_SYSTEM_INSTRUCTION)
            .with_history(pending.history.clone());
        match self.ctx.client.generate(&request) {
            Ok(response) => {
                let message = self
                    .state
                    .receive_reply(pending.ticket, &response.text)?
                    .clone();
                self.ctx.record(
                    "reply_received",
                    map_object(json!({
                        "message_id": message.id,
                        "reply_to": pending.message_id,
                        "model": response.model,
                        "finish_reason": response.finish_reason,
                        "input_tokens": response.input_tokens,
                        "output_tokens": response.output_tokens,
                    })),
                );
                Ok(ChatOutcome::Replied(message))
            }
            Err(err) => {
                self.state.abandon_reply(pending.ticket)?;
                let error = error_chain_text(&err, 512);
                tracing::error!(model = %self.ctx.model, "chat reply failed: {error}");
                self.ctx.record(
                    "reply_failed",
                    map_object(json!({
                        "reply_to": pending.message_id,
                        "model": self.ctx.model,
                        "error": error,
                    })),
                );
                Ok(ChatOutcome::NoReply { error })
            }
        }
    }

    pub fn clear(&mut self) {
        self.state.clear();
    }

    pub fn save_transcript(&self, path: &Path) -> Result<()> {
        self.state
            .transcript()
            .write_json(path)
            .with_context(|| format!("failed saving transcript to {}", path.display()))
    }
}
