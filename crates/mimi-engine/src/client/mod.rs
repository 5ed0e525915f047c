use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use mimi_contracts::chat::Turn;
use mimi_contracts::describe::CapturedPhoto;
use mimi_contracts::error::ScreenError;

mod dryrun;
mod gemini;

pub use dryrun::DryrunClient;
pub use gemini::GeminiClient;

/// Image bytes sent alongside the last user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl From<CapturedPhoto> for InlineImage {
    fn from(photo: CapturedPhoto) -> Self {
        Self {
            mime_type: photo.mime_type,
            bytes: photo.bytes,
        }
    }
}

/// A complete model call. The client keeps no conversation state, so the
/// caller passes the full history every time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub model: String,
    pub system_instruction: Option<String>,
    pub history: Vec<Turn>,
    pub prompt: String,
    pub image: Option<InlineImage>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            history: Vec::new(),
            prompt: prompt.into(),
            image: None,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(ScreenError::EmptyPrompt.into());
        }
        if self.model.trim().is_empty() {
            bail!("model must not be empty");
        }
        if let Some(image) = self.image.as_ref() {
            if image.bytes.is_empty() {
                bail!("inline image has no bytes");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateResponse {
    pub text: String,
    pub model: String,
    pub finish_reason: Option<String>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
}

pub trait ModelClient: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse>;
}

#[derive(Default)]
pub struct ClientRegistry {
    clients: BTreeMap<String, Arc<dyn ModelClient>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C: ModelClient + 'static>(&mut self, client: C) {
        self.clients
            .insert(client.name().to_string(), Arc::new(client));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ModelClient>> {
        self.clients.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

/// Flattens an error chain into one line for logs and events.
pub fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() || parts.last().is_some_and(|last| last == trimmed) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}
