use anyhow::Result;

use super::{GenerateRequest, GenerateResponse, ModelClient};

const EMOJI_TABLE: &[(&str, &str)] = &[
    ("rock", "\u{1FAA8}"),
    ("paper", "\u{1F4C4}"),
    ("scissors", "\u{2702}\u{FE0F}"),
    ("fire", "\u{1F525}"),
    ("water", "\u{1F4A7}"),
    ("wind", "\u{1F32C}\u{FE0F}"),
    ("lightning", "\u{26A1}"),
    ("cat", "\u{1F431}"),
    ("dog", "\u{1F436}"),
    ("sun", "\u{2600}\u{FE0F}"),
    ("moon", "\u{1F319}"),
    ("tree", "\u{1F333}"),
];
const FALLBACK_EMOJI: &str = "\u{2728}";

/// Offline client with canned, deterministic replies.
#[derive(Debug, Clone, Default)]
pub struct DryrunClient;

impl DryrunClient {
    pub fn new() -> Self {
        Self
    }

    fn reply_for(request: &GenerateRequest) -> String {
        if let Some(image) = request.image.as_ref() {
            return format!(
                "This is a {} photo of {} bytes. In dryrun mode I cannot see it, \
                 but it looks like something worth pouncing on.",
                image.mime_type,
                image.bytes.len()
            );
        }

        let quoted = quoted_segments(&request.prompt);
        if request.prompt.starts_with("Reply with one emoji") {
            let subject = quoted.first().map(|value| value.to_ascii_lowercase());
            let emoji = subject
                .as_deref()
                .and_then(|subject| {
                    EMOJI_TABLE
                        .iter()
                        .find(|(name, _)| *name == subject)
                        .map(|(_, emoji)| *emoji)
                })
                .unwrap_or(FALLBACK_EMOJI);
            return emoji.to_string();
        }
        if request.prompt.starts_with("We are playing a game") && quoted.len() >= 3 {
            return format!(
                "Yes, \"{}\" beats \"{}\". In dryrun mode every answer wins.",
                quoted[2], quoted[1]
            );
        }

        let earlier = request.history.len() / 2;
        format!(
            "Mrrow! You said \"{}\". Let's play! ({earlier} earlier exchanges)",
            request.prompt.trim()
        )
    }
}

impl ModelClient for DryrunClient {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        request.validate()?;
        let text = Self::reply_for(request);
        Ok(GenerateResponse {
            output_tokens: Some(text.split_whitespace().count() as i64),
            input_tokens: Some(request.prompt.split_whitespace().count() as i64),
            text,
            model: request.model.clone(),
            finish_reason: Some("STOP".to_string()),
        })
    }
}

fn quoted_segments(text: &str) -> Vec<String> {
    text.split('"')
        .skip(1)
        .step_by(2)
        .map(str::to_string)
        .collect()
}
