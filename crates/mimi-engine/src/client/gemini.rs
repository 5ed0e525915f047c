use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use mimi_contracts::chat::TurnRole;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};

use super::{truncate_text, GenerateRequest, GenerateResponse, ModelClient};
use crate::config::EngineConfig;

/// `generateContent` over the Generative Language REST API.
pub struct GeminiClient {
    api_base: String,
    api_key: Option<String>,
    http: HttpClient,
    request_timeout: Duration,
    transport_retries: usize,
    retry_backoff: Duration,
}

impl GeminiClient {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            api_base: config.api_base.trim().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            http: HttpClient::new(),
            request_timeout: config.request_timeout,
            transport_retries: config.transport_retries,
            retry_backoff: config.retry_backoff,
        }
    }

    pub fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn build_payload(request: &GenerateRequest) -> Value {
        let mut contents: Vec<Value> = request
            .history
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    TurnRole::User => "user",
                    TurnRole::Model => "model",
                };
                json!({ "role": role, "parts": [{ "text": turn.text }] })
            })
            .collect();

        let mut parts = vec![json!({ "text": request.prompt })];
        if let Some(image) = request.image.as_ref() {
            parts.push(json!({
                "inlineData": {
                    "mimeType": image.mime_type,
                    "data": BASE64.encode(&image.bytes),
                }
            }));
        }
        contents.push(json!({ "role": "user", "parts": parts }));

        let mut payload = Map::new();
        if let Some(instruction) = request
            .system_instruction
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            payload.insert(
                "systemInstruction".to_string(),
                json!({ "parts": [{ "text": instruction }] }),
            );
        }
        payload.insert("contents".to_string(), Value::Array(contents));
        Value::Object(payload)
    }

    fn post_with_transport_retries(
        &self,
        endpoint: &str,
        api_key: &str,
        payload: &Value,
    ) -> Result<HttpResponse> {
        let max_retries = self.transport_retries;
        for attempt in 0..=max_retries {
            let response = self
                .http
                .post(endpoint)
                .query(&[("key", api_key)])
                .timeout(self.request_timeout)
                .json(payload)
                .send();

            match response {
                Ok(ok) => return Ok(ok),
                Err(raw) => {
                    let err = anyhow::Error::new(raw).context(format!("POST {endpoint}"));
                    if !is_retryable_transport_error(&err) || attempt >= max_retries {
                        let attempts = attempt + 1;
                        let plural = if attempts == 1 { "" } else { "s" };
                        return Err(err.context(format!(
                            "Gemini request failed after {attempts} attempt{plural}"
                        )));
                    }
                    tracing::warn!(
                        "Gemini transport retry {}/{} after transient request failure",
                        attempt + 1,
                        max_retries
                    );
                    thread::sleep(self.retry_backoff * (attempt as u32 + 1));
                }
            }
        }

        unreachable!("Gemini transport retry loop should always return a response or error")
    }

    fn extract_response(model: &str, payload: &Value) -> Result<GenerateResponse> {
        if let Some(reason) = payload
            .get("promptFeedback")
            .and_then(|feedback| feedback.get("blockReason"))
            .and_then(Value::as_str)
        {
            bail!("Gemini blocked the prompt ({reason})");
        }

        let candidate = payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|rows| rows.first())
            .cloned()
            .unwrap_or(Value::Null);
        let finish_reason = candidate
            .get("finishReason")
            .and_then(Value::as_str)
            .map(str::to_string);
        let text = candidate
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            bail!(
                "Gemini returned no text (finish reason: {})",
                finish_reason.as_deref().unwrap_or("unknown")
            );
        }

        let usage = payload.get("usageMetadata");
        Ok(GenerateResponse {
            text,
            model: payload
                .get("modelVersion")
                .and_then(Value::as_str)
                .unwrap_or(model)
                .to_string(),
            finish_reason,
            input_tokens: usage
                .and_then(|usage| usage.get("promptTokenCount"))
                .and_then(Value::as_i64),
            output_tokens: usage
                .and_then(|usage| usage.get("candidatesTokenCount"))
                .and_then(Value::as_i64),
        })
    }
}

impl ModelClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        request.validate()?;
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("GEMINI_API_KEY or GOOGLE_API_KEY not set");
        };
        let endpoint = self.endpoint_for_model(&request.model);
        let payload = Self::build_payload(request);

        tracing::debug!(
            model = %request.model,
            history = request.history.len(),
            image = request.image.is_some(),
            "sending generateContent request"
        );
        let started = Instant::now();
        let response = self.post_with_transport_retries(&endpoint, api_key, &payload)?;
        let response_payload = response_json_or_error("Gemini", response)?;
        let parsed = Self::extract_response(&request.model, &response_payload)?;
        tracing::debug!(
            model = %parsed.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            finish_reason = parsed.finish_reason.as_deref().unwrap_or("unknown"),
            "generateContent response received"
        );
        Ok(parsed)
    }
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

fn is_retryable_transport_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .map(|reqwest_err| reqwest_err.is_timeout() || reqwest_err.is_connect())
            .unwrap_or(false)
    })
}
