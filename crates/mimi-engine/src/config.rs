use std::env;
use std::path::PathBuf;
use std::time::Duration;

use mimi_contracts::models::DEFAULT_MODEL;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Runtime settings. Environment first, CLI flags override individual fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub request_timeout: Duration,
    pub transport_retries: usize,
    pub retry_backoff: Duration,
    pub jpeg_quality: u8,
    pub max_photo_dim: u32,
    pub game_banner: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(90),
            transport_retries: 0,
            retry_backoff: Duration::from_millis(1200),
            jpeg_quality: 40,
            max_photo_dim: 1920,
            game_banner: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Self {
            api_key: get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")),
            api_base: get("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            model: get("MIMI_MODEL").unwrap_or(defaults.model),
            request_timeout: get("MIMI_REQUEST_TIMEOUT")
                .map(|raw| Duration::from_secs_f64(parse_clamped(&raw, 90.0, 5.0, 300.0)))
                .unwrap_or(defaults.request_timeout),
            transport_retries: get("MIMI_TRANSPORT_RETRIES")
                .map(|raw| parse_clamped(&raw, 0.0, 0.0, 4.0).round() as usize)
                .unwrap_or(defaults.transport_retries),
            retry_backoff: get("MIMI_RETRY_BACKOFF")
                .map(|raw| Duration::from_secs_f64(parse_clamped(&raw, 1.2, 0.1, 10.0)))
                .unwrap_or(defaults.retry_backoff),
            jpeg_quality: get("MIMI_JPEG_QUALITY")
                .map(|raw| parse_clamped(&raw, 40.0, 1.0, 100.0).round() as u8)
                .unwrap_or(defaults.jpeg_quality),
            max_photo_dim: get("MIMI_MAX_PHOTO_DIM")
                .map(|raw| parse_clamped(&raw, 1920.0, 128.0, 8192.0).round() as u32)
                .unwrap_or(defaults.max_photo_dim),
            game_banner: get("MIMI_GAME_BANNER").map(PathBuf::from),
        }
    }
}

fn parse_clamped(raw: &str, default: f64, min: f64, max: f64) -> f64 {
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(default)
        .clamp(min, max)
}
