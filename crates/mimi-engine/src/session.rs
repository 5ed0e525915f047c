use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use mimi_contracts::events::EventWriter;
use mimi_contracts::models::{ModelSelector, ModelSpec, DRYRUN_MODEL};
use serde_json::json;

use crate::camera::{FileCamera, PhotoSource};
use crate::client::{ClientRegistry, DryrunClient, GeminiClient, ModelClient};
use crate::config::EngineConfig;
use crate::screens::{map_object, ChatScreen, DescribeScreen, GameScreen, ScreenContext};

pub const TEXT_CAPABILITY: &str = "text";
pub const VISION_CAPABILITY: &str = "vision";

/// One run of the app: config, clients and the event log every screen shares.
pub struct Session {
    config: EngineConfig,
    events: EventWriter,
    selector: ModelSelector,
    clients: ClientRegistry,
    dryrun: bool,
}

impl Session {
    pub fn new(config: EngineConfig, events_path: Option<PathBuf>, dryrun: bool) -> Result<Self> {
        let session_id = chrono::Utc::now()
            .format("mimi-%Y%m%dT%H%M%S%3f")
            .to_string();
        let events = match events_path {
            Some(path) => EventWriter::new(path, session_id),
            None => EventWriter::disabled(session_id),
        };
        let mut clients = ClientRegistry::new();
        clients.register(GeminiClient::new(&config));
        clients.register(DryrunClient::new());
        Self::with_clients(config, events, clients, dryrun)
    }

    pub fn with_clients(
        config: EngineConfig,
        events: EventWriter,
        clients: ClientRegistry,
        dryrun: bool,
    ) -> Result<Self> {
        events.emit(
            "session_started",
            map_object(json!({
                "model": config.model,
                "dryrun": dryrun,
                "clients": clients.names(),
                "api_key": config.api_key.is_some(),
            })),
        )?;
        tracing::debug!(session_id = events.session_id(), "session started");
        Ok(Self {
            config,
            events,
            selector: ModelSelector::default(),
            clients,
            dryrun,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn events(&self) -> &EventWriter {
        &self.events
    }

    pub fn is_dryrun(&self) -> bool {
        self.dryrun
    }

    /// Known models in preference order.
    pub fn models(&self) -> impl Iterator<Item = &ModelSpec> {
        self.selector.registry.list()
    }

    /// Resolves a model name to a client. Unknown names fall back to the first
    /// model with the capability; dryrun pins every screen to the offline model.
    pub fn context_for(&self, requested: Option<&str>, capability: &str) -> Result<ScreenContext> {
        let requested = if self.dryrun {
            Some(DRYRUN_MODEL)
        } else {
            requested.or(Some(self.config.model.as_str()))
        };
        let selection = self
            .selector
            .select(requested, capability)
            .map_err(|message| anyhow!(message))?;
        if let Some(reason) = selection.fallback_reason.as_deref() {
            tracing::warn!(model = %selection.model.name, "{reason}");
        }

        let client: Arc<dyn ModelClient> = self
            .clients
            .get(&selection.model.provider)
            .ok_or_else(|| {
                anyhow!(
                    "no client registered for provider '{}'",
                    selection.model.provider
                )
            })?;
        if selection.model.provider == "gemini" && self.config.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY or GOOGLE_API_KEY not set; model calls will fail");
        }
        Ok(ScreenContext::new(
            client,
            selection.model.name,
            self.events.clone(),
        ))
    }

    pub fn chat_screen(&self, model: Option<&str>) -> Result<ChatScreen> {
        Ok(ChatScreen::new(self.context_for(model, TEXT_CAPABILITY)?))
    }

    pub fn game_screen(&self, model: Option<&str>) -> Result<GameScreen> {
        let mut screen = GameScreen::new(self.context_for(model, TEXT_CAPABILITY)?);
        screen.load_assets(self.config.game_banner.as_deref());
        Ok(screen)
    }

    /// The screen starts with permission unknown; callers request it when the
    /// screen is first shown.
    pub fn describe_screen(
        &self,
        model: Option<&str>,
        camera: Box<dyn PhotoSource>,
    ) -> Result<DescribeScreen> {
        Ok(DescribeScreen::new(
            self.context_for(model, VISION_CAPABILITY)?,
            camera,
        ))
    }

    pub fn file_camera(&self, path: impl Into<PathBuf>) -> FileCamera {
        FileCamera::new(path, self.config.jpeg_quality, self.config.max_photo_dim)
    }

    pub fn finish(&self) -> Result<()> {
        self.events
            .emit("session_finished", map_object(json!({})))
            .map(|_| ())
    }
}
