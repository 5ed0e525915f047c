use std::path::{Path, PathBuf};

use anyhow::Result;
use mimi_contracts::alert::Alert;
use mimi_contracts::game::{AssetStatus, EmojiLookup, EmojiOutcome, GameState, GameView};
use serde_json::json;

use super::{map_object, ScreenContext};
use crate::client::{error_chain_text, GenerateRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundStatus {
    /// Empty answer; nothing was submitted.
    Ignored,
    /// The verdict call failed and the round was dropped.
    Abandoned { error: String },
    Played {
        opponent: String,
        emoji: Option<String>,
    },
}

/// What one submit produced, alerts in the order they should be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    pub alerts: Vec<Alert>,
    pub status: RoundStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

pub struct GameScreen {
    state: GameState,
    ctx: ScreenContext,
    banner: Option<Banner>,
}

impl GameScreen {
    pub fn new(ctx: ScreenContext) -> Self {
        Self {
            state: GameState::new(),
            ctx,
            banner: None,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn model(&self) -> &str {
        &self.ctx.model
    }

    pub fn set_context(&mut self, ctx: ScreenContext) {
        self.ctx = ctx;
    }

    /// Settles the asset gate. Without a banner there is nothing to wait for;
    /// an unreadable banner still lets the game render, just without it.
    pub fn load_assets(&mut self, banner: Option<&Path>) -> &AssetStatus {
        let status = match banner {
            None => AssetStatus::Loaded,
            Some(path) => match image::image_dimensions(path) {
                Ok((width, height)) => {
                    self.banner = Some(Banner {
                        path: path.to_path_buf(),
                        width,
                        height,
                    });
                    AssetStatus::Loaded
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), "game banner failed to load: {err}");
                    AssetStatus::Failed(err.to_string())
                }
            },
        };
        self.state.set_assets(status);
        self.state.assets()
    }

    pub fn render(&self) -> Option<GameView> {
        self.state.render()
    }

    pub fn submit_answer(&mut self, answer: &str) -> Result<RoundReport> {
        self.state.set_answer(answer);
        self.submit()
    }

    pub fn submit(&mut self) -> Result<RoundReport> {
        let Some(pending) = self.state.submit()? else {
            return Ok(RoundReport {
                alerts: Vec::new(),
                status: RoundStatus::Ignored,
            });
        };
        self.ctx.record(
            "round_submitted",
            map_object(json!({
                "opponent": pending.opponent,
                "answer": pending.answer,
                "model": self.ctx.model,
            })),
        );

        let request = GenerateRequest::new(self.ctx.model.clone(), pending.prompt.clone());
        let response = match self.ctx.client.generate(&request) {
            Ok(response) => response,
            Err(err) => {
                self.state.abandon_verdict(pending.ticket)?;
                let error = error_chain_text(&err, 512);
                tracing::error!(
                    opponent = %pending.opponent,
                    answer = %pending.answer,
                    "verdict request failed: {error}"
                );
                self.ctx.record(
                    "verdict_failed",
                    map_object(json!({
                        "opponent": pending.opponent,
                        "answer": pending.answer,
                        "error": error,
                    })),
                );
                return Ok(RoundReport {
                    alerts: Vec::new(),
                    status: RoundStatus::Abandoned { error },
                });
            }
        };

        let outcome = self.state.receive_verdict(pending.ticket, &response.text)?;
        self.ctx.record(
            "verdict_received",
            map_object(json!({
                "previous_opponent": pending.opponent,
                "opponent": outcome.opponent,
                "verdict": outcome.alert.body,
                "model": response.model,
            })),
        );

        let mut alerts = vec![outcome.alert];
        if let Some(lookup) = outcome.emoji_lookup {
            alerts.extend(self.resolve_emoji(lookup)?);
        }
        Ok(RoundReport {
            alerts,
            status: RoundStatus::Played {
                opponent: self.state.opponent().to_string(),
                emoji: self.state.emoji().map(str::to_string),
            },
        })
    }

    /// Runs one emoji lookup. Returns an alert only when the reply had no
    /// emoji in it.
    pub fn resolve_emoji(&mut self, lookup: EmojiLookup) -> Result<Option<Alert>> {
        let request = GenerateRequest::new(self.ctx.model.clone(), lookup.prompt.clone());
        let response = match self.ctx.client.generate(&request) {
            Ok(response) => response,
            Err(err) => {
                if let Err(stale) = self.state.abandon_emoji(lookup.ticket) {
                    tracing::debug!(opponent = %lookup.opponent, "{stale}");
                }
                let error = error_chain_text(&err, 512);
                tracing::warn!(opponent = %lookup.opponent, "emoji lookup failed: {error}");
                self.ctx.record(
                    "emoji_failed",
                    map_object(json!({
                        "opponent": lookup.opponent,
                        "error": error,
                    })),
                );
                return Ok(None);
            }
        };

        let outcome = match self.state.receive_emoji(lookup.ticket, &response.text) {
            Ok(outcome) => outcome,
            Err(stale) => {
                tracing::debug!(
                    opponent = %lookup.opponent,
                    "dropping emoji for previous opponent: {stale}"
                );
                return Ok(None);
            }
        };
        match outcome {
            EmojiOutcome::Found(emoji) => {
                self.ctx.record(
                    "emoji_resolved",
                    map_object(json!({
                        "opponent": lookup.opponent,
                        "emoji": emoji,
                    })),
                );
                Ok(None)
            }
            EmojiOutcome::Missing(alert) => {
                self.ctx.record(
                    "emoji_missing",
                    map_object(json!({
                        "opponent": lookup.opponent,
                        "reply": alert.body,
                    })),
                );
                Ok(Some(alert))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};
    use mimi_contracts::alert::Alert;
    use mimi_contracts::events::EventWriter;
    use mimi_contracts::game::{AssetStatus, INITIAL_EMOJI};

    use super::{GameScreen, RoundStatus};
    use crate::screens::testing::{context, event_types, unwritable_events, ScriptedClient};

    fn ready(client: &ScriptedClient, events: EventWriter) -> GameScreen {
        let mut game = GameScreen::new(context(client, events));
        game.load_assets(None);
        game
    }

    #[test]
    fn view_is_blank_until_assets_settle() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let client = ScriptedClient::new(Vec::new());
        let mut game = GameScreen::new(context(&client, EventWriter::disabled("s-1")));
        assert_eq!(game.render(), None);

        let banner = temp.path().join("banner.png");
        RgbImage::from_pixel(64, 16, Rgb([10, 10, 10])).save(&banner)?;
        assert_eq!(game.load_assets(Some(&banner)), &AssetStatus::Loaded);
        assert_eq!(game.banner().map(|b| (b.width, b.height)), Some((64, 16)));

        let view = game.render().expect("view after load");
        assert_eq!(view.title, "what beats");
        assert_eq!(view.opponent, "rock?");
        assert_eq!(view.emoji.as_deref(), Some(INITIAL_EMOJI));
        Ok(())
    }

    #[test]
    fn broken_banner_still_renders() {
        let client = ScriptedClient::new(Vec::new());
        let mut game = GameScreen::new(context(&client, EventWriter::disabled("s-1")));
        let status = game
            .load_assets(Some(std::path::Path::new("/nonexistent/banner.png")))
            .clone();
        assert!(matches!(status, AssetStatus::Failed(_)));
        assert!(game.banner().is_none());
        assert!(game.render().is_some());
    }

    #[test]
    fn scissors_round_moves_opponent_and_fetches_emoji() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let events = EventWriter::new(temp.path().join("events.jsonl"), "s-1");
        let client = ScriptedClient::new(vec![
            Ok("  No, rock crushes scissors.  "),
            Ok("Here you go: \u{2702}\u{FE0F}"),
        ]);
        let mut game = ready(&client, events.clone());

        let report = game.submit_answer(" scissors ")?;
        assert_eq!(
            report.alerts,
            vec![Alert::titled("Result", "No, rock crushes scissors.")]
        );
        assert_eq!(
            report.status,
            RoundStatus::Played {
                opponent: "scissors".to_string(),
                emoji: Some("\u{2702}\u{FE0F}".to_string()),
            }
        );
        assert_eq!(game.state().answer(), "");

        let requests = client.requests();
        assert!(requests[0].prompt.contains("\"scissors\""));
        assert!(requests[0].prompt.contains("\"rock\""));
        assert!(requests[1].prompt.contains("\"scissors\""));
        assert_eq!(
            event_types(&events),
            vec!["round_submitted", "verdict_received", "emoji_resolved"]
        );
        Ok(())
    }

    #[test]
    fn reply_without_emoji_alerts_raw_text() -> anyhow::Result<()> {
        let client = ScriptedClient::new(vec![Ok("Yes, paper covers rock."), Ok("paper")]);
        let mut game = ready(&client, EventWriter::disabled("s-1"));

        let report = game.submit_answer("paper")?;
        assert_eq!(report.alerts.len(), 2);
        assert_eq!(report.alerts[1], Alert::untitled("paper"));
        assert_eq!(game.state().emoji(), None);
        Ok(())
    }

    #[test]
    fn failed_verdict_leaves_round_untouched() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let events = EventWriter::new(temp.path().join("events.jsonl"), "s-1");
        let client = ScriptedClient::new(vec![Err("timed out")]);
        let mut game = ready(&client, events.clone());

        let report = game.submit_answer("water")?;
        assert!(report.alerts.is_empty());
        assert_eq!(
            report.status,
            RoundStatus::Abandoned {
                error: "timed out".to_string()
            }
        );
        assert_eq!(game.state().opponent(), "rock");
        assert_eq!(game.state().answer(), "water");
        assert!(game.state().can_submit());
        assert_eq!(event_types(&events), vec!["round_submitted", "verdict_failed"]);
        Ok(())
    }

    #[test]
    fn failed_emoji_lookup_keeps_round_result() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let events = EventWriter::new(temp.path().join("events.jsonl"), "s-1");
        let client = ScriptedClient::new(vec![Ok("Yes, fire melts rock."), Err("quota")]);
        let mut game = ready(&client, events.clone());

        let report = game.submit_answer("fire")?;
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(game.state().opponent(), "fire");
        assert!(!game.state().emoji_pending());
        assert_eq!(
            event_types(&events),
            vec!["round_submitted", "verdict_received", "emoji_failed"]
        );
        let log = std::fs::read_to_string(temp.path().join("events.jsonl"))?;
        let last: serde_json::Value =
            serde_json::from_str(log.lines().last().unwrap_or_default())?;
        assert_eq!(last["opponent"], "fire");
        assert_eq!(last["error"], "quota");
        Ok(())
    }

    #[test]
    fn broken_event_log_keeps_rounds_flowing() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let client = ScriptedClient::new(vec![
            Ok("Yes, paper covers rock."),
            Ok("\u{1F4C4}"),
            Ok("Yes, scissors cut paper."),
            Ok("\u{2702}"),
        ]);
        let mut game = ready(&client, unwritable_events(temp.path()));

        let report = game.submit_answer("paper")?;
        assert_eq!(
            report.alerts,
            vec![Alert::titled("Result", "Yes, paper covers rock.")]
        );
        assert!(game.state().can_submit());
        assert!(!game.state().emoji_pending());
        assert_eq!(game.state().emoji(), Some("\u{1F4C4}"));

        let report = game.submit_answer("scissors")?;
        assert_eq!(
            report.status,
            RoundStatus::Played {
                opponent: "scissors".to_string(),
                emoji: Some("\u{2702}".to_string()),
            }
        );
        Ok(())
    }

    #[test]
    fn blank_answer_is_ignored() -> anyhow::Result<()> {
        let client = ScriptedClient::new(Vec::new());
        let mut game = ready(&client, EventWriter::disabled("s-1"));
        let report = game.submit_answer("   ")?;
        assert_eq!(report.status, RoundStatus::Ignored);
        assert!(client.requests().is_empty());
        Ok(())
    }

    #[test]
    fn back_to_rock_skips_lookup() -> anyhow::Result<()> {
        let client = ScriptedClient::new(vec![
            Ok("Yes"),
            Ok("\u{1F4C4}"),
            Ok("Yes, rock tears paper."),
        ]);
        let mut game = ready(&client, EventWriter::disabled("s-1"));
        game.submit_answer("paper")?;
        let report = game.submit_answer("rock")?;
        assert_eq!(
            report.status,
            RoundStatus::Played {
                opponent: "rock".to_string(),
                emoji: Some(INITIAL_EMOJI.to_string()),
            }
        );
        assert_eq!(client.requests().len(), 3);
        Ok(())
    }
}
