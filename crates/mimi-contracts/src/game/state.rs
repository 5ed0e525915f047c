use crate::alert::Alert;
use crate::error::ScreenError;
use crate::ticket::{Ticket, TicketCounter};

use super::assets::AssetStatus;
use super::emoji::extract_emoji;

pub const INITIAL_OPPONENT: &str = "rock";
pub const INITIAL_ANSWER: &str = "paper";
pub const INITIAL_EMOJI: &str = "\u{1FAA8}";
pub const RESULT_ALERT_TITLE: &str = "Result";
const TITLE: &str = "what beats";

pub fn verdict_prompt(opponent: &str, answer: &str) -> String {
    format!(
        "We are playing a game called \"what beats\". The current opponent is \"{opponent}\". \
         The player answered \"{answer}\". Does \"{answer}\" beat \"{opponent}\"? \
         Reply with a short verdict that starts with \"Yes\" or \"No\", followed by a one or \
         two sentence explanation."
    )
}

pub fn emoji_prompt(opponent: &str) -> String {
    format!("Reply with one emoji that best represents \"{opponent}\". Reply with the emoji only.")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GamePhase {
    Ready,
    AwaitingVerdict { ticket: Ticket, answer: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerdict {
    pub ticket: Ticket,
    pub opponent: String,
    pub answer: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiLookup {
    pub ticket: Ticket,
    pub opponent: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub alert: Alert,
    pub opponent: String,
    pub emoji_lookup: Option<EmojiLookup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmojiOutcome {
    Found(String),
    /// The reply had no emoji in it; the raw reply is surfaced instead.
    Missing(Alert),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameView {
    pub title: &'static str,
    pub opponent: String,
    pub emoji: Option<String>,
    pub answer: String,
    pub can_submit: bool,
}

/// "What beats X?" round state.
///
/// The verdict and the emoji lookup are tracked separately: a new round may
/// start while the previous opponent's emoji is still on its way, and that
/// late answer is then rejected as stale.
#[derive(Debug, Clone)]
pub struct GameState {
    opponent: String,
    answer: String,
    emoji: Option<String>,
    phase: GamePhase,
    emoji_lookup: Option<(Ticket, String)>,
    assets: AssetStatus,
    tickets: TicketCounter,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            opponent: INITIAL_OPPONENT.to_string(),
            answer: INITIAL_ANSWER.to_string(),
            emoji: Some(INITIAL_EMOJI.to_string()),
            phase: GamePhase::Ready,
            emoji_lookup: None,
            assets: AssetStatus::Loading,
            tickets: TicketCounter::default(),
        }
    }

    pub fn opponent(&self) -> &str {
        &self.opponent
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn emoji(&self) -> Option<&str> {
        self.emoji.as_deref()
    }

    pub fn phase(&self) -> &GamePhase {
        &self.phase
    }

    pub fn assets(&self) -> &AssetStatus {
        &self.assets
    }

    pub fn set_assets(&mut self, status: AssetStatus) {
        self.assets = status;
    }

    pub fn set_answer(&mut self, answer: impl Into<String>) {
        self.answer = answer.into();
    }

    pub fn can_submit(&self) -> bool {
        !self.answer.trim().is_empty() && matches!(self.phase, GamePhase::Ready)
    }

    pub fn emoji_pending(&self) -> bool {
        self.emoji_lookup.is_some()
    }

    /// Opponent whose emoji is still being looked up.
    pub fn emoji_pending_for(&self) -> Option<&str> {
        self.emoji_lookup
            .as_ref()
            .map(|(_, opponent)| opponent.as_str())
    }

    /// Blank until the assets have settled.
    pub fn render(&self) -> Option<GameView> {
        if !self.assets.is_settled() {
            return None;
        }
        Some(GameView {
            title: TITLE,
            opponent: format!("{}?", self.opponent),
            emoji: self.emoji.clone(),
            answer: self.answer.clone(),
            can_submit: self.can_submit(),
        })
    }

    pub fn submit(&mut self) -> Result<Option<PendingVerdict>, ScreenError> {
        let answer = self.answer.trim().to_string();
        if answer.is_empty() {
            return Ok(None);
        }
        if !matches!(self.phase, GamePhase::Ready) {
            return Err(ScreenError::Busy("game verdict"));
        }
        let ticket = self.tickets.issue();
        let pending = PendingVerdict {
            ticket,
            opponent: self.opponent.clone(),
            prompt: verdict_prompt(&self.opponent, &answer),
            answer: answer.clone(),
        };
        self.phase = GamePhase::AwaitingVerdict { ticket, answer };
        Ok(Some(pending))
    }

    /// Applies a verdict: the answer becomes the opponent and the field clears.
    pub fn receive_verdict(
        &mut self,
        ticket: Ticket,
        text: &str,
    ) -> Result<RoundOutcome, ScreenError> {
        let answer = self.settle_verdict(ticket)?;
        let previous = std::mem::replace(&mut self.opponent, answer);
        self.answer.clear();

        let emoji_lookup = if self.opponent == previous {
            None
        } else if self.opponent == INITIAL_OPPONENT {
            self.emoji_lookup = None;
            self.emoji = Some(INITIAL_EMOJI.to_string());
            None
        } else {
            let ticket = self.tickets.issue();
            self.emoji_lookup = Some((ticket, self.opponent.clone()));
            Some(EmojiLookup {
                ticket,
                opponent: self.opponent.clone(),
                prompt: emoji_prompt(&self.opponent),
            })
        };

        Ok(RoundOutcome {
            alert: Alert::titled(RESULT_ALERT_TITLE, text.trim()),
            opponent: self.opponent.clone(),
            emoji_lookup,
        })
    }

    /// Drops a failed round; opponent and answer stay as they were.
    pub fn abandon_verdict(&mut self, ticket: Ticket) -> Result<(), ScreenError> {
        self.settle_verdict(ticket).map(|_| ())
    }

    pub fn receive_emoji(
        &mut self,
        ticket: Ticket,
        text: &str,
    ) -> Result<EmojiOutcome, ScreenError> {
        self.settle_emoji(ticket)?;
        match extract_emoji(text) {
            Some(emoji) => {
                self.emoji = Some(emoji.clone());
                Ok(EmojiOutcome::Found(emoji))
            }
            None => {
                self.emoji = None;
                Ok(EmojiOutcome::Missing(Alert::untitled(text.trim())))
            }
        }
    }

    pub fn abandon_emoji(&mut self, ticket: Ticket) -> Result<(), ScreenError> {
        self.settle_emoji(ticket)
    }

    fn settle_verdict(&mut self, ticket: Ticket) -> Result<String, ScreenError> {
        let current = match &self.phase {
            GamePhase::AwaitingVerdict { ticket: current, .. } => *current,
            GamePhase::Ready => return Err(ScreenError::NotPending { ticket }),
        };
        if current != ticket {
            return Err(ScreenError::StaleTicket { ticket });
        }
        match std::mem::replace(&mut self.phase, GamePhase::Ready) {
            GamePhase::AwaitingVerdict { answer, .. } => Ok(answer),
            GamePhase::Ready => Err(ScreenError::NotPending { ticket }),
        }
    }

    fn settle_emoji(&mut self, ticket: Ticket) -> Result<(), ScreenError> {
        let Some((current, _)) = self.emoji_lookup.as_ref() else {
            return Err(ScreenError::NotPending { ticket });
        };
        if *current != ticket {
            return Err(ScreenError::StaleTicket { ticket });
        }
        self.emoji_lookup = None;
        Ok(())
    }
}
