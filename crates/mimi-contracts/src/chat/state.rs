use crate::error::ScreenError;
use crate::ticket::{Ticket, TicketCounter};

use super::transcript::{Message, Transcript, Turn};

pub const CHAT_SYSTEM_INSTRUCTION: &str =
    "You are Mimi, a cat who loves to play. Talk in dialogue and do not narrate.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Idle,
    AwaitingReply(Ticket),
}

/// Everything the caller needs to ask the model for the next reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    pub ticket: Ticket,
    pub message_id: String,
    pub prompt: String,
    pub history: Vec<Turn>,
}

/// Chat screen state: the transcript, the input field and the reply phase.
#[derive(Debug, Clone)]
pub struct ChatState {
    transcript: Transcript,
    input: String,
    phase: ChatPhase,
    tickets: TicketCounter,
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatState {
    pub fn new() -> Self {
        Self {
            transcript: Transcript::new(),
            input: String::new(),
            phase: ChatPhase::Idle,
            tickets: TicketCounter::default(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    pub fn is_awaiting_reply(&self) -> bool {
        matches!(self.phase, ChatPhase::AwaitingReply(_))
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Sends the current input.
    ///
    /// Whitespace-only input is ignored and stays in the field. Otherwise the
    /// text is appended as typed, the field is cleared and the screen waits
    /// for exactly one reply.
    pub fn submit(&mut self) -> Result<Option<PendingReply>, ScreenError> {
        if self.input.trim().is_empty() {
            return Ok(None);
        }
        if self.is_awaiting_reply() {
            return Err(ScreenError::Busy("chat reply"));
        }

        let history = self.transcript.exchanges();
        let text = std::mem::take(&mut self.input);
        let message = self.transcript.push(Message::sent(text));
        let ticket = self.tickets.issue();
        let pending = PendingReply {
            ticket,
            message_id: message.id.clone(),
            prompt: message.text.clone(),
            history,
        };
        self.phase = ChatPhase::AwaitingReply(ticket);
        Ok(Some(pending))
    }

    /// Convenience for `set_input` followed by `submit`.
    pub fn send(&mut self, text: impl Into<String>) -> Result<Option<PendingReply>, ScreenError> {
        self.set_input(text);
        self.submit()
    }

    pub fn receive_reply(&mut self, ticket: Ticket, text: &str) -> Result<&Message, ScreenError> {
        self.settle(ticket)?;
        Ok(self.transcript.push(Message::received(text.trim())))
    }

    /// Releases the screen after a failed call. The transcript keeps the sent
    /// message without a reply.
    pub fn abandon_reply(&mut self, ticket: Ticket) -> Result<(), ScreenError> {
        self.settle(ticket)
    }

    /// Drops the transcript, as when the screen is torn down.
    pub fn clear(&mut self) {
        self.transcript.clear();
        self.input.clear();
        self.phase = ChatPhase::Idle;
    }

    fn settle(&mut self, ticket: Ticket) -> Result<(), ScreenError> {
        match self.phase {
            ChatPhase::AwaitingReply(current) if current == ticket => {
                self.phase = ChatPhase::Idle;
                Ok(())
            }
            ChatPhase::AwaitingReply(_) => Err(ScreenError::StaleTicket { ticket }),
            ChatPhase::Idle => Err(ScreenError::NotPending { ticket }),
        }
    }
}
