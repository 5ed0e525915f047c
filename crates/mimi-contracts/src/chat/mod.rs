mod state;
mod transcript;

pub use state::{ChatPhase, ChatState, PendingReply, CHAT_SYSTEM_INSTRUCTION};
pub use transcript::{Message, Transcript, Turn, TurnRole};
