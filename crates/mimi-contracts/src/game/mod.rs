mod assets;
mod emoji;
mod state;

pub use assets::AssetStatus;
pub use emoji::extract_emoji;
pub use state::{
    emoji_prompt, verdict_prompt, EmojiLookup, EmojiOutcome, GamePhase, GameState, GameView,
    PendingVerdict, RoundOutcome, INITIAL_ANSWER, INITIAL_EMOJI, INITIAL_OPPONENT,
    RESULT_ALERT_TITLE,
};
