pub mod camera;
pub mod client;
pub mod config;
pub mod screens;
mod session;

pub use camera::{FileCamera, PhotoSource};
pub use client::{
    error_chain_text, ClientRegistry, DryrunClient, GeminiClient, GenerateRequest,
    GenerateResponse, InlineImage, ModelClient,
};
pub use config::EngineConfig;
pub use screens::{
    Banner, ChatOutcome, ChatScreen, DescribeOutcome, DescribeScreen, GameScreen, RoundReport,
    RoundStatus, ScreenContext,
};
pub use session::{Session, TEXT_CAPABILITY, VISION_CAPABILITY};
