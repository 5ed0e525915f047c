mod command_registry;
mod intent_parser;
mod tabs;

pub use command_registry::SHELL_HELP_COMMANDS;
pub use intent_parser::{parse_intent, Intent};
pub use tabs::Tab;
