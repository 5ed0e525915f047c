#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "model",
    action: "set_model",
}];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "save",
        action: "save_transcript",
    },
    CommandSpec {
        command: "camera",
        action: "set_camera",
    },
];

pub(crate) const TAB_COMMANDS: &[&str] = &["chat", "game", "describe"];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
    CommandSpec {
        command: "clear",
        action: "clear",
    },
    CommandSpec {
        command: "shoot",
        action: "shoot",
    },
    CommandSpec {
        command: "grant",
        action: "grant_permission",
    },
    CommandSpec {
        command: "tabs",
        action: "list_tabs",
    },
    CommandSpec {
        command: "models",
        action: "list_models",
    },
];

pub const SHELL_HELP_COMMANDS: &[&str] = &[
    "/chat",
    "/game",
    "/describe",
    "/tabs",
    "/model",
    "/models",
    "/clear",
    "/save",
    "/shoot",
    "/grant",
    "/camera",
    "/help",
    "/quit",
];
