use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, NO_ARG_COMMANDS, RAW_ARG_COMMANDS, SINGLE_PATH_COMMANDS, TAB_COMMANDS,
};

/// One parsed line of shell input.
///
/// `action` is `noop`, `input` (plain text for the active tab), `unknown`, or
/// one of the registered command actions.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub text: Option<String>,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            text: None,
            command_args: BTreeMap::new(),
        }
    }

    fn input(raw: &str, text: &str) -> Self {
        let mut intent = Self::new("input", raw);
        intent.text = Some(text.to_string());
        intent
    }

    pub fn arg(&self, key: &str) -> Option<&str> {
        self.command_args
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_single_path_arg(arg: &str) -> String {
    if arg.trim().is_empty() {
        return String::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect::<Vec<String>>()
            .join(" "),
        Err(_) => arg.trim().to_string(),
    }
}

/// Parses a line typed into the shell.
///
/// Blank lines are `noop`. A leading `//` escapes a literal slash so that text
/// such as `//shrug` reaches the active tab as `/shrug`.
pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }
    if let Some(escaped) = raw_trimmed.strip_prefix("//") {
        return Intent::input(text, &format!("/{escaped}"));
    }

    let Some(slash_tail) = raw_trimmed.strip_prefix('/') else {
        return Intent::input(text, text);
    };
    let command_len = slash_tail
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .count();
    if command_len == 0 {
        return Intent::input(text, text);
    }

    let command = slash_tail[..command_len].to_ascii_lowercase();
    let arg = slash_tail[command_len..].trim();

    if TAB_COMMANDS.iter().any(|tab| *tab == command) {
        let mut intent = Intent::new("switch_tab", text);
        intent
            .command_args
            .insert("tab".to_string(), Value::String(command));
        return intent;
    }

    if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
        let mut intent = Intent::new(action, text);
        intent
            .command_args
            .insert("model".to_string(), Value::String(arg.to_string()));
        return intent;
    }

    if let Some(action) = find_action(&command, SINGLE_PATH_COMMANDS) {
        let mut intent = Intent::new(action, text);
        intent.command_args.insert(
            "path".to_string(),
            Value::String(parse_single_path_arg(arg)),
        );
        return intent;
    }

    if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
        return Intent::new(action, text);
    }

    let mut intent = Intent::new("unknown", text);
    intent
        .command_args
        .insert("command".to_string(), Value::String(command));
    intent
        .command_args
        .insert("arg".to_string(), Value::String(arg.to_string()));
    intent
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_intent;

    #[test]
    fn blank_line_is_noop() {
        assert_eq!(parse_intent("   ").action, "noop");
        assert_eq!(parse_intent("").action, "noop");
    }

    #[test]
    fn plain_text_is_input_as_typed() {
        let intent = parse_intent("  hello Mimi ");
        assert_eq!(intent.action, "input");
        assert_eq!(intent.text.as_deref(), Some("  hello Mimi "));
    }

    #[test]
    fn double_slash_escapes_commands() {
        let intent = parse_intent("//shrug");
        assert_eq!(intent.action, "input");
        assert_eq!(intent.text.as_deref(), Some("/shrug"));
    }

    #[test]
    fn lone_slash_is_input() {
        assert_eq!(parse_intent("/ ok").action, "input");
    }

    #[test]
    fn tab_commands_switch_tabs() {
        let intent = parse_intent("/GAME");
        assert_eq!(intent.action, "switch_tab");
        assert_eq!(intent.command_args["tab"], json!("game"));
        assert_eq!(parse_intent("/describe").arg("tab"), Some("describe"));
    }

    #[test]
    fn model_command_keeps_raw_argument() {
        let intent = parse_intent("/model gemini-1.5-pro");
        assert_eq!(intent.action, "set_model");
        assert_eq!(intent.arg("model"), Some("gemini-1.5-pro"));
        assert_eq!(parse_intent("/model").arg("model"), None);
    }

    #[test]
    fn path_commands_accept_quoted_paths() {
        let save = parse_intent("/save \"/tmp/my chat.json\"");
        assert_eq!(save.action, "save_transcript");
        assert_eq!(save.command_args["path"], json!("/tmp/my chat.json"));

        let camera = parse_intent("/camera ~/Pictures");
        assert_eq!(camera.action, "set_camera");
        assert_eq!(camera.arg("path"), Some("~/Pictures"));
    }

    #[test]
    fn no_arg_commands() {
        assert_eq!(parse_intent("/help").action, "help");
        assert_eq!(parse_intent("/exit").action, "quit");
        assert_eq!(parse_intent("/grant").action, "grant_permission");
        assert_eq!(parse_intent("/shoot").action, "shoot");
        assert_eq!(parse_intent("/clear").action, "clear");
        assert_eq!(parse_intent("/models").action, "list_models");
    }

    #[test]
    fn unknown_command_reports_name_and_arg() {
        let intent = parse_intent("/purr loudly");
        assert_eq!(intent.action, "unknown");
        assert_eq!(intent.command_args["command"], json!("purr"));
        assert_eq!(intent.command_args["arg"], json!("loudly"));
    }
}
