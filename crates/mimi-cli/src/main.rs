use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use mimi_contracts::alert::Alert;
use mimi_contracts::chat::Message;
use mimi_contracts::describe::DescribeView;
use mimi_contracts::error::ScreenError;
use mimi_contracts::game::{AssetStatus, GameView};
use mimi_contracts::shell::{parse_intent, Intent, Tab, SHELL_HELP_COMMANDS};
use mimi_engine::{
    ChatOutcome, ChatScreen, DescribeOutcome, DescribeScreen, EngineConfig, GameScreen,
    RoundReport, RoundStatus, Session,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "mimi",
    version,
    about = "Chat with Mimi, play \"what beats\" and describe photos"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Model name; unknown names fall back to the default.
    #[arg(long, global = true)]
    model: Option<String>,
    /// Append JSONL events to this file.
    #[arg(long, global = true)]
    events: Option<PathBuf>,
    /// Answer offline with canned replies instead of calling Gemini.
    #[arg(long, global = true)]
    dryrun: bool,
    /// Request timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<f64>,
    /// Retries for connect and timeout failures.
    #[arg(long, global = true)]
    retries: Option<usize>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// All three tabs, switched with /chat, /game and /describe.
    Shell(ShellArgs),
    /// Only the chat tab.
    Chat,
    /// Only the "what beats" game.
    Game,
    /// Only the photo describer; `--once` shoots a single photo and exits.
    Describe(DescribeArgs),
}

#[derive(Debug, Parser)]
struct ShellArgs {
    /// File or drop folder used as the camera.
    #[arg(long, default_value = ".")]
    camera: PathBuf,
}

#[derive(Debug, Parser)]
struct DescribeArgs {
    /// File or drop folder used as the camera.
    #[arg(long)]
    camera: PathBuf,
    /// Take one photo, print the description and exit.
    #[arg(long)]
    once: bool,
}

fn main() {
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("mimi error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MIMI_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = build_config(&cli.common);
    tracing::debug!(
        model = %config.model,
        dryrun = cli.common.dryrun,
        timeout_s = config.request_timeout.as_secs_f64(),
        retries = config.transport_retries,
        "starting session"
    );
    let session = Session::new(config, cli.common.events.clone(), cli.common.dryrun)?;

    let code = match cli.command {
        None => run_shell(&session, Tab::Chat, PathBuf::from("."), false)?,
        Some(Command::Shell(args)) => run_shell(&session, Tab::Chat, args.camera, false)?,
        Some(Command::Chat) => run_shell(&session, Tab::Chat, PathBuf::from("."), true)?,
        Some(Command::Game) => run_shell(&session, Tab::Game, PathBuf::from("."), true)?,
        Some(Command::Describe(args)) if args.once => run_describe_once(&session, args.camera)?,
        Some(Command::Describe(args)) => run_shell(&session, Tab::Describe, args.camera, true)?,
    };
    session.finish()?;
    Ok(code)
}

fn build_config(args: &CommonArgs) -> EngineConfig {
    let mut config = EngineConfig::from_env();
    if let Some(model) = args
        .model
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        config.model = model.to_string();
    }
    if let Some(seconds) = args.timeout.filter(|value| value.is_finite()) {
        config.request_timeout = Duration::from_secs_f64(seconds.clamp(5.0, 300.0));
    }
    if let Some(retries) = args.retries {
        config.transport_retries = retries.min(4);
    }
    config
}

fn run_describe_once(session: &Session, camera: PathBuf) -> Result<i32> {
    let mut screen = session.describe_screen(None, Box::new(session.file_camera(camera)))?;
    screen.request_permission();
    let view = screen.view();
    if let DescribeView::PermissionPrompt { .. } = view {
        println!("{}", render_describe(&view));
        return Ok(2);
    }
    match screen.take_photo()? {
        DescribeOutcome::Described(alert) => {
            println!("{}", render_alert(&alert));
            Ok(0)
        }
        DescribeOutcome::Failed { error } => {
            eprintln!("Describe failed: {error}");
            Ok(1)
        }
    }
}

/// The interactive tab shell. Everything it prints goes to `out`.
struct Shell<'a, W: Write> {
    session: &'a Session,
    out: W,
    tab: Tab,
    locked: bool,
    chat: ChatScreen,
    game: GameScreen,
    describe: DescribeScreen,
    permission_requested: bool,
}

enum Flow {
    Continue,
    Quit,
}

fn run_shell(session: &Session, start: Tab, camera: PathBuf, locked: bool) -> Result<i32> {
    let mut shell = Shell::new(session, io::stdout(), start, camera, locked)?;
    shell.greet()?;

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        shell.prompt()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        match shell.handle(&parse_intent(input)) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(err) => writeln!(shell.out, "{}", format_command_error(&err))?,
        }
    }
    Ok(0)
}

impl<'a, W: Write> Shell<'a, W> {
    fn new(
        session: &'a Session,
        out: W,
        start: Tab,
        camera: PathBuf,
        locked: bool,
    ) -> Result<Self> {
        Ok(Self {
            session,
            out,
            tab: start,
            locked,
            chat: session.chat_screen(None)?,
            game: session.game_screen(None)?,
            describe: session.describe_screen(None, Box::new(session.file_camera(camera)))?,
            permission_requested: false,
        })
    }

    fn greet(&mut self) -> Result<()> {
        let mode = if self.session.is_dryrun() {
            " in dryrun mode (offline replies)"
        } else {
            ""
        };
        writeln!(self.out, "Mimi started{mode}. Type /help for commands.")?;
        if let AssetStatus::Failed(reason) = self.game.state().assets() {
            writeln!(self.out, "Game banner unavailable: {reason}")?;
        }
        self.show_tab()
    }

    fn prompt(&mut self) -> Result<()> {
        write!(self.out, "{}> ", self.tab.slug())?;
        self.out.flush()?;
        Ok(())
    }

    fn handle(&mut self, intent: &Intent) -> Result<Flow> {
        match intent.action.as_str() {
            "noop" => match self.tab {
                Tab::Chat => {}
                Tab::Game => {
                    let report = self.game.submit()?;
                    self.show_round(&report)?;
                }
                Tab::Describe => self.shoot()?,
            },
            "help" => writeln!(self.out, "Commands: {}", SHELL_HELP_COMMANDS.join(" "))?,
            "quit" => return Ok(Flow::Quit),
            "list_tabs" => {
                for tab in Tab::ALL {
                    let marker = if tab == self.tab { "*" } else { " " };
                    writeln!(
                        self.out,
                        "{marker} /{:<9} {} ({})",
                        tab.slug(),
                        tab.title(),
                        tab.icon()
                    )?;
                }
            }
            "list_models" => self.list_models()?,
            "switch_tab" => {
                let Some(tab) = intent.arg("tab").and_then(Tab::from_slug) else {
                    writeln!(self.out, "Unknown tab")?;
                    return Ok(Flow::Continue);
                };
                if self.locked && tab != self.tab {
                    writeln!(
                        self.out,
                        "Tabs are fixed in single-screen mode; run `mimi` for the shell."
                    )?;
                    return Ok(Flow::Continue);
                }
                self.tab = tab;
                self.show_tab()?;
            }
            "set_model" => self.set_model(intent.arg("model"))?,
            "clear" => match self.tab {
                Tab::Chat => {
                    self.chat.clear();
                    writeln!(self.out, "Transcript cleared.")?;
                }
                _ => writeln!(self.out, "/clear works in the chat tab")?,
            },
            "save_transcript" => {
                let Some(path) = intent.arg("path") else {
                    writeln!(self.out, "/save requires a path")?;
                    return Ok(Flow::Continue);
                };
                let path = PathBuf::from(path);
                self.chat.save_transcript(&path)?;
                writeln!(
                    self.out,
                    "Saved {} messages to {}",
                    self.chat.transcript().len(),
                    path.display()
                )?;
            }
            "shoot" => {
                if self.require_tab(Tab::Describe, "/shoot")? {
                    self.shoot()?;
                }
            }
            "grant_permission" => {
                if self.require_tab(Tab::Describe, "/grant")? {
                    self.describe.request_permission();
                    self.permission_requested = true;
                    self.block(&render_describe(&self.describe.view()))?;
                }
            }
            "set_camera" => {
                let Some(path) = intent.arg("path") else {
                    writeln!(self.out, "/camera requires a path")?;
                    return Ok(Flow::Continue);
                };
                let camera = self.session.file_camera(path);
                let permission = self.describe.set_camera(Box::new(camera))?;
                self.permission_requested = true;
                writeln!(self.out, "Camera set to {path} (permission {})", permission.as_str())?;
                if self.tab == Tab::Describe {
                    self.block(&render_describe(&self.describe.view()))?;
                }
            }
            "input" => {
                let text = intent.text.as_deref().unwrap_or_default();
                self.input(text)?;
            }
            _ => {
                let command = intent.arg("command").unwrap_or("?");
                writeln!(self.out, "Unknown command /{command}. Type /help for commands.")?;
            }
        }
        Ok(Flow::Continue)
    }

    fn require_tab(&mut self, tab: Tab, command: &str) -> Result<bool> {
        if self.tab == tab {
            return Ok(true);
        }
        writeln!(self.out, "{command} works in the {} tab", tab.slug())?;
        Ok(false)
    }

    fn show_tab(&mut self) -> Result<()> {
        match self.tab {
            Tab::Chat => {
                writeln!(self.out, "[{}] model {}", self.tab.title(), self.chat.model())?;
                for message in self.chat.transcript().messages() {
                    writeln!(self.out, "{}", render_message(message))?;
                }
            }
            Tab::Game => self.block(&render_game(self.game.render().as_ref()))?,
            Tab::Describe => {
                if !self.permission_requested {
                    self.describe.request_permission();
                    self.permission_requested = true;
                }
                self.block(&render_describe(&self.describe.view()))?;
            }
        }
        Ok(())
    }

    fn list_models(&mut self) -> Result<()> {
        let session = self.session;
        let default = session.config().model.as_str();
        for model in session.models() {
            let marker = if model.name == self.chat.model() { "*" } else { " " };
            let window = model
                .context_window
                .map(|tokens| format!(", {tokens} tokens"))
                .unwrap_or_default();
            let suffix = if model.name == default { " default" } else { "" };
            writeln!(
                self.out,
                "{marker} {} ({}: {}{window}){suffix}",
                model.name,
                model.provider,
                model.capabilities.join("+")
            )?;
        }
        Ok(())
    }

    fn set_model(&mut self, requested: Option<&str>) -> Result<()> {
        let Some(requested) = requested else {
            writeln!(
                self.out,
                "Models: chat {}, game {}, describe {}",
                self.chat.model(),
                self.game.model(),
                self.describe.model()
            )?;
            return Ok(());
        };
        let session = self.session;
        let text = session.context_for(Some(requested), mimi_engine::TEXT_CAPABILITY)?;
        let vision = session.context_for(Some(requested), mimi_engine::VISION_CAPABILITY)?;
        self.chat.set_context(text.clone());
        self.game.set_context(text);
        self.describe.set_context(vision);
        writeln!(self.out, "Model set to {}", self.chat.model())?;
        Ok(())
    }

    fn input(&mut self, text: &str) -> Result<()> {
        match self.tab {
            Tab::Chat => match self.chat.send(text)? {
                ChatOutcome::Ignored => {}
                ChatOutcome::Replied(message) => {
                    writeln!(self.out, "{}", render_message(&message))?;
                }
                ChatOutcome::NoReply { .. } => {}
            },
            Tab::Game => {
                let report = self.game.submit_answer(text)?;
                self.show_round(&report)?;
            }
            Tab::Describe => {
                writeln!(self.out, "Press Enter or type /shoot to take a photo.")?;
            }
        }
        Ok(())
    }

    fn show_round(&mut self, report: &RoundReport) -> Result<()> {
        for alert in &report.alerts {
            self.block(&render_alert(alert))?;
        }
        if let RoundStatus::Played { .. } = report.status {
            let view = self.game.render();
            self.block(&render_game(view.as_ref()))?;
        }
        Ok(())
    }

    fn shoot(&mut self) -> Result<()> {
        if let DescribeView::Camera { .. } = self.describe.view() {
            writeln!(self.out, "Taking photo...")?;
        }
        match self.describe.take_photo()? {
            DescribeOutcome::Described(alert) => self.block(&render_alert(&alert))?,
            DescribeOutcome::Failed { .. } => {}
        }
        Ok(())
    }

    fn block(&mut self, text: &str) -> Result<()> {
        if !text.is_empty() {
            writeln!(self.out, "{text}")?;
        }
        Ok(())
    }
}

fn format_command_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ScreenError>() {
        Some(ScreenError::PermissionDenied) => {
            "Camera permission was denied. Type /grant to ask again.".to_string()
        }
        Some(ScreenError::PermissionUnknown) => {
            "Camera permission is not known yet. Type /grant.".to_string()
        }
        Some(screen) => format!("Not now: {screen}"),
        None => format!("Error: {err:#}"),
    }
}

fn render_message(message: &Message) -> String {
    let speaker = if message.is_sent { "you" } else { "mimi" };
    format!("{speaker}: {}", message.text)
}

fn render_alert(alert: &Alert) -> String {
    match alert.title.as_deref() {
        Some(title) => format!("== {title} ==\n{}", alert.body),
        None => format!("== {} ==", alert.body),
    }
}

fn render_game(view: Option<&GameView>) -> String {
    let Some(view) = view else {
        return String::new();
    };
    let mut lines = vec![view.title.to_string(), view.opponent.clone()];
    if let Some(emoji) = view.emoji.as_deref() {
        lines.push(emoji.to_string());
    }
    if view.answer.trim().is_empty() {
        lines.push("Type your answer and press Enter.".to_string());
    } else {
        lines.push(format!("Answer: {} (press Enter to keep it)", view.answer));
    }
    lines.join("\n")
}

fn render_describe(view: &DescribeView) -> String {
    match view {
        DescribeView::Blank => String::new(),
        DescribeView::PermissionPrompt { message } => {
            format!("{message}\nType /grant to grant permission.")
        }
        DescribeView::Camera { loading: true } => "Taking photo...".to_string(),
        DescribeView::Camera { loading: false } => {
            "Camera ready. Press Enter or type /shoot to take a photo.".to_string()
        }
    }
}
