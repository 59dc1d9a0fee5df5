//! # livecast
//!
//! Console front end: joins a live room, prints viewer counts and speaks the
//! enabled announcements. Reads control commands from stdin.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use livecast_client::{Collaborators, LiveController};
use livecast_core::{SpeechFeature, SpeechToggles};
use livecast_session::{HttpSessionResolver, signer_from_settings};
use livecast_settings::{LivecastSettings, load_settings_from_path, settings_path};
use livecast_speech::CommandRenderer;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "commands: start <live_id> | stop | chat|gift|follow|welcome [on|off] | status | quit";

/// Announce live-room activity aloud.
#[derive(Parser, Debug)]
#[command(name = "livecast", about = "Announce live-room activity aloud")]
struct Cli {
    /// Live id to join at startup (the number in `live.douyin.com/<id>`).
    live_id: Option<String>,

    /// Settings file (defaults to `~/.livecast/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Read chat messages aloud.
    #[arg(long)]
    chat: bool,

    /// Thank viewers for gifts.
    #[arg(long)]
    gift: bool,

    /// Thank viewers for following.
    #[arg(long)]
    follow: bool,

    /// Welcome viewers entering the room.
    #[arg(long)]
    welcome: bool,

    /// Log filter directive (overrides settings; `RUST_LOG` still wins).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(&self, settings: &mut LivecastSettings) {
        let features = &mut settings.features;
        features.chat |= self.chat;
        features.gift |= self.gift;
        features.follow |= self.follow;
        features.welcome |= self.welcome;
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

/// A stdin command.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Start(String),
    Stop,
    /// `None` flips the feature.
    Feature(SpeechFeature, Option<bool>),
    Status,
    Quit,
    Help,
}

/// Parse one stdin line. Blank lines yield `None`.
fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    let command = match verb.to_ascii_lowercase().as_str() {
        "start" => Command::Start(arg.ok_or("usage: start <live_id>")?.to_string()),
        "stop" => Command::Stop,
        "status" => Command::Status,
        "quit" | "exit" => Command::Quit,
        "help" | "?" => Command::Help,
        other => {
            let feature: SpeechFeature = other
                .parse()
                .map_err(|_| format!("unknown command '{other}'; {HELP}"))?;
            let enabled = match arg {
                None => None,
                Some("on") => Some(true),
                Some("off") => Some(false),
                Some(v) => return Err(format!("expected on|off, got '{v}'")),
            };
            Command::Feature(feature, enabled)
        }
    };
    Ok(Some(command))
}

/// Run one command. Returns `false` when the program should exit.
async fn execute(controller: &LiveController, command: Command) -> bool {
    match command {
        Command::Start(live_id) => {
            if let Err(e) = controller.start(&live_id).await {
                eprintln!("cannot start: {e}");
            }
        }
        Command::Stop => controller.stop().await,
        Command::Feature(feature, Some(enabled)) => controller.set_feature(feature, enabled),
        Command::Feature(feature, None) => {
            let enabled = controller.toggle(feature);
            println!("{feature}: {}", if enabled { "on" } else { "off" });
        }
        Command::Status => {
            let live_id = controller
                .live_id()
                .await
                .map_or_else(|| "-".to_string(), |id| id.to_string());
            let features = controller
                .features()
                .iter()
                .map(|(f, on)| format!("{f}={}", if *on { "on" } else { "off" }))
                .collect::<Vec<_>>()
                .join(" ");
            println!("live {live_id}: {} ({features})", controller.state());
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
    }
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let path = args.settings.clone().unwrap_or_else(settings_path);
    let mut settings = load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    args.apply(&mut settings);

    livecast_core::logging::init_subscriber(
        &settings.logging.level,
        settings.logging.file.as_deref().map(Path::new),
    )
    .context("Failed to open log file")?;

    let collaborators = Collaborators {
        resolver: Arc::new(HttpSessionResolver::new(&settings.session)),
        signer: signer_from_settings(&settings.signer),
        renderer: Arc::new(CommandRenderer::new(&settings.speech)),
        display: Arc::new(|count: i64| println!("viewers: {count}")),
        toggles: Arc::new(SpeechToggles::new()),
    };
    let controller = LiveController::new(settings, collaborators);

    if let Some(live_id) = &args.live_id {
        controller
            .start(live_id)
            .await
            .context("Failed to start session")?;
    }
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line.context("Failed to read stdin")? {
                    Some(line) => match parse_command(&line) {
                        Ok(Some(command)) => {
                            if !execute(&controller, command).await {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(msg) => eprintln!("{msg}"),
                    },
                    // No more commands; keep running until ctrl-c.
                    None => stdin_open = false,
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for ctrl-c")?;
                break;
            }
        }
    }

    tracing::info!("Shutting down...");
    controller.stop().await;
    Ok(())
}
