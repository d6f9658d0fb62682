use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::*;
use tracing::info;

mod analysis;
mod app;
mod config;
mod controller;
mod conversation;
mod handler;
mod logging;
mod markdown;
mod notify;
mod tui;
mod ui;
mod view;

use analysis::{AnalysisClient, AnalysisService, Attachment};
use app::App;
use config::{Config, MissingFilePolicy};
use controller::{Controller, Draft, Effect, Event};
use conversation::{ChatMessage, ChatRole, ConversationState};
use logging::LogTarget;
use notify::{ConsoleNotifier, Notifier};
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "resume-chat")]
#[command(version)]
#[command(about = "Chat-style resume analysis against a job description")]
struct Cli {
    /// Analysis service endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,
    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,
    /// What to do when submitting without a resume
    #[arg(long, global = true, value_enum)]
    missing_file: Option<MissingFilePolicy>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat interface (default)
    Chat,
    /// Analyze a resume once and print the conversation
    Analyze {
        /// Resume file (PDF)
        #[arg(short, long)]
        resume: Option<PathBuf>,
        /// Job description text
        #[arg(short, long)]
        job: String,
    },
    /// Inspect or persist settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective settings
    Show,
    /// Write the effective settings to the config file
    Save,
    /// Print the config file location
    Path,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_secs = timeout;
        }
        if let Some(policy) = self.missing_file {
            config.missing_file_policy = policy;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // load .env if present; ignore if missing

    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("{}: {:#}", "Ignoring unreadable config".yellow(), e);
        Config::new()
    });
    config.apply_env()?;
    cli.apply(&mut config);

    match cli.command {
        None | Some(Commands::Chat) => run_chat(config).await,
        Some(Commands::Analyze { resume, job }) => run_analyze(config, resume, job).await,
        Some(Commands::Config { action }) => run_config(&config, action),
    }
}

async fn run_chat(config: Config) -> Result<()> {
    let _guard = logging::init(&config.log_level, LogTarget::File)?;
    info!(
        endpoint = %config.endpoint,
        missing_file = config.missing_file_policy.as_str(),
        "starting resume-chat v{}",
        env!("CARGO_PKG_VERSION")
    );

    let service: Arc<dyn AnalysisService> =
        Arc::new(AnalysisClient::new(&config.endpoint, config.request_timeout())?);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(&config, service, events.sender());

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    app.shutdown();
    tui::restore()?;
    info!(turns = app.conversation.len(), "session closed");
    result
}

async fn run_loop(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}

async fn run_analyze(config: Config, resume: Option<PathBuf>, job: String) -> Result<()> {
    let _guard = logging::init(&config.log_level, LogTarget::Stderr)?;
    info!(endpoint = %config.endpoint, "headless analysis");

    let client = AnalysisClient::new(&config.endpoint, config.request_timeout())?;
    let mut controller = Controller::new(config.missing_file_policy, config.toast_duration());
    let mut notifier = ConsoleNotifier;

    let state = analyze_once(&client, &mut controller, &mut notifier, resume, job).await?;
    for line in transcript(state.all()) {
        println!("{}", line);
    }
    Ok(())
}

/// Run one submission through the controller, performing its effects inline
async fn analyze_once(
    service: &dyn AnalysisService,
    controller: &mut Controller,
    notifier: &mut dyn Notifier,
    resume: Option<PathBuf>,
    job: String,
) -> Result<ConversationState> {
    let mut state = ConversationState::new();
    let mut pending = VecDeque::new();

    let attachment = match resume {
        Some(path) => {
            if !path.is_file() {
                bail!("Resume not found: {}", path.display());
            }
            let attachment = Attachment::new(path);
            pending.push_back(Event::FileSelected(attachment.clone()));
            Some(attachment)
        }
        None => None,
    };
    pending.push_back(Event::Submit(Draft::new(job, attachment)));

    while let Some(event) = pending.pop_front() {
        for effect in controller.handle(&mut state, event, Local::now()) {
            match effect {
                Effect::Upload(request) => {
                    println!("{}", "🤖 Analyzing...".bold().magenta());
                    let outcome = service
                        .analyze(&request.job_description, request.resume.as_ref())
                        .await
                        .map_err(|e| e.user_message());
                    pending.push_back(Event::AnalysisFinished {
                        request: request.id,
                        outcome,
                    });
                }
                Effect::Notify(n) => notifier.notify(n.kind, &n.text, n.duration),
                Effect::ClearDraft | Effect::ScrollToLatest => {}
            }
        }
    }

    if state.is_empty() {
        bail!("Nothing submitted: the job description is empty or was rejected");
    }
    Ok(state)
}

fn transcript(messages: &[ChatMessage]) -> Vec<String> {
    let mut out = Vec::new();
    for message in messages {
        match message.role {
            ChatRole::User => {
                out.push(format!("\n{}", "You:".bold().cyan()));
                out.push(message.content.clone());
            }
            ChatRole::Assistant => {
                out.push(format!("\n{}", "AI:".bold().yellow()));
                out.extend(
                    markdown::to_lines(&markdown::parse(&message.content))
                        .iter()
                        .map(|line| line.to_string()),
                );
            }
        }
    }

    if !messages.iter().any(|m| m.role == ChatRole::Assistant) {
        out.push(format!(
            "\n{}",
            "No analysis requested. Attach a resume with --resume.".yellow()
        ));
    }
    out
}

fn run_config(config: &Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigAction::Save => {
            let path = config.save()?;
            println!("{} {}", "Saved config to".green(), path.display());
        }
        ConfigAction::Path => {
            println!("{}", Config::get_config_path()?.display());
        }
    }
    Ok(())
}
