use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use providers::{ChatWorker, OllamaClient, TracingObserver};
use shared::agent_api::AvailabilityStatus;
use shared::settings::AppSettings;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::unbounded_channel;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

mod focus;
mod launcher;
mod logging;
mod panel;
mod state;

use focus::{FocusTick, FocusTimer};
use launcher::{LaunchOutcome, Modes};
use panel::{Entry, EntryKind};
use state::ChatSession;

/// RoboSwish - mode launcher, focus timer and local LLM chat assistant
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Settings file (KEY=value lines)
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Mode list: {"<mode>": ["<url>", ...]}
    #[arg(long, default_value = launcher::MODES_FILE)]
    modes_file: PathBuf,

    /// Diagnostic log
    #[arg(long, default_value = "roboswish_debug.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Option<Cmd>,
}

/// One day.
const MAX_FOCUS_MINUTES: u64 = 24 * 60;

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Interactive sidebar session (default)
    Chat,
    /// Send one prompt and print the reply
    Ask {
        #[arg(required = true)]
        prompt: Vec<String>,
    },
    /// Check that the model server lists the configured model
    Check,
    /// Run a focus burst in the foreground
    Focus {
        #[arg(
            long,
            default_value_t = 5,
            value_parser = clap::value_parser!(u64).range(1..=MAX_FOCUS_MINUTES)
        )]
        minutes: u64,
    },
    /// List configured modes
    Modes,
    /// Open a mode's URLs in a new browser window
    Launch { mode: String },
    /// Update and persist settings
    Configure {
        #[arg(long)]
        browser: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = logging::init(&args.log_file);

    let settings = AppSettings::load(&args.env_file)?;
    info!(
        chat_url = %settings.chat_url,
        model = %settings.model,
        browser = %settings.browser_command,
        "settings loaded"
    );

    match args.command.unwrap_or(Cmd::Chat) {
        Cmd::Chat => run_chat(&settings, &args.modes_file).await,
        Cmd::Ask { prompt } => run_ask(&settings, &prompt.join(" ")).await,
        Cmd::Check => run_check(&settings).await,
        Cmd::Focus { minutes } => run_focus(minutes).await,
        Cmd::Modes => {
            let modes = launcher::load_modes(&args.modes_file)?;
            print_modes(&modes);
            Ok(())
        }
        Cmd::Launch { mode } => {
            let modes = launcher::load_modes(&args.modes_file)?;
            let urls = modes
                .get(&mode)
                .ok_or_else(|| anyhow!("unknown mode '{}'", mode))?;
            let outcome = launcher::launch_mode(&settings.browser_command, urls, false)?;
            println!("{}", describe_launch(&mode, &outcome));
            Ok(())
        }
        Cmd::Configure {
            browser,
            url,
            model,
        } => {
            let mut updated = settings.clone();
            if let Some(browser) = browser {
                updated.browser_command = browser;
            }
            if let Some(url) = url {
                updated.chat_url = url;
            }
            if let Some(model) = model {
                updated.model = model;
            }
            updated.chat_config()?;
            updated.save(&args.env_file)?;
            println!("Settings saved. Restart RoboSwish to apply new settings.");
            Ok(())
        }
    }
}

fn build_worker(settings: &AppSettings) -> Result<(Arc<OllamaClient>, ChatWorker)> {
    let client = Arc::new(OllamaClient::new(settings.chat_config()?)?);
    let worker = ChatWorker::new(Arc::clone(&client), Arc::new(TracingObserver));
    Ok((client, worker))
}

async fn run_ask(settings: &AppSettings, prompt: &str) -> Result<()> {
    let (_client, worker) = build_worker(settings)?;
    let (mut session, mut events) = ChatSession::new(worker);
    session.submit(prompt)?;

    let event = events
        .recv()
        .await
        .context("chat worker stopped without a result")?;
    let entry = session
        .handle_event(event)
        .context("chat result did not match the request")?;
    match entry.kind {
        EntryKind::Error => Err(anyhow!("{}", entry.body)),
        _ => {
            println!("{}", entry.body);
            Ok(())
        }
    }
}

async fn run_check(settings: &AppSettings) -> Result<()> {
    let (client, _worker) = build_worker(settings)?;
    let status = client.check_available().await;
    println!("{}", describe_availability(&settings.model, &status));
    if status.available {
        Ok(())
    } else {
        Err(anyhow!("model server check failed"))
    }
}

async fn run_focus(minutes: u64) -> Result<()> {
    let mut timer = FocusTimer::new(Duration::from_secs(minutes * 60));
    timer.start();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await;
    print_inline(&timer.label());
    loop {
        ticker.tick().await;
        match timer.tick() {
            FocusTick::Running { label } => print_inline(&label),
            FocusTick::Finished | FocusTick::Idle => break,
        }
    }
    println!("\n{}", focus_complete_message(&timer));
    Ok(())
}

async fn run_chat(settings: &AppSettings, modes_file: &Path) -> Result<()> {
    let (client, worker) = build_worker(settings)?;
    let (mut session, mut events) = ChatSession::new(worker);

    // Advisory only: chat stays enabled whatever the probe says
    let (notice_tx, mut notices) = unbounded_channel::<AvailabilityStatus>();
    let probe = Arc::clone(&client);
    tokio::spawn(async move {
        let status = probe.check_available().await;
        let _ = notice_tx.send(status);
    });

    let modes = match launcher::load_modes(modes_file) {
        Ok(modes) => modes,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "no modes loaded");
            session
                .panel_mut()
                .note(format!("Error loading modes: {:#}", e));
            Modes::new()
        }
    };

    let mut focus = FocusTimer::default();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    println!("RoboSwish Chat Assistant ({})", settings.model);
    print_help();
    for entry in session.panel().entries() {
        print_entry(entry);
    }

    loop {
        tokio::select! {
            line = stdin.next_line() => {
                let Some(line) = line.context("reading stdin")? else { break };
                let keep_going = handle_line(
                    line.trim(),
                    &mut session,
                    &mut focus,
                    &modes,
                    &settings.browser_command,
                );
                if !keep_going {
                    break;
                }
            }
            Some(event) = events.recv() => {
                if let Some(entry) = session.handle_event(event) {
                    print_entry(entry);
                }
            }
            Some(status) = notices.recv() => {
                if !status.available {
                    println!(
                        "! Model server not available. AI chat will not work.\n  {}",
                        status.detail.unwrap_or_default()
                    );
                }
            }
            _ = ticker.tick() => {
                match focus.tick() {
                    FocusTick::Running { label } if focus.time_left() % 60 == 0 => {
                        println!("{}", label)
                    }
                    FocusTick::Finished => println!("{}", focus_complete_message(&focus)),
                    _ => {}
                }
            }
        }
    }

    if session.panel().pending() {
        info!("exiting with a chat request in flight");
        session.cancel();
    }
    Ok(())
}

/// Returns false when the user asked to quit.
fn handle_line(
    line: &str,
    session: &mut ChatSession,
    focus: &mut FocusTimer,
    modes: &Modes,
    browser: &str,
) -> bool {
    if line.is_empty() {
        return true;
    }
    let Some(command) = line.strip_prefix('/') else {
        match session.submit(line) {
            Ok(_) => {
                if let Some(placeholder) = session.panel().entries().last() {
                    print_entry(placeholder);
                }
            }
            Err(e) => println!("! {}", e),
        }
        return true;
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(n, r)| (n, r.trim()))
        .unwrap_or((command, ""));
    match name {
        "quit" | "exit" => return false,
        "help" => print_help(),
        "cancel" => {
            if !session.cancel() {
                println!("! Nothing to cancel");
            }
        }
        "focus" => {
            if focus.start() {
                println!("{}", focus.label());
            } else {
                println!("! Focus burst already running: {}", focus.label());
            }
        }
        "modes" => print_modes(modes),
        "launch" => match modes.get(rest) {
            None => println!("! Unknown mode '{}'", rest),
            Some(urls) => match launcher::launch_mode(browser, urls, focus.is_running()) {
                Ok(outcome) => println!("{}", describe_launch(rest, &outcome)),
                Err(e) => println!("! {:#}", e),
            },
        },
        other => println!("! Unknown command '/{}'. Try /help", other),
    }
    true
}

fn print_entry(entry: &Entry) {
    let marker = match entry.kind {
        EntryKind::Error => "[error] ",
        _ => "",
    };
    println!(
        "[{}] {}: {}{}",
        entry.timestamp,
        entry.sender.label(),
        marker,
        entry.body
    );
}

fn print_help() {
    println!("Type a message to chat. Commands: /focus /modes /launch <mode> /cancel /help /quit");
}

fn print_modes(modes: &Modes) {
    if modes.is_empty() {
        println!("No modes configured");
    }
    for (name, urls) in modes {
        println!("{}: {}", name, urls.join(", "));
    }
}

fn print_inline(text: &str) {
    print!("\r{}", text);
    let _ = std::io::stdout().flush();
}

fn describe_launch(mode: &str, outcome: &LaunchOutcome) -> String {
    match outcome {
        LaunchOutcome::Launched { pid } => format!("Launched '{}' (pid {})", mode, pid),
        LaunchOutcome::NoUrls => format!("Mode '{}' has no URLs", mode),
        LaunchOutcome::FocusLocked => "Launching is locked during a focus burst".to_string(),
    }
}

fn describe_availability(model: &str, status: &AvailabilityStatus) -> String {
    if status.available {
        format!("Model '{}' is available", model)
    } else {
        format!(
            "Model server not available.\n{}",
            status.detail.as_deref().unwrap_or_default()
        )
    }
}

fn focus_complete_message(timer: &FocusTimer) -> String {
    format!(
        "{} minutes of super focus is up! Time for a break or next burst.",
        timer.minutes()
    )
}
