use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chatlist::ui::sidebar::Sidebar;
use chatlist::utils::{block_on, share_url};
use chatlist::{AppState, ChatSession, SidebarEvent};

/// Conversation list for the chat backend
#[derive(Parser, Debug)]
#[command(name = "chatlist", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the backend URL from config
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show conversations grouped by date
    List {
        /// Print a share link under each conversation
        #[arg(long)]
        links: bool,
    },
    /// Start a new conversation
    New,
    /// Print the share link of a conversation
    Link { id: String },
    /// Print the effective configuration
    Config,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut state = match &cli.config {
        Some(path) => match AppState::load_from(path) {
            Ok(state) => state,
            Err(e) => {
                eprintln!("Could not load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => AppState::load(),
    };
    if let Some(url) = cli.base_url {
        state.base_url = url;
    }

    match cli.command.unwrap_or(Command::List { links: false }) {
        Command::List { links } => list(&state, links),
        Command::New => new_chat(&state),
        Command::Link { id } => match share_url(&state.origin, &id) {
            Ok(url) => {
                println!("{}", url);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Invalid origin {}: {}", state.origin, e);
                ExitCode::FAILURE
            }
        },
        Command::Config => {
            if let Some(path) = AppState::toml_path() {
                println!("# {}", path.display());
            }
            match toml::to_string_pretty(&state) {
                Ok(text) => {
                    print!("{}", text);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn connect(state: &AppState) -> Option<ChatSession> {
    match ChatSession::connect(state) {
        Ok(session) => Some(session),
        Err(e) => {
            eprintln!("Invalid backend URL {}: {}", state.base_url, e);
            None
        }
    }
}

fn sidebar(state: &AppState, links: bool) -> Sidebar {
    if links {
        Sidebar::with_links(state.origin.clone())
    } else {
        Sidebar::new()
    }
}

fn list(state: &AppState, links: bool) -> ExitCode {
    let Some(session) = connect(state) else {
        return ExitCode::FAILURE;
    };
    let chats = block_on(session.cache.read());
    print!("{}", sidebar(state, links).render(&chats, session.cache.status(), &Local::now()));
    ExitCode::SUCCESS
}

fn new_chat(state: &AppState) -> ExitCode {
    let Some(session) = connect(state) else {
        return ExitCode::FAILURE;
    };
    let mut events = session.coordinator.subscribe();
    let created = block_on(async {
        session.cache.read().await;
        let created = session.coordinator.create_conversation().await;
        if created.is_ok() {
            session.coordinator.settle().await;
        }
        created
    });

    while let Ok(event) = events.try_recv() {
        match event {
            SidebarEvent::Navigate { route, .. } => println!("Opened {}", route),
            SidebarEvent::CreationFailed { message } => eprintln!("{}", message),
        }
    }
    if created.is_err() {
        return ExitCode::FAILURE;
    }

    let chats = session.cache.snapshot();
    print!("{}", sidebar(state, false).render(&chats, session.cache.status(), &Local::now()));
    ExitCode::SUCCESS
}
