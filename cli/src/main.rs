use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use questbot_cli::commands;
use questbot_cli::console::ConsoleMessenger;
use questbot_cli::readline;
use questbot_core::definitions::default_quests_dir;
use questbot_core::participants::default_data_dir;
use questbot_core::{
    Command, CommandRouter, Notifier, ParticipantId, ParticipantStore, QuestScheduler, Sender,
    SharedState, TemplateStore,
};
use questbot_types::EngineConfig;
use tracing_subscriber::EnvFilter;

/// Startup options.
#[derive(Parser)]
#[command(version, about = "Team quest engine console")]
struct Args {
    /// Config file (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Quest definition directory, overriding the config
    #[arg(short, long)]
    quests: Option<PathBuf>,

    /// Keep participants in memory only
    #[arg(long)]
    ephemeral: bool,
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    if let Ok(path) = std::env::var("QUESTBOT_LOG_PATH") {
        if let Ok(file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(file)
                .init();
            return;
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> EngineConfig {
    let loaded = match path {
        Some(path) => confy::load_path(path),
        None => confy::load("questbot", None),
    };
    loaded.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Config unreadable, using defaults");
        EngineConfig::default()
    })
}

fn load_templates(config: &EngineConfig) -> TemplateStore {
    let mut store = TemplateStore::builtin(config.default_locale.as_str());
    if let Some(path) = &config.templates_path {
        match store.merge_file(path) {
            Ok(count) => tracing::info!(count, path = ?path, "Loaded template overrides"),
            Err(e) => tracing::warn!(error = %e, "Template overrides ignored"),
        }
    }
    store
}

/// Relative paths that don't exist here are looked up under `base`.
fn resolve(path: &Path, base: Option<PathBuf>) -> PathBuf {
    if path.is_absolute() || path.exists() {
        return path.to_path_buf();
    }
    base.map(|dir| dir.join(path))
        .unwrap_or_else(|| path.to_path_buf())
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_logging();
    let args = Args::parse();

    let config = load_config(args.config.as_deref());
    let templates = load_templates(&config);
    let notifier = Notifier::new(Arc::new(ConsoleMessenger), Arc::new(templates));

    let quests_dir = args.quests.clone().unwrap_or_else(|| {
        if config.quests_dir.exists() {
            config.quests_dir.clone()
        } else {
            default_quests_dir().unwrap_or_else(|| config.quests_dir.clone())
        }
    });
    let participants_path = resolve(&config.participants_path, default_data_dir());

    let mut state = SharedState::new(config, notifier);
    if !args.ephemeral {
        state = state.with_store(ParticipantStore::new(&participants_path));
    }
    let state = Arc::new(state);

    if quests_dir.is_dir() {
        match state.load_quests(&quests_dir).await {
            Ok(count) => println!("Loaded {} quests from {}", count, quests_dir.display()),
            Err(e) => println!("{e}"),
        }
    } else {
        println!("Warning: quest directory {} does not exist", quests_dir.display());
    }

    match state.restore_participants().await {
        Ok(count) if count > 0 => println!("Restored {count} participants"),
        Ok(_) => {}
        Err(e) => println!("{e}"),
    }

    let router = CommandRouter::new(Arc::clone(&state));
    let scheduler = QuestScheduler::new(Arc::clone(&state));
    let handle = scheduler.clone().spawn();

    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, &router, &scheduler).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                write!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

#[derive(Parser)]
#[command(version, about = "questbot console", disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Participant commands take the participant id first (it doubles as chat id).
#[derive(Subcommand)]
enum Commands {
    Start {
        id: ParticipantId,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        locale: Option<String>,
    },
    Help {
        id: ParticipantId,
    },
    Register {
        id: ParticipantId,
        event_id: String,
    },
    Unregister {
        id: ParticipantId,
    },
    Answer {
        id: ParticipantId,
        text: String,
    },
    Hint {
        id: ParticipantId,
    },
    Nickname {
        id: ParticipantId,
        name: String,
    },
    Deleteme {
        id: ParticipantId,
    },
    Aboutme {
        id: ParticipantId,
    },
    Aboutteam {
        id: ParticipantId,
    },
    Aboutquest {
        id: ParticipantId,
    },
    /// List quests with their state and teams
    Quests,
    /// List participants
    Participants,
    /// Run one scheduler tick now
    Tick,
    Exit,
}

async fn respond(line: &str, router: &CommandRouter, scheduler: &QuestScheduler) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "questbot".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    let (sender, command) = match cli.command {
        Some(Commands::Start { id, name, locale }) => {
            let mut sender = Sender::new(id, id);
            sender.username = name;
            sender.locale = locale;
            (sender, Command::Start)
        }
        Some(Commands::Help { id }) => (Sender::new(id, id), Command::Help),
        Some(Commands::Register { id, event_id }) => (Sender::new(id, id), Command::Register(event_id)),
        Some(Commands::Unregister { id }) => (Sender::new(id, id), Command::Unregister),
        Some(Commands::Answer { id, text }) => (Sender::new(id, id), Command::Answer(text)),
        Some(Commands::Hint { id }) => (Sender::new(id, id), Command::Hint),
        Some(Commands::Nickname { id, name }) => (Sender::new(id, id), Command::Nickname(name)),
        Some(Commands::Deleteme { id }) => (Sender::new(id, id), Command::DeleteMe),
        Some(Commands::Aboutme { id }) => (Sender::new(id, id), Command::AboutMe),
        Some(Commands::Aboutteam { id }) => (Sender::new(id, id), Command::AboutTeam),
        Some(Commands::Aboutquest { id }) => (Sender::new(id, id), Command::AboutQuest),
        Some(Commands::Quests) => {
            commands::list_quests(Arc::clone(router.state())).await;
            return Ok(false);
        }
        Some(Commands::Participants) => {
            commands::list_participants(Arc::clone(router.state())).await;
            return Ok(false);
        }
        Some(Commands::Tick) => {
            commands::tick(scheduler).await;
            return Ok(false);
        }
        Some(Commands::Exit) => {
            commands::exit();
            return Ok(true);
        }
        None => return Ok(false),
    };

    // Failures are already replied to the participant
    let _ = router.handle(&sender, command).await;
    Ok(false)
}
