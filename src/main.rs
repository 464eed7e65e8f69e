//! Pathway - Adaptive Learning Progression & Assessment Engine
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pathway::cli::challenge::{ChallengeCommand, ChallengeOptions};
use pathway::cli::complete::{CompleteCommand, CompleteOptions};
use pathway::cli::path_cmd::{PathCommand, PathOptions};
use pathway::config::{pathway_home, Config};
use pathway::core::Catalog;
use pathway::error::exit_codes;
use pathway::storage::FileLearnerStore;

// =============================================================================
// CLI Definition
// =============================================================================

/// Pathway - adaptive learning path and daily challenges
#[derive(Parser)]
#[command(name = "pathway")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output as JSON
    #[arg(long, short, global = true)]
    json: bool,

    /// Suppress output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Catalog file (overrides config)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every module with lock state, progress, and the recommendation
    Path,

    /// Show the recommended next lesson
    Next,

    /// Mark a lesson completed
    Complete {
        /// Lesson ID
        lesson_id: String,
    },

    /// Work through a daily challenge
    Challenge {
        #[command(subcommand)]
        action: ChallengeAction,
    },
}

#[derive(Subcommand)]
enum ChallengeAction {
    /// List available challenges
    List,
    /// Start a challenge, replacing any active session
    Start {
        /// Challenge ID
        challenge_id: String,
    },
    /// Select an option for the current question
    Select {
        /// Zero-based option index
        index: usize,
    },
    /// Submit the selected answer
    Submit,
    /// Continue past the explanation
    Advance,
    /// Show the active session
    Status,
    /// Drop the active session
    Abandon,
}

// =============================================================================
// Main
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    init_logging();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("pathway error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

/// Log to stderr so `--json` output on stdout stays parseable.
fn init_logging() {
    let filter = EnvFilter::try_from_env("PATHWAY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.pathway/crash.log and exits with the error code.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("pathway panic: {}", info);

        if let Some(home) = pathway_home() {
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::ERROR);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let config = Config::load_from_cwd(&cwd);

    let catalog_path = cli
        .catalog
        .clone()
        .unwrap_or_else(|| config.catalog_path(&cwd));
    let catalog = load_catalog(&catalog_path)?;
    let store = FileLearnerStore::from_config(&config)?;

    match cli.command {
        Commands::Path => run_path(store, catalog, config, cli.json, cli.quiet, false),
        Commands::Next => run_path(store, catalog, config, cli.json, cli.quiet, true),
        Commands::Complete { lesson_id } => {
            run_complete(store, catalog, config, &lesson_id, cli.json, cli.quiet)
        }
        Commands::Challenge { action } => {
            run_challenge(store, catalog, config, action, cli.json, cli.quiet)
        }
    }
}

fn load_catalog(path: &Path) -> Result<Catalog, Box<dyn std::error::Error>> {
    tracing::debug!(path = %path.display(), "loading catalog");
    Catalog::load(path).map_err(|e| format!("{} ({})", e, path.display()).into())
}

fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}

fn emit(formatted: &str) {
    if formatted.is_empty() {
        return;
    }
    if formatted.ends_with('\n') {
        print!("{}", formatted);
    } else {
        println!("{}", formatted);
    }
}

fn run_path(
    store: FileLearnerStore,
    catalog: Catalog,
    config: Config,
    json: bool,
    quiet: bool,
    next_only: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = PathCommand::new(store, catalog, config);
    let options = PathOptions { json, quiet };

    if next_only {
        let output = cmd.next(&options);
        emit(&cmd.format_next(&output, &options));
        return Ok(success_to_exit_code(output.success));
    }

    let output = cmd.run(&options);
    emit(&cmd.format_output(&output, &options));
    Ok(success_to_exit_code(output.success))
}

fn run_complete(
    store: FileLearnerStore,
    catalog: Catalog,
    config: Config,
    lesson_id: &str,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = CompleteCommand::new(store, catalog, config);
    let options = CompleteOptions { json, quiet };

    let output = cmd.run(lesson_id, &options);
    emit(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_challenge(
    store: FileLearnerStore,
    catalog: Catalog,
    config: Config,
    action: ChallengeAction,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = ChallengeCommand::new(store, catalog, config);
    let options = ChallengeOptions { json, quiet };

    let output = match action {
        ChallengeAction::List => cmd.list(&options),
        ChallengeAction::Start { challenge_id } => cmd.start(&challenge_id, &options),
        ChallengeAction::Select { index } => cmd.select(index, &options),
        ChallengeAction::Submit => cmd.submit(&options),
        ChallengeAction::Advance => cmd.advance(&options),
        ChallengeAction::Status => cmd.status(&options),
        ChallengeAction::Abandon => cmd.abandon(&options),
    };
    emit(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}
