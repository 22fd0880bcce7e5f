mod config;
mod extract;
mod extractor;
mod matchers;
mod metrics;
mod reader;
mod session_paths;
mod timestamps;
mod viewer;
mod writer;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use viewer::{Selection, SessionOptions, SessionSource};

/// Extract the interesting lines of a Voyager observing session log,
/// annotate them with comments, and decode focus, guiding and pointing metrics.
#[derive(Parser, Debug)]
#[command(name = "voyager-extract", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "voyager.toml", global = true)]
    config: PathBuf,

    /// Print resolved configuration and exit
    #[arg(long, global = true)]
    dry_run: bool,

    /// Extra logging (path resolution, skipped lines)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile extracts from a Voyager log (plus the next day's log if present)
    Extract {
        /// Voyager log file, e.g. 2021_12_11_Voyager.log
        #[arg(value_name = "LOG_FILE")]
        file: PathBuf,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Reopen a saved extracts file together with its comments
    Reopen {
        /// Extracts file, e.g. 2021_12_11_Voyager.extracts.log
        #[arg(value_name = "EXTRACTS_FILE")]
        file: PathBuf,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Decode focus, guiding and pointing metrics for a session
    Metrics {
        /// Voyager log file, or extracts file with --extracts
        file: PathBuf,
        /// Treat FILE as a saved extracts file
        #[arg(long)]
        extracts: bool,
        /// Write the metrics CSV beside the session extracts
        #[arg(long)]
        save: bool,
    },
    /// Inspect or change the matcher catalog
    Matchers {
        #[command(subcommand)]
        action: MatchersAction,
    },
    /// List Voyager logs and saved extracts
    Sessions,
}

#[derive(clap::Args, Debug)]
struct SessionArgs {
    /// Add a user comment (repeatable)
    #[arg(long = "comment", value_name = "TEXT")]
    comments: Vec<String>,
    /// Write the comments and extracts files
    #[arg(long)]
    save: bool,
    /// Print records as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum MatchersAction {
    /// Print every rule with its enabled flag and category
    List,
    /// Bulk-enable a preset group of rules and save the catalog
    Select {
        #[arg(value_enum)]
        selection: Selection,
    },
    /// Enable or disable one rule by its 1-based position and save the catalog
    Toggle {
        index: usize,
        /// Disable instead of enable
        #[arg(long)]
        off: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(?cli, "parsed CLI arguments");

    let config = match config::ViewerConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if cli.dry_run {
        println!("Config file: {}", cli.config.display());
        println!("Extracts folder: {}", config.extracts_dir().display());
        match toml::to_string_pretty(&config) {
            Ok(s) => print!("{s}"),
            Err(e) => eprintln!("Error: failed to render config: {e}"),
        }
        return;
    }

    let Some(command) = cli.command else {
        eprintln!("Error: no command given; see --help");
        std::process::exit(2);
    };

    let result = match command {
        Commands::Extract { file, session } => viewer::handle_session(
            &config,
            SessionSource::Log,
            &file,
            &session.options(),
        ),
        Commands::Reopen { file, session } => viewer::handle_session(
            &config,
            SessionSource::Extracts,
            &file,
            &session.options(),
        ),
        Commands::Metrics {
            file,
            extracts,
            save,
        } => {
            let source = if extracts {
                SessionSource::Extracts
            } else {
                SessionSource::Log
            };
            viewer::handle_metrics(&config, source, &file, save)
        }
        Commands::Matchers { action } => match action {
            MatchersAction::List => viewer::handle_matchers_list(&config),
            MatchersAction::Select { selection } => {
                viewer::handle_matchers_select(&config, selection)
            }
            MatchersAction::Toggle { index, off } => {
                viewer::handle_matchers_toggle(&config, index, !off)
            }
        },
        Commands::Sessions => viewer::handle_sessions(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

impl SessionArgs {
    fn options(&self) -> SessionOptions<'_> {
        SessionOptions {
            comments: &self.comments,
            save: self.save,
            json: self.json,
        }
    }
}
