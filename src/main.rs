//! # medirag CLI
//!
//! The `medirag` binary builds the corpus artifact and queries it.
//!
//! ## Usage
//!
//! ```bash
//! medirag --config ./config/medirag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `medirag build` | Scan the configured corpora, embed them, write the artifact |
//! | `medirag query "<text>"` | Retrieve the most similar QA pairs |
//! | `medirag stats` | Summarise the artifact |
//! | `medirag sources` | List configured corpora and whether they exist |
//! | `medirag completions <shell>` | Print shell completions |

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use medirag::progress::ProgressMode;
use medirag::search::QueryOutput;
use medirag::{config, ingest, search, sources, stats};

/// medirag: semantic retrieval over medical question/answer corpora.
///
/// All commands except `completions` read a TOML configuration file. See
/// `config/medirag.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "medirag",
    about = "Semantic retrieval over medical question/answer corpora",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/medirag.toml")]
    config: PathBuf,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the corpus artifact from the configured input corpora.
    ///
    /// Every run replaces the artifact. If any step fails, the previous
    /// artifact is left untouched.
    Build {
        /// Scan and count documents without embedding or writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Progress output on stderr. Defaults to human on a terminal, off otherwise.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Retrieve the QA pairs most similar to a question.
    Query {
        /// The question to search for.
        query: String,

        /// Number of pairs to return. Defaults to `retrieval.top_k`.
        #[arg(long)]
        top_k: Option<usize>,

        /// Print the result as JSON.
        #[arg(long, conflicts_with = "prompt")]
        json: bool,

        /// Print a grounded LLM prompt built from the retrieved context.
        #[arg(long)]
        prompt: bool,
    },

    /// Show what the corpus artifact contains.
    Stats,

    /// List configured input corpora and whether their paths exist.
    Sources,

    /// Generate shell completions and print them to stdout.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(filter) = EnvFilter::try_from_default_env() {
        filter
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "medirag", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Build { dry_run, progress } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            ingest::run_build(&cfg, dry_run, mode).await?;
        }
        Commands::Query {
            query,
            top_k,
            json,
            prompt,
        } => {
            let output = if json {
                QueryOutput::Json
            } else if prompt {
                QueryOutput::Prompt
            } else {
                QueryOutput::Human
            };
            search::run_query(&cfg, &query, top_k, output).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg)?;
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
