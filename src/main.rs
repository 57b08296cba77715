//! # Markdown Mirror CLI (`mdmirror`)
//!
//! ## Usage
//!
//! ```bash
//! mdmirror --config ./config/mdmirror.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mdmirror serve` | Start the HTTP server |
//! | `mdmirror render <path>` | Print the Markdown document for a record |
//! | `mdmirror classify <path>` | Show how a request would be classified |
//! | `mdmirror agents` | List the resolved LLM agent signatures |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use markdown_mirror::{classify, config, respond, server};

/// Markdown Mirror: serve Markdown renditions of CMS content to LLM agents.
#[derive(Parser)]
#[command(name = "mdmirror", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/mdmirror.toml")]
    config: PathBuf,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` and serves content from `[site].content_dir`,
    /// answering classified requests with Markdown.
    Serve,

    /// Print the Markdown document for a record path.
    Render {
        /// Record path, e.g. `hello-world` or `docs/intro.md`.
        path: String,
    },

    /// Show how a request would be classified.
    Classify {
        /// Request path, e.g. `/hello-world.md`.
        path: String,

        /// `User-Agent` header value.
        #[arg(long)]
        user_agent: Option<String>,

        /// Query parameters as `key=value` pairs.
        #[arg(long = "query", value_parser = parse_key_val)]
        query: Vec<(String, String)>,
    },

    /// List the resolved LLM agent signatures (built-in + `[agents]`).
    Agents,
}

/// Parse a `key=value` pair for `--query` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if quiet {
        EnvFilter::new("warn")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Render { path } => {
            respond::run_render(&cfg, &path).await?;
        }
        Commands::Classify {
            path,
            user_agent,
            query,
        } => {
            classify::run_classify(&cfg, &path, user_agent.as_deref(), query)?;
        }
        Commands::Agents => {
            classify::list_agents(&cfg)?;
        }
    }

    Ok(())
}
