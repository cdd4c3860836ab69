use clap::{ArgAction, Parser, Subcommand};
use commands::{clear, config, crawl, history, pick, resolve};
use marquee_config::{Config, PathManager};

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "marquee")]
#[command(about = "Marquee - Turn a public film watchlist into resolved movie records")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Local profile whose stored watchlist and picks are used
    #[arg(long, global = true, default_value = "default")]
    profile: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a user's watchlist (or reuse the stored one)
    #[command(long_about = "Walk every page of a user's public watchlist and store the result for this profile. A stored, complete watchlist for the same user is reused unless --refresh is given.")]
    Crawl {
        /// Listing username
        username: String,

        /// Crawl again even when a stored watchlist exists
        #[arg(long, action = ArgAction::SetTrue)]
        refresh: bool,
    },
    /// Resolve the visible part of a watchlist against the catalog
    #[command(long_about = "Show the first window of a watchlist with full movie metadata. Each --reveal grows the window by one window size. Pinned titles are resolved alongside the window even when they are not visible.")]
    Resolve {
        username: String,

        /// Entries per window (defaults to window.size from config)
        #[arg(long)]
        size: Option<usize>,

        /// Reveal this many additional windows
        #[arg(long, default_value_t = 0)]
        reveal: usize,

        /// Keep a title resolved regardless of the window, e.g. --pin "Heat (1995)"
        #[arg(long, value_name = "TITLE")]
        pin: Vec<String>,

        #[arg(long, action = ArgAction::SetTrue)]
        refresh: bool,
    },
    /// Pick movies from the first window and record the selection
    #[command(long_about = "Choose movies from the resolved first window, at random or by --title, and append the choice to this profile's selection history.")]
    Pick {
        username: String,

        /// How many random picks to make (ignored when --title is given)
        #[arg(long, default_value_t = 1)]
        count: usize,

        /// Pick this title explicitly (repeatable)
        #[arg(long, value_name = "TITLE")]
        title: Vec<String>,

        #[arg(long, action = ArgAction::SetTrue)]
        refresh: bool,
    },
    /// List recorded selections, newest first
    History,
    /// Show or edit configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
    /// Clear stored data
    #[command(long_about = "Clear the on-disk resolution cache (--cache), stored watchlists and selection history (--store), or both (--all).")]
    Clear {
        #[arg(long, action = ArgAction::SetTrue)]
        all: bool,

        /// Clear the resolution cache
        #[arg(long, action = ArgAction::SetTrue)]
        cache: bool,

        /// Clear stored watchlists and selection history
        #[arg(long, action = ArgAction::SetTrue)]
        store: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (masks the API key)
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
    /// Store the catalog API key
    #[command(long_about = "Store the TMDB API key in the credentials file. Prompts with hidden input when --key is not given. MARQUEE_TMDB_API_KEY overrides the stored key at runtime.")]
    SetApiKey {
        #[arg(long)]
        key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // The log file location lives in config; a broken config is reported later by the command itself
    let log_file = Config::load_or_default(&PathManager::default().config_file())
        .ok()
        .and_then(|config| config.logging.file);
    logging::init_logging_with_file(cli.verbose, cli.quiet, log_file)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Crawl { username, refresh } => crawl::run_crawl(&cli.profile, &username, refresh, &output).await,
        Commands::Resolve { username, size, reveal, pin, refresh } => {
            let options = resolve::ResolveOptions { size, reveal, pins: pin, refresh };
            resolve::run_resolve(&cli.profile, &username, options, &output).await
        }
        Commands::Pick { username, count, title, refresh } => {
            pick::run_pick(&cli.profile, &username, count, title, refresh, &output).await
        }
        Commands::History => history::run_history(&cli.profile, &output).await,
        Commands::Config { cmd } => config::run_config(cmd, &output).await,
        Commands::Clear { all, cache, store } => clear::run_clear(all, cache, store, &output).await,
    }
}
