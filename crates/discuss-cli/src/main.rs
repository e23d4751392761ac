use anyhow::Result;
use clap::{Parser, Subcommand};
use discuss_core::feed::{SortBy, TimeWindow};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "discuss")]
#[command(about = "Discuss CLI - browse feeds and manage your session", long_about = None)]
struct Cli {
    /// Backend base URL (overrides DISCUSS_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory holding config.toml and credentials.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List posts of a feed (all, home, saved, thread/<id>, user/<name>)
    Feed {
        #[arg(default_value = "all")]
        selector: String,

        #[arg(long, default_value = "top")]
        sort: SortBy,

        #[arg(long, default_value = "alltime")]
        window: TimeWindow,

        /// Number of pages to scroll through
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Verify the stored credentials and show who you are
    Whoami,
    /// Adopt the JSON object returned by the login endpoint
    Login {
        #[arg(long)]
        payload: String,
    },
    /// End the session and forget stored credentials
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = commands::AppContext::build(
        cli.config_dir.as_deref(),
        cli.api_url.as_deref(),
        cli.verbose,
    )?;

    match cli.command {
        Commands::Feed {
            selector,
            sort,
            window,
            pages,
        } => commands::feed::run(&context, &selector, sort, window, pages).await?,
        Commands::Whoami => commands::session::whoami(&context).await,
        Commands::Login { payload } => commands::session::login(&context, &payload).await?,
        Commands::Logout => commands::session::logout(&context).await,
    }

    Ok(())
}
