//! money-tab notification bot: binary entrypoint.
//! One pass per invocation: log in, read the member feed, dedup against the
//! previous run, resolve video links, relay to Telegram, and exit with a
//! stage-distinct code. Scheduling repeated passes is the invoker's job.

use std::path::PathBuf;

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use moneytab_notify_bot::config::BotConfig;
use moneytab_notify_bot::pipeline::{self, RunError};

#[derive(Parser)]
#[command(name = "moneytab-notify-bot", version)]
#[command(about = "Relays new money-tab feed notifications to Telegram", long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the state directory (history + session artifacts)
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Run the browser with a visible window
    #[arg(long)]
    headed: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("moneytab_notify_bot=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

// The pipeline is strictly sequential; one thread is all it needs.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let mut config = match BotConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            let err = RunError::Config(format!("{e:#}"));
            error!(error = %err, "cannot load configuration");
            std::process::exit(err.exit_code());
        }
    };
    if let Some(dir) = cli.state_dir {
        config.state_dir = dir;
    }
    if cli.headed {
        config.headless = false;
    }

    if let Err(e) = config.validate() {
        let err = RunError::Config(format!("{e:#}"));
        error!(error = %err, "configuration rejected");
        std::process::exit(err.exit_code());
    }

    debug!(
        headless = config.headless,
        wait_timeout_ms = config.wait_timeout_ms,
        state_dir = %config.state_dir.display(),
        chat_ids = config.telegram_chat_ids.len(),
        "configuration loaded"
    );

    let code = pipeline::execute(&config).await;
    std::process::exit(code);
}
