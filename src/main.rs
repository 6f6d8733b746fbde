use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Result;
use kode::cli::{Cli, Command};
use kode::config::{Config, DEBUG_ENDPOINT};
use kode::handlers;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Log to stderr, except under the editor where stderr is the screen.
fn init_logging(cfg: &Config, to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_new(cfg.log_filter()).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if to_file {
        let path = cfg.log_path();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Load config; CLI flags override it
    let mut cfg = Config::load();
    if args.debug {
        cfg.set("KODE_ENDPOINT", DEBUG_ENDPOINT);
    } else if let Some(endpoint) = &args.endpoint {
        cfg.set("KODE_ENDPOINT", endpoint.clone());
    }

    init_logging(&cfg, matches!(args.command, Command::Edit { .. }))?;
    debug!(endpoint = %cfg.endpoint(), config = %cfg.config_path.display(), "configuration loaded");

    match args.command {
        Command::Run { file, version } => handlers::run::run(&cfg, &file, version).await,
        Command::Share { file, version, id } => handlers::share::run(&cfg, &file, version, id).await,
        Command::Fetch { id, output } => handlers::fetch::run(&cfg, &id, output.as_deref()).await,
        Command::Langs { local } => handlers::langs::run(&cfg, local).await,
        Command::Edit { lang, snapshot } => {
            handlers::edit::run(&cfg, lang.as_deref(), snapshot.as_deref()).await
        }
    }
}
