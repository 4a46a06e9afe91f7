use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use novanode::{AiGateway, App, Cli, Config, GeminiClient, NoteStore, Result, Workspace};

pub fn initialize_logger(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    info!("Logger initialized");
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let client = GeminiClient::from_config(&config)?;
    let gateway = AiGateway::from_config(Arc::new(client), &config);

    let store = if cli.empty {
        NoteStore::default()
    } else {
        NoteStore::with_sample_data()
    };
    let workspace = Workspace::new(store, gateway);

    App::new(workspace, config, cli.verbose)
        .run_interactive()
        .await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    info!("Application starting up");

    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    info!("Application shutting down");
}
