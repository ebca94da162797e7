mod app;
mod cli;
mod config;
mod db;
mod error;
mod models;
mod services;

use std::process::ExitCode;

use app::Session;
use cli::{parse_args, Command, USAGE};
use config::Config;
use error::Result;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !e.is_user_facing() {
                tracing::error!("{e:?}");
            }
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let command = parse_args(&args)?;

    if command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    // Load configuration
    let config = Config::load()?;

    match command {
        Command::Help => {}
        Command::Reset => {
            // Never opens the store: a store that fails to open must still be deletable
            Session::discard_store(&config).await?;
            println!("Deleted store {}", config.store_name);
        }
        Command::Action(action) => {
            let mut session = Session::start(&config).await?;
            for line in session.handle_action(action).await? {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
