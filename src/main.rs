mod cancel;
mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod services;
mod session;
mod store;
#[cfg(test)]
mod testing;
mod workflow;

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::session::{self as session_cmd, SessionArgs};
use crate::cmd::ticket::{self as ticket_cmd, TicketArgs};
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::infra::session_store::{FileSessionStore, MemorySessionStore};
use crate::infra::terminal::TerminalNavigator;
use crate::services::SessionStore;

#[derive(Parser)]
#[command(
    name = "ticketdesk",
    author,
    version,
    about = "Support ticket desk client"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List, create, edit, assign and delete tickets.
    Tickets(TicketArgs),
    /// Sign in, inspect or sign out of the stored session.
    Session(SessionArgs),
    /// Manage CLI configuration.
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> AppResult<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config(args) => {
            config_cmd::run(args.command)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Tickets(args) => ticket_cmd::run(&connect()?, args.command).await,
        Commands::Session(args) => {
            let ctx = connect()?;
            session_cmd::run(&ctx.session, &ctx.config.contacts_token_key, args.command)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn connect() -> AppResult<AppContext> {
    let config = AppConfig::load()?;
    let navigator = Arc::new(TerminalNavigator::new(config.app_url.clone()));
    AppContext::connect(config, open_session_store(), navigator)
}

fn open_session_store() -> Arc<dyn SessionStore> {
    match FileSessionStore::load() {
        Ok(store) => Arc::new(store),
        Err(err) => {
            tracing::warn!(error = %err, "session file unavailable; keeping the session in memory");
            Arc::new(MemorySessionStore::new())
        }
    }
}
