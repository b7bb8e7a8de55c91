mod cli;
mod session;

use std::io;
use std::process::ExitCode;

use anyhow::Context;
use bkdraw::logging::{init_logging, LogConfig};
use bkdraw::native::ReqwestCapability;
use bkdraw::terminal::TerminalPage;
use bkdraw::{Dispatcher, HttpCapability, PageSettings, PointerEvent};
use clap::Parser;
use tokio::runtime::Handle;
use tracing::info;

use crate::cli::{Cli, Command};
use crate::session::SessionCommand;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_config = LogConfig {
        format: cli.log_format.into(),
        ..LogConfig::from_verbosity(cli.verbose)
    };
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let settings = PageSettings {
        image_endpoint: cli.image_endpoint,
        ..PageSettings::default()
    };
    let client = reqwest::Client::builder()
        .build()
        .context("building HTTP client")?;
    let (http, mut events) = ReqwestCapability::new(client, cli.server, Handle::current());
    info!(server = %http.base(), "using drawing server");

    let http: Box<dyn HttpCapability> = Box::new(http);
    let dispatcher = Dispatcher::new(Some(http), TerminalPage::new(io::stdout()), settings);

    let command = match cli.command {
        Command::Session => {
            eprintln!("{}", session::HELP);
            return session::run(&dispatcher, &mut events, io::stdin().lock()).await;
        }
        Command::Click { x, y } => SessionCommand::Click(PointerEvent::new(x, y)),
        Command::Action { name } => SessionCommand::Action(name),
        Command::Symbol { symbol } => SessionCommand::Symbol(symbol),
        Command::Template { name } => SessionCommand::Template(name),
        Command::Mode { name } => SessionCommand::Mode(name),
    };
    session::apply(&dispatcher, &mut events, command).await
}
