use std::{io::Write as _, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{AmplitudeMemo, PlaygroundClient, PlaygroundError, PlaygroundEvent};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod command;
mod config;
mod render;

use command::{Command, HELP};
use config::load_config;
use render::render_view;

#[derive(Parser, Debug)]
#[command(name = "quantum-playground", about = "Two-qubit circuit playground client")]
struct Args {
    /// Base URL of the simulator API, e.g. http://127.0.0.1:8000/api
    #[arg(long)]
    api_base: Option<String>,
    /// Path to a TOML config file (defaults to ./playground.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref(), args.api_base.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let client = PlaygroundClient::new(config.settings.clone())
        .context("failed to build simulator client")?;
    info!(api_base = %client.settings().api_base, "playground: starting");
    let event_log = spawn_event_log(client.subscribe_events());

    if let Err(err) = client.check_health().await {
        warn!(error = %err, "playground: simulator health check failed");
    }

    if let Err(err) = client.bootstrap().await {
        event_log.abort();
        return Err(err.into());
    }

    let mut memo = AmplitudeMemo::new();
    println!("{}", render_view(&client.view(&mut memo).await));
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().context("failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        match command {
            Command::Quit => break,
            Command::Help => {
                println!("{HELP}");
                continue;
            }
            Command::State => {}
            action => {
                if let Err(err) = run_action(&client, action).await {
                    report(&err);
                }
            }
        }
        println!("{}", render_view(&client.view(&mut memo).await));
    }

    client.shutdown().await;
    event_log.abort();
    info!("playground: stopped");
    Ok(())
}

async fn run_action(
    client: &Arc<PlaygroundClient>,
    command: Command,
) -> Result<(), PlaygroundError> {
    match command {
        Command::Gate(gate) => client.apply_gate(gate).await.map(drop),
        Command::Measure(scope) => {
            let measured = client.measure(scope).await?;
            for qubit in scope.qubits() {
                if let Some(bit) = measured.outcome.get(*qubit) {
                    println!("{qubit} measured {bit}");
                }
            }
            Ok(())
        }
        Command::Reset(qubit) => client.reset_qubit(qubit).await.map(drop),
        Command::HardReset => client.hard_reset().await.map(drop),
        Command::Trials { scope, n } => client.run_trials(scope, n).await.map(drop),
        Command::State | Command::Help | Command::Quit => Ok(()),
    }
}

/// Simulator failures already show up as the banner in the next frame;
/// local refusals are printed directly.
fn report(err: &PlaygroundError) {
    match (err, err.banner_message()) {
        (_, Some(banner)) => debug!(error = %err, banner, "playground: action failed"),
        (PlaygroundError::Busy { active }, None) => println!("busy: {active} is still running"),
        (other, None) => println!("{other}"),
    }
}

fn spawn_event_log(mut events: broadcast::Receiver<PlaygroundEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(PlaygroundEvent::StateReplaced { origin, .. }) => {
                    debug!(?origin, "event: state replaced")
                }
                Ok(PlaygroundEvent::Fatal(message)) => warn!(%message, "event: fatal"),
                Ok(event) => debug!(?event, "event"),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "event: log lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
