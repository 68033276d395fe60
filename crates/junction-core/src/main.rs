use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use junction_core::config::ControllerConfig;
use junction_core::console;
use junction_core::incidents::AngleBucketClassifier;
use junction_core::relay::{route_direction, FileMailbox, OverrideMailbox};
use junction_core::runtime::spawn_controller;
use junction_core::session::JunctionSession;
use junction_core::settings::JsonFileStore;
use junction_ir::parse::parse_direction;
use junction_ir::types::{Direction, GeoPoint};
use junction_model::simulate::{simulate, SimulationConfig};

#[derive(Debug, Parser)]
#[command(name = "junction")]
#[command(about = "Four-way traffic signal controller")]
struct Cli {
    /// Controller config file (JSON). Defaults apply when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the controller, serving JSON-RPC console requests on stdin.
    Serve,
    /// Leave an override request for the running controller.
    Request {
        /// north, east, south or west
        direction: String,
    },
    /// Request the green for the direction a route travels in.
    Route {
        #[arg(allow_negative_numbers = true)]
        start_lat: f64,
        #[arg(allow_negative_numbers = true)]
        start_lng: f64,
        #[arg(allow_negative_numbers = true)]
        end_lat: f64,
        #[arg(allow_negative_numbers = true)]
        end_lng: f64,
    },
    /// Run the engine offline and print a summary.
    Simulate {
        #[arg(long, default_value_t = 600)]
        ticks: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = ControllerConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Serve => serve(config).await,
        Command::Request { direction } => {
            let direction = parse_direction(&direction)?;
            leave_request(&config, direction)
        }
        Command::Route {
            start_lat,
            start_lng,
            end_lat,
            end_lng,
        } => {
            let direction = route_direction(
                GeoPoint::new(start_lat, start_lng),
                GeoPoint::new(end_lat, end_lng),
            );
            leave_request(&config, direction)
        }
        Command::Simulate { ticks } => {
            print_simulation(ticks);
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("junction=info"));
    // stdout carries console responses, so logs go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn serve(config: ControllerConfig) -> Result<()> {
    let session = JunctionSession::new(Box::new(JsonFileStore::new(&config.settings_path)))
        .with_classifier(Box::new(AngleBucketClassifier::new(config.junction_center)));
    let mailbox = FileMailbox::new(&config.mailbox_path);
    // This host takes incidents through the console tool only.
    let (incident_tx, incident_rx) = mpsc::channel(config.command_buffer.max(1));
    drop(incident_tx);

    let (handle, task) = spawn_controller(session, &config, Some(Box::new(mailbox)), incident_rx);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str(&line) {
            Ok(request) => handle.console(request).await?,
            Err(e) => console::parse_error_response(&e.to_string()),
        };
        stdout.write_all(response.to_string().as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    handle.shutdown().await?;
    let session = task.await.context("controller task panicked")?;
    tracing::info!(stats = ?session.stats(), "session ended");
    Ok(())
}

fn leave_request(config: &ControllerConfig, direction: Direction) -> Result<()> {
    FileMailbox::new(&config.mailbox_path)
        .write_pending_override(direction)
        .with_context(|| format!("writing {}", config.mailbox_path.display()))?;
    println!("{}", json!({ "requested": direction }));
    Ok(())
}

fn print_simulation(ticks: u64) {
    let result = simulate(&SimulationConfig {
        max_ticks: ticks,
        ..SimulationConfig::default()
    });
    let greens: serde_json::Map<String, serde_json::Value> = Direction::SEQUENCE
        .iter()
        .map(|d| {
            let served = result.greens_served.get(d).copied().unwrap_or(0);
            (d.as_str().to_string(), json!(served))
        })
        .collect();
    let summary = json!({
        "ticks": result.ticks_executed,
        "transitions": result.transitions.len(),
        "greensServed": greens,
        "finalState": result.final_state,
        "violations": result.violations,
    });
    println!("{summary}");
}
