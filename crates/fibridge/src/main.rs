mod cli;
mod error;

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fibridge_api::{FiClient, TransportConfig};
use fibridge_config::Config;
use fibridge_core::server::{self, AppState};
use fibridge_core::{MqttPublisher, Poller, Publish, UserStore};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = fibridge_config::load_config()?;

    match cli.command {
        Command::Run => run_bridge(&config).await,
        Command::Fetch => fetch_once(&config).await,
        Command::Serve => serve_users(&config).await,
    }
}

/// Build the session-scoped vendor client from the loaded config.
fn build_client(config: &Config) -> Result<FiClient, CliError> {
    let base_url: url::Url = config
        .api_base_url
        .parse()
        .map_err(fibridge_api::Error::InvalidUrl)?;

    let transport = TransportConfig {
        timeout: config.http_timeout(),
        cookie_jar: None, // FiClient::new creates the jar
    };

    Ok(FiClient::new(
        base_url,
        config.email.clone(),
        config.password(),
        &transport,
    )?)
}

/// `fibridge run`: the polling MQTT bridge.
async fn run_bridge(config: &Config) -> Result<(), CliError> {
    let client = Arc::new(build_client(config)?);

    let (publisher, event_loop) = MqttPublisher::connect(&config.broker_url, "fibridge")?;
    let cancel = CancellationToken::new();
    let mqtt_task = MqttPublisher::spawn_event_loop(event_loop, cancel.clone());

    let poller = Poller::new(
        client,
        Arc::new(publisher) as Arc<dyn Publish>,
        config.topic.clone(),
        config.poll_interval(),
    );

    info!(
        broker = %config.broker_url,
        topic = %config.topic,
        interval_ms = config.poll_interval_ms,
        "bridge started"
    );

    tokio::select! {
        () = poller.run(cancel.clone()) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            cancel.cancel();
        }
    }

    let _ = mqtt_task.await;
    Ok(())
}

/// `fibridge fetch`: one snapshot, pretty-printed to stdout.
async fn fetch_once(config: &Config) -> Result<(), CliError> {
    let client = build_client(config)?;
    let snapshot = client.fetch_details().await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// `fibridge serve`: the local HTTP user routes.
async fn serve_users(config: &Config) -> Result<(), CliError> {
    let state = AppState {
        users: Arc::new(UserStore::new()),
    };

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown.cancel();
    });

    server::serve(config.http_bind, state, cancel).await?;
    Ok(())
}
