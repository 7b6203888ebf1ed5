//! vizlink CLI - talk JSON-RPC to a visualization server

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vizlink::{
    EventKind, RpcClient, RpcConfig, TransportClient, TransportConfig, TransportError,
    TransportEvent, TransportMode,
};

const DEFAULT_URL: &str = "ws://localhost:8765/ws";

#[derive(Parser)]
#[command(name = "vizlink")]
#[command(about = "vizlink CLI - JSON-RPC over WebSocket with HTTP fallback")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Duplex endpoint (e.g., ws://localhost:8765/ws)
    #[arg(long, env = "VIZLINK_URL", global = true)]
    url: Option<String>,

    /// Page origin to derive the endpoint from (e.g., https://viewer.example.com)
    #[arg(long, env = "VIZLINK_ORIGIN", global = true, conflicts_with = "url")]
    origin: Option<String>,

    /// Bearer token presented during the handshake
    #[arg(long, env = "VIZLINK_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Request/response endpoint used when no WebSocket can be opened
    #[arg(long, env = "VIZLINK_FALLBACK_URL", global = true)]
    fallback_url: Option<String>,

    /// How long to wait for a working connection
    #[arg(long, default_value_t = 10_000, global = true)]
    connect_timeout_ms: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a method and print its result
    ///
    /// Examples:
    ///   vizlink call model.get '{"id": "m1"}'
    ///   vizlink call system.health --timeout-ms 2000
    Call {
        /// Method name
        method: String,

        /// Parameters as JSON
        params: Option<String>,

        /// Deadline for the response
        #[arg(long, default_value_t = 30_000)]
        timeout_ms: u64,
    },

    /// Send a notification
    Notify {
        /// Method name
        method: String,

        /// Parameters as JSON
        params: Option<String>,
    },

    /// Print notifications and broadcast events until Ctrl-C
    ///
    /// Examples:
    ///   vizlink listen --topic model --topic annotations
    ///   vizlink listen --method chat.message
    Listen {
        /// Only print notifications for these methods (can be repeated)
        #[arg(short, long = "method")]
        methods: Vec<String>,

        /// Topics to subscribe to (can be repeated)
        #[arg(short, long = "topic")]
        topics: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let connect_timeout = Duration::from_millis(cli.connect_timeout_ms);

    match cli.command {
        Commands::Call {
            method,
            params,
            timeout_ms,
        } => call(config, connect_timeout, &method, params, timeout_ms).await,

        Commands::Notify { method, params } => notify(config, connect_timeout, &method, params).await,

        Commands::Listen { methods, topics } => listen(config, connect_timeout, methods, topics).await,
    }
}

fn build_config(cli: &Cli) -> Result<TransportConfig> {
    let mut config = match (&cli.url, &cli.origin) {
        (Some(url), _) => TransportConfig::new(url.clone()),
        (None, Some(origin)) => TransportConfig::from_origin(origin)
            .with_context(|| format!("Invalid origin: {}", origin))?,
        (None, None) => TransportConfig::new(DEFAULT_URL),
    };

    if let Some(token) = &cli.token {
        config = config.token(token.clone());
    }
    if let Some(fallback) = &cli.fallback_url {
        config = config.fallback_url(fallback.clone());
    }
    Ok(config)
}

fn parse_params(params: Option<String>) -> Result<Option<Value>> {
    params
        .map(|raw| serde_json::from_str(&raw).with_context(|| format!("Invalid params JSON: {}", raw)))
        .transpose()
}

async fn open(config: TransportConfig, connect_timeout: Duration) -> Result<(TransportClient, RpcClient)> {
    let transport = TransportClient::websocket(config).context("Failed to create transport")?;
    let rpc = RpcClient::new(transport.clone(), RpcConfig::default());

    transport.connect();
    let mode = transport
        .wait_connected(connect_timeout)
        .await
        .context("Failed to connect")?;
    if mode == TransportMode::RequestResponse && transport.config().fallback_url.is_none() {
        return Err(TransportError::NoFallback).context("WebSocket unavailable");
    }

    Ok((transport, rpc))
}

async fn call(
    config: TransportConfig,
    connect_timeout: Duration,
    method: &str,
    params: Option<String>,
    timeout_ms: u64,
) -> Result<()> {
    let params = parse_params(params)?;
    let (transport, rpc) = open(config, connect_timeout).await?;

    let result = rpc
        .call_with_timeout(method, params, Duration::from_millis(timeout_ms))
        .await;
    transport.close().await;

    let result = result.with_context(|| format!("Call to '{}' failed", method))?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn notify(
    config: TransportConfig,
    connect_timeout: Duration,
    method: &str,
    params: Option<String>,
) -> Result<()> {
    let params = parse_params(params)?;
    let (transport, rpc) = open(config, connect_timeout).await?;

    rpc.notify(method, params);
    transport.close().await;

    println!("Sent {}", method);
    Ok(())
}

async fn listen(
    config: TransportConfig,
    connect_timeout: Duration,
    methods: Vec<String>,
    topics: Vec<String>,
) -> Result<()> {
    let transport = TransportClient::websocket(config).context("Failed to create transport")?;
    let rpc = RpcClient::new(transport.clone(), RpcConfig::default());

    if !topics.is_empty() {
        transport.subscribe(topics);
    }

    let _subscriptions: Vec<_> = methods
        .iter()
        .map(|method| {
            let name = method.clone();
            rpc.subscribe(method, move |params| println!("{} {}", name, params))
        })
        .collect();

    if methods.is_empty() {
        transport.on(EventKind::Message, |event| {
            if let TransportEvent::Message(message) = event {
                println!("{}", message);
            }
        });
    }

    transport.on(EventKind::Reconnecting, |event| {
        if let TransportEvent::Reconnecting { attempt, delay } = event {
            eprintln!("Connection lost, reconnect attempt {} in {:?}", attempt, delay);
        }
    });

    let (give_up_tx, give_up_rx) = oneshot::channel();
    let give_up_tx = Mutex::new(Some(give_up_tx));
    transport.on(EventKind::MaxReconnectAttempts, move |_| {
        if let Some(tx) = give_up_tx.lock().take() {
            let _ = tx.send(());
        }
    });

    transport.connect();
    let mode = transport
        .wait_connected(connect_timeout)
        .await
        .context("Failed to connect")?;
    eprintln!("Connected ({:?}), press Ctrl-C to stop", mode);

    let outcome = tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl-C"),
        _ = give_up_rx => Err(anyhow::anyhow!("Gave up reconnecting")),
    };

    transport.close().await;
    outcome
}
