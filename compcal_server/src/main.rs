//! This binary serves the competition calendar over HTTP.
//!
//! The path is `/calendar/<selectors>`, e.g. `/calendar/DE+US/Texas`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::{routing::get, Router};
use clap::Parser;
use compcal_core::{config::ConfigArgs, store::DynamoStore, CompetitionStore, Config};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod route;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Arguments {
    /// the address to listen on
    #[arg(long, env = "COMPCAL_BIND", default_value = "0.0.0.0:8008")]
    bind: SocketAddr,
    /// log as JSON lines
    #[arg(long)]
    json_logs: bool,
    #[command(flatten)]
    config: ConfigArgs,
}

/// Shared by all requests, never mutated.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CompetitionStore>,
    pub config: Arc<Config>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/calendar", get(route::calendar::handler))
        .route("/calendar/", get(route::calendar::handler))
        .route("/calendar/*selectors", get(route::calendar::selectors_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn init_tracing(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Arguments::parse();
    init_tracing(args.json_logs);
    let config = Config::from(args.config);
    let store = DynamoStore::connect(&config.table).await;
    info!(
        table = %config.table.table_name,
        bind = %args.bind,
        "starting competition calendar server"
    );
    let state = AppState {
        store: Arc::new(store),
        config: Arc::new(config),
    };
    axum::Server::bind(&args.bind)
        .serve(app(state).into_make_service())
        .await?;
    Ok(())
}
