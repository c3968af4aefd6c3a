// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Kolekta Engine Server
//!
//! The `kolekta` binary serves the collection lifecycle HTTP API backed by
//! the in-memory repositories. Material prices, bank accounts and agent
//! profiles normally live in their own subsystems; the in-memory stand-ins
//! here make the binary self-contained for development.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use kolekta_engine_core::application::{
    StandardCollectionService, StandardDeliveryService, StandardFeeService, StandardSaleService,
    StandardValidationService,
};
use kolekta_engine_core::infrastructure::{
    EventBus, InMemoryAgentDirectory, InMemoryBankDirectory, InMemoryCollectionRepository,
    InMemoryDeliveryRepository, InMemoryFeeRegistry, InMemoryMaterialCatalog,
    InMemorySaleRepository,
};
use kolekta_engine_core::presentation::{app, AppState};

/// Kolekta collection lifecycle engine
#[derive(Parser)]
#[command(name = "kolekta")]
#[command(version, about, long_about = None)]
struct Cli {
    /// HTTP API port (default: 8000)
    #[arg(long, env = "KOLEKTA_PORT", default_value = "8000")]
    port: u16,

    /// HTTP API host (default: 127.0.0.1)
    #[arg(long, env = "KOLEKTA_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "KOLEKTA_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let router = app(Arc::new(build_state()));

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .context("Invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Kolekta engine listening on {}", addr);

    axum::serve(listener, router)
        .await
        .context("Server terminated")?;
    Ok(())
}

/// Wire the services over the in-memory infrastructure.
fn build_state() -> AppState {
    let collections = Arc::new(InMemoryCollectionRepository::new());
    let deliveries = Arc::new(InMemoryDeliveryRepository::new());
    let sales = Arc::new(InMemorySaleRepository::new());
    let registry = Arc::new(InMemoryFeeRegistry::new());
    let catalog = Arc::new(InMemoryMaterialCatalog::new());
    let banks = Arc::new(InMemoryBankDirectory::new());
    let agents = Arc::new(InMemoryAgentDirectory::new());
    let bus = EventBus::with_default_capacity();

    let fees = Arc::new(StandardFeeService::new(registry));
    AppState {
        collections: Arc::new(StandardCollectionService::new(
            collections.clone(),
            catalog.clone(),
        )),
        validations: Arc::new(StandardValidationService::new(
            collections.clone(),
            catalog,
            agents,
            bus.clone(),
        )),
        deliveries: Arc::new(StandardDeliveryService::new(
            collections.clone(),
            deliveries,
            fees.clone(),
        )),
        sales: Arc::new(StandardSaleService::new(collections, sales, banks, bus.clone())),
        fees,
        events: bus,
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}
