//! Operator entrypoint
//!
//! Wires tracing, metrics, the probe server, and the controller watch loop.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use kube::{Api, Client};
use kube_runtime::{watcher, Controller};
use tracing::{error, info};

use feast_operator::constants::DEFAULT_METRICS_PORT;
use feast_operator::controller::reconciler::{error_policy, reconcile, Reconciler};
use feast_operator::crd::FeatureStore;
use feast_operator::metrics;
use feast_operator::server::{start_server, ServerState};

/// Kubernetes operator for Feast feature stores
#[derive(Debug, Parser)]
#[command(name = "feast-operator", version, about)]
struct Args {
    /// Port for the metrics and probe HTTP server
    #[arg(long, env = "METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    metrics_port: u16,

    /// Watch a single namespace instead of the whole cluster
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feast_operator=info".into()),
        )
        .init();

    info!("Starting Feast Operator");

    metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::new());
    let server_port = args.metrics_port;
    let probe_state = server_state.clone();
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, probe_state).await {
            error!("HTTP server error: {e}");
        }
    });

    let client = Client::try_default().await?;

    let feature_stores: Api<FeatureStore> = match &args.namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    };

    let reconciler = Arc::new(Reconciler {
        client: client.clone(),
    });

    server_state.mark_ready();

    Controller::new(feature_stores, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, reconciler)
        .for_each(|_| std::future::ready(()))
        .await;

    info!("Controller stopped");

    Ok(())
}
