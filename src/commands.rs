//! CLI command handlers.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use teamsync_directory::{DirectoryClient, DirectoryConfig};
use teamsync_reconciler::{
    Controller, DeclaredTeamResource, InMemoryResourceStore, LoopConfig, ReconciliationLoop,
    ResourceKey, ResourceStore, derive, is_tools_namespace,
};
use tokio::signal;
use tracing::{error, info, warn};

use crate::cli::Commands;
use crate::config::LocalConfig;
use crate::manifest::load_manifests;

/// Execute a CLI command.
pub async fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::Derive { namespace } => cmd_derive(&namespace),

        Commands::Sync {
            config,
            namespace,
            name,
        } => cmd_sync(&config, namespace, name).await,

        Commands::Run {
            manifests,
            interval_secs,
        } => cmd_run(&manifests, Duration::from_secs(interval_secs)).await,
    }
}

fn cmd_derive(namespace: &str) -> Result<()> {
    if !is_tools_namespace(namespace) {
        warn!(namespace, "Namespace does not end with '-tools'");
    }
    let facts = derive(namespace);
    println!("{}", serde_json::to_string_pretty(&facts)?);
    Ok(())
}

async fn cmd_sync(config_path: &Path, namespace: String, name: String) -> Result<()> {
    let local = LocalConfig::load(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    let team = local
        .team
        .clone()
        .context("Config has no 'team' block to sync")?;

    let store = InMemoryResourceStore::new_arc();
    let key = ResourceKey::new(namespace, name);
    store
        .apply(DeclaredTeamResource::new(key.clone(), team))
        .await;

    let runner = ReconciliationLoop::new(
        build_controller(local.directory_with_env(), store.clone())?,
        LoopConfig::default(),
    );
    let result = runner.reconcile_key(&key).await;

    if let Some(resource) = store.get(&key).await? {
        println!("{}", serde_json::to_string_pretty(&resource.status)?);
    }

    let outcome = result.with_context(|| format!("Reconcile of {key} failed"))?;
    info!(resource = %key, completion = ?outcome.completion, "Sync finished");
    Ok(())
}

async fn cmd_run(manifests: &Path, interval: Duration) -> Result<()> {
    let resources = load_manifests(manifests)
        .with_context(|| format!("Failed to load manifests from {}", manifests.display()))?;

    let store = InMemoryResourceStore::new_arc();
    let count = resources.len();
    for resource in resources {
        store.apply(resource).await;
    }
    info!(resources = count, "Manifests loaded");

    let config = LoopConfig {
        interval,
        ..LoopConfig::default()
    };
    let mut runner = ReconciliationLoop::new(
        build_controller(DirectoryConfig::from_env(), store)?,
        config,
    );
    let stopper = runner.stopper();

    let handle = tokio::spawn(async move { runner.run().await });

    info!("teamsync is running. Press Ctrl+C to stop.");
    wait_for_shutdown().await;
    stopper.stop();

    handle
        .await
        .context("Reconciliation loop task panicked")?
        .context("Reconciliation loop failed")?;

    info!("teamsync stopped gracefully");
    Ok(())
}

fn build_controller(
    config: DirectoryConfig,
    store: Arc<InMemoryResourceStore>,
) -> Result<Arc<Controller>> {
    let credentials = config.credentials.clone();
    if !credentials.is_complete() {
        warn!("Directory credentials are incomplete; every resource will report it");
    }
    let client = DirectoryClient::new(config).context("Failed to build directory client")?;
    Ok(Arc::new(Controller::new(store, Arc::new(client), credentials)))
}

/// Wait for Ctrl+C.
async fn wait_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
