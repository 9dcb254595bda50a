use std::time::Duration;

use anyhow::Result;
#[cfg(windows)]
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::reconciler::{CycleOutcome, Reconciler};
use crate::config::{Credentials, Settings};
use crate::dns::{ClientOptions, CloudflareProvider, DnsProvider};
use crate::ip::{EchoResolver, IpResolver};

pub async fn run(settings: Settings, credentials: Credentials) -> Result<()> {
    let (provider, zone) =
        CloudflareProvider::connect(&credentials, ClientOptions::from(&settings)).await?;
    let resolver = EchoResolver::from_settings(&settings)?;

    info!(
        "Connected to {} zone {} ({})",
        provider.provider_name(),
        zone.name,
        zone.id
    );

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn shutdown signal handler
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown().await {
            error!("Error waiting for shutdown signal: {}", e);
        }
        let _ = shutdown_tx.send(true);
    });

    let mut reconciler = Reconciler::new(credentials.zone_id);

    info!(
        "Daemon started. Reconciling A records every {} seconds",
        settings.daemon.interval_seconds
    );

    run_loop(
        &mut reconciler,
        &provider,
        &resolver,
        settings.interval(),
        shutdown_rx,
    )
    .await;

    Ok(())
}

/// Run one cycle immediately and then one per `interval` until `shutdown` flips to true.
pub async fn run_loop(
    reconciler: &mut Reconciler,
    provider: &dyn DnsProvider,
    resolver: &dyn IpResolver,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    // Initial check
    run_cycle(reconciler, provider, resolver).await;

    // Main loop
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                run_cycle(reconciler, provider, resolver).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Shutdown signal received, stopping daemon");
                    break;
                }
            }
        }
    }
}

async fn run_cycle(
    reconciler: &mut Reconciler,
    provider: &dyn DnsProvider,
    resolver: &dyn IpResolver,
) {
    match reconciler.reconcile_once(provider, resolver).await {
        Ok(CycleOutcome::Unchanged(_)) => {}
        Ok(CycleOutcome::Changed { ip, updated, failed }) => {
            if failed.is_empty() {
                info!("Reconciled {} record(s) to {}", updated.len(), ip);
            } else {
                warn!(
                    "Reconciled {} record(s) to {}, {} failed: {}",
                    updated.len(),
                    ip,
                    failed.len(),
                    failed.join(", ")
                );
            }
        }
        Err(e) => {
            warn!("Reconciliation cycle failed: {}", e);
        }
    }
}

async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(windows)]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
