use std::net::Ipv4Addr;

use tracing::{debug, error, info, warn};

use crate::dns::DnsProvider;
use crate::error::Result;
use crate::ip::IpResolver;

/// Result of a single reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The public IP matches the last observed one; nothing was sent to the provider.
    Unchanged(Ipv4Addr),
    /// A new IP was observed and A records were pushed.
    Changed {
        ip: Ipv4Addr,
        updated: Vec<String>,
        failed: Vec<String>,
    },
}

/// Keeps the A records of one zone pointed at the current public IP.
#[derive(Debug)]
pub struct Reconciler {
    zone: String,
    last_ip: Option<Ipv4Addr>,
}

impl Reconciler {
    pub fn new(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            last_ip: None,
        }
    }

    /// Start from a known IP, e.g. when the records are already up to date.
    pub fn with_last_ip(zone: impl Into<String>, ip: Ipv4Addr) -> Self {
        Self {
            zone: zone.into(),
            last_ip: Some(ip),
        }
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn last_ip(&self) -> Option<Ipv4Addr> {
        self.last_ip
    }

    pub async fn reconcile_once(
        &mut self,
        provider: &dyn DnsProvider,
        resolver: &dyn IpResolver,
    ) -> Result<CycleOutcome> {
        let records = provider.list_records(&self.zone).await?;
        let current_ip = resolver.resolve().await?;

        if self.last_ip == Some(current_ip) {
            debug!("Public IP unchanged at {}", current_ip);
            return Ok(CycleOutcome::Unchanged(current_ip));
        }

        self.last_ip = Some(current_ip);
        info!("Found new IP address {}", current_ip);

        let new_content = current_ip.to_string();
        let mut updated = Vec::new();
        let mut failed = Vec::new();

        for record in records.into_iter().filter(|r| r.is_a_record()) {
            if record.content == new_content {
                debug!("Record {} already points at {}", record.name, new_content);
                continue;
            }

            let mut payload = record;
            payload.content = new_content.clone();

            // The provider rejects the id in update bodies.
            let Some(record_id) = payload.id.take() else {
                warn!("Record {} has no id, skipping update", payload.name);
                failed.push(payload.name);
                continue;
            };

            match provider
                .update_record(&self.zone, &record_id, &payload)
                .await
            {
                Ok(()) => {
                    info!("Updated record {} to {}", payload.name, current_ip);
                    updated.push(payload.name);
                }
                Err(e) => {
                    error!("Failed to update record {}: {}", payload.name, e);
                    failed.push(payload.name);
                }
            }
        }

        Ok(CycleOutcome::Changed {
            ip: current_ip,
            updated,
            failed,
        })
    }
}
