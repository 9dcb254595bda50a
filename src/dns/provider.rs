use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const RECORD_TYPE_A: &str = "A";

/// A DNS record as returned by the provider.
///
/// `id` is read-only on the provider side and must be left empty in update
/// payloads; it is skipped during serialization when `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    #[serde(default)]
    pub proxied: bool,
}

impl DnsRecord {
    pub fn is_a_record(&self) -> bool {
        self.record_type == RECORD_TYPE_A
    }
}

/// Zone details returned by the validation probe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Zone {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Fetch zone details. Used to confirm credentials and zone are usable.
    async fn get_zone(&self, zone: &str) -> Result<Zone>;

    /// List every record in the zone
    async fn list_records(&self, zone: &str) -> Result<Vec<DnsRecord>>;

    /// Get a single record by id
    async fn get_record(&self, zone: &str, record_id: &str) -> Result<DnsRecord>;

    /// Replace a record. The `id` of `record` must be `None`.
    async fn update_record(&self, zone: &str, record_id: &str, record: &DnsRecord) -> Result<()>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}
