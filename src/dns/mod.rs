mod cloudflare;
mod provider;

pub use cloudflare::{normalize_id, ClientOptions, CloudflareProvider, CLOUDFLARE_API_BASE};
pub use provider::{DnsProvider, DnsRecord, Zone, RECORD_TYPE_A};
