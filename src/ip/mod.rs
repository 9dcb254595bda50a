mod external;

pub use external::{EchoResolver, DEFAULT_ECHO_URL};

use std::net::Ipv4Addr;

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Return the caller's current public IPv4 address. No retries.
    async fn resolve(&self) -> Result<Ipv4Addr>;
}
