use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::IpResolver;
use crate::config::Settings;
use crate::error::{Error, Result};

pub const DEFAULT_ECHO_URL: &str = "https://api.ipify.org/?format=json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct EchoResponse {
    #[serde(default)]
    ip: String,
}

/// Resolves the public IPv4 address through a JSON IP-echo service.
#[derive(Debug, Clone)]
pub struct EchoResolver {
    client: Client,
    url: String,
}

impl EchoResolver {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.ip.echo_url.clone(), settings.request_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for EchoResolver {
    fn default() -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            url: DEFAULT_ECHO_URL.to_string(),
        }
    }
}

#[async_trait]
impl IpResolver for EchoResolver {
    async fn resolve(&self) -> Result<Ipv4Addr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::resolution(format!("request to {} failed: {}", self.url, e)))?;

        let body: EchoResponse = response
            .json()
            .await
            .map_err(|e| Error::resolution(format!("failed to parse response: {}", e)))?;

        parse_ipv4(&body.ip)
    }
}

fn parse_ipv4(raw: &str) -> Result<Ipv4Addr> {
    let ip = raw.trim();
    if ip.is_empty() {
        return Err(Error::resolution("response contained no ip"));
    }

    ip.parse()
        .map_err(|_| Error::resolution(format!("{:?} is not an IPv4 address", ip)))
}
