use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use tracing::debug;

use super::provider::{DnsProvider, DnsRecord, Zone};
use crate::config::{Credentials, Settings, ENV_API_EMAIL, ENV_API_KEY, ENV_ZONE_ID};
use crate::error::{Error, Result};

pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RECORDS_PER_PAGE: u32 = 100;

const HEADER_AUTH_EMAIL: &str = "X-Auth-Email";
const HEADER_AUTH_KEY: &str = "X-Auth-Key";

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_base: String,
    pub timeout: Duration,
    /// Return an empty list for a zone without records instead of failing.
    pub allow_empty_zone: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base: CLOUDFLARE_API_BASE.to_string(),
            timeout: REQUEST_TIMEOUT,
            allow_empty_zone: false,
        }
    }
}

impl From<&Settings> for ClientOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            api_base: settings.cloudflare.api_base.clone(),
            timeout: settings.request_timeout(),
            allow_empty_zone: settings.cloudflare.allow_empty_zone,
        }
    }
}

pub struct CloudflareProvider {
    client: Client,
    email: String,
    api_key: String,
    options: ClientOptions,
}

impl fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("email", &self.email)
            .field("api_key", &"<REDACTED>")
            .field("options", &self.options)
            .finish()
    }
}

/// Standard Cloudflare v4 response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: Option<bool>,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default = "first_page")]
    total_pages: u32,
}

fn first_page() -> u32 {
    1
}

impl<T> Envelope<T> {
    fn check(self, status: u16, what: &str) -> Result<Self> {
        if self.success == Some(false) {
            let message = self
                .errors
                .first()
                .map(|e| format!("{} (code {})", e.message, e.code))
                .unwrap_or_else(|| "request reported failure".to_string());
            return Err(Error::provider(
                Some(status),
                format!("{} failed: {}", what, message),
            ));
        }
        Ok(self)
    }
}

/// Strip punctuation and whitespace so ids like `023e105f-4ecd-...` match the
/// path format the API expects.
pub fn normalize_id(id: &str) -> String {
    id.chars()
        .filter(|c| !c.is_ascii_punctuation() && !c.is_whitespace())
        .collect()
}

impl CloudflareProvider {
    pub fn new(credentials: &Credentials, options: ClientOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            email: credentials.email.clone(),
            api_key: credentials.api_key.clone(),
            options,
        })
    }

    /// Build a client and probe the configured zone.
    ///
    /// Any rejection from the API is reported as [`Error::Auth`] so bad
    /// credentials or a wrong zone id fail at startup.
    pub async fn connect(credentials: &Credentials, options: ClientOptions) -> Result<(Self, Zone)> {
        let provider = Self::new(credentials, options)?;

        let zone = provider
            .get_zone(&credentials.zone_id)
            .await
            .map_err(|e| {
                if matches!(e, Error::Provider { .. }) {
                    Error::auth(format!(
                        "failed to get zone when creating client, {}, {} or {} may be incorrect: {}",
                        ENV_API_EMAIL, ENV_API_KEY, ENV_ZONE_ID, e
                    ))
                } else {
                    e
                }
            })?;

        Ok((provider, zone))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.options.api_base.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(HEADER_AUTH_EMAIL, &self.email)
            .header(HEADER_AUTH_KEY, &self.api_key)
            .header(CONTENT_TYPE, "application/json")
    }

    async fn execute(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(format!("{} request failed: {}", what, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider(
                Some(status.as_u16()),
                format!("{} failed: {}", what, body),
            ));
        }

        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<Envelope<T>> {
        let response = self.execute(request, what).await?;
        let status = response.status().as_u16();

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            Error::provider(
                Some(status),
                format!("failed to parse {} response: {}", what, e),
            )
        })?;

        envelope.check(status, what)
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn get_zone(&self, zone: &str) -> Result<Zone> {
        let url = self.url(&format!("/zones/{}", normalize_id(zone)));
        let request = self.authorized(self.client.get(&url));

        self.fetch::<Zone>(request, "get zone")
            .await?
            .result
            .ok_or_else(|| Error::provider(None, "get zone response has no result"))
    }

    async fn list_records(&self, zone: &str) -> Result<Vec<DnsRecord>> {
        let url = self.url(&format!("/zones/{}/dns_records", normalize_id(zone)));

        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let request = self
                .authorized(self.client.get(&url))
                .query(&[("page", page), ("per_page", RECORDS_PER_PAGE)]);

            let envelope = self
                .fetch::<Vec<DnsRecord>>(request, "list DNS records")
                .await?;
            let total_pages = envelope.result_info.map(|i| i.total_pages).unwrap_or(1);
            records.extend(envelope.result.unwrap_or_default());

            if page >= total_pages {
                break;
            }
            page += 1;
        }

        debug!("Listed {} DNS records for zone {}", records.len(), zone);

        if records.is_empty() && !self.options.allow_empty_zone {
            return Err(Error::provider(None, "no DNS records found for zone"));
        }

        Ok(records)
    }

    async fn get_record(&self, zone: &str, record_id: &str) -> Result<DnsRecord> {
        let url = self.url(&format!(
            "/zones/{}/dns_records/{}",
            normalize_id(zone),
            normalize_id(record_id)
        ));
        let request = self.authorized(self.client.get(&url));

        self.fetch::<DnsRecord>(request, "get DNS record")
            .await?
            .result
            .ok_or_else(|| Error::provider(None, "get DNS record response has no result"))
    }

    async fn update_record(&self, zone: &str, record_id: &str, record: &DnsRecord) -> Result<()> {
        let url = self.url(&format!(
            "/zones/{}/dns_records/{}",
            normalize_id(zone),
            normalize_id(record_id)
        ));
        let request = self.authorized(self.client.put(&url)).json(record);

        let response = self.execute(request, "update DNS record").await?;
        let status = response.status().as_u16();

        // A 2xx without a parseable envelope is still a successful update.
        match response.json::<Envelope<IgnoredAny>>().await {
            Ok(envelope) => {
                envelope.check(status, "update DNS record")?;
            }
            Err(e) => debug!("Ignoring unparseable update response body: {}", e),
        }

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
