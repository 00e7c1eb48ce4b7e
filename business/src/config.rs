use std::env::vars;

use log::info;
use serde::Deserialize;

use crate::protocol::ProtocolVariant;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Largest request URL the key-addressed variant will send. Common servers
/// reject request lines past 8-16 KiB.
pub const DEFAULT_MAX_QUERY_BYTES: usize = 16 * 1024;

const ENV_PREFIX: &str = "BLOBDROP_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    variant: ProtocolVariant,
    max_query_bytes: usize,
}

// An intermediate struct for deserializing environment variables where every
// field is optional.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    base_url: Option<String>,
    protocol: Option<ProtocolVariant>,
    max_query_bytes: Option<usize>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, variant: ProtocolVariant) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            variant,
            max_query_bytes: DEFAULT_MAX_QUERY_BYTES,
        }
    }

    pub fn with_max_query_bytes(mut self, limit: usize) -> Self {
        self.max_query_bytes = limit;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn variant(&self) -> ProtocolVariant {
        self.variant
    }

    pub fn max_query_bytes(&self) -> usize {
        self.max_query_bytes
    }

    pub fn store_url(&self) -> String {
        format!("{}/store/", self.base_url)
    }

    pub fn retrieve_url(&self) -> String {
        format!("{}/retrieve/", self.base_url)
    }

    /// Reads `BLOBDROP_BASE_URL`, `BLOBDROP_PROTOCOL` and
    /// `BLOBDROP_MAX_QUERY_BYTES`, applying defaults for anything unset.
    pub fn from_env() -> anyhow::Result<Self> {
        info!("Loading client configuration from environment variables");
        Self::from_vars(vars())
    }

    pub fn from_vars(
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> anyhow::Result<Self> {
        let scoped = vars.into_iter().filter_map(|(key, value)| {
            key.strip_prefix(ENV_PREFIX)
                .map(|stripped| (stripped.to_string(), value))
        });
        let raw: RawConfig = serde_env::from_iter(scoped)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> anyhow::Result<Self> {
        let RawConfig {
            base_url,
            protocol,
            max_query_bytes,
        } = raw;

        let base_url = match base_url {
            Some(url) => {
                let url = normalize_base_url(url);
                if url.is_empty() {
                    anyhow::bail!("BLOBDROP_BASE_URL must not be empty");
                }
                url::Url::parse(&url).map_err(|e| {
                    anyhow::anyhow!("BLOBDROP_BASE_URL is not a valid URL ({url}): {e}")
                })?;
                url
            }
            None => {
                info!("BLOBDROP_BASE_URL not set, defaulting to {}", DEFAULT_BASE_URL);
                DEFAULT_BASE_URL.to_string()
            }
        };

        let variant = protocol.unwrap_or_default();

        let max_query_bytes = match max_query_bytes {
            Some(0) => anyhow::bail!("BLOBDROP_MAX_QUERY_BYTES must be greater than zero"),
            Some(limit) => limit,
            None => DEFAULT_MAX_QUERY_BYTES,
        };

        info!(
            "Using {} protocol against {} (query limit {} bytes)",
            variant, base_url, max_query_bytes
        );

        Ok(Self {
            base_url,
            variant,
            max_query_bytes,
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, ProtocolVariant::default())
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
