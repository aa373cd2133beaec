//! Remote authority
//!
//! The server that eventually holds every entry. Pushes are create-style
//! requests carrying the full entry as JSON; any 2xx counts as accepted.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::models::FoodEntry;

/// A single entry failed to reach the remote authority
#[derive(Error, Debug)]
pub enum PushError {
    /// The request never got a response
    #[error("Network error pushing entry '{id}': {source}")]
    Network {
        id: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("Remote rejected entry '{id}' with status {status}")]
    Rejected { id: String, status: u16 },
}

impl PushError {
    /// Id of the entry that failed
    pub fn entry_id(&self) -> &str {
        match self {
            PushError::Network { id, .. } | PushError::Rejected { id, .. } => id,
        }
    }
}

/// Destination for unsynced entries
#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    /// Push one entry; `Ok` means the remote confirmed it
    async fn push(&self, entry: &FoodEntry) -> Result<(), PushError>;
}

/// Remote authority reached over HTTP
pub struct HttpRemote {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRemote {
    /// Create a client for the given create endpoint
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("foodlog/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(endpoint, client))
    }

    /// Use a preconfigured client
    pub fn with_client(endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl RemoteAuthority for HttpRemote {
    async fn push(&self, entry: &FoodEntry) -> Result<(), PushError> {
        debug!("POST {} for entry {}", self.endpoint, entry.id);

        let response = self
            .client
            .post(&self.endpoint)
            .json(entry)
            .send()
            .await
            .map_err(|source| PushError::Network {
                id: entry.id.clone(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(PushError::Rejected {
                id: entry.id.clone(),
                status: status.as_u16(),
            })
        }
    }
}
