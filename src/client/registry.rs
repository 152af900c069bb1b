use std::collections::HashMap;
use std::sync::Arc;

use crate::app::error::{NewsstandError, Result};
use crate::client::{NewsClient, RuleClient};
use crate::domain::Source;
use crate::fetcher::{BackoffPolicy, Fetcher};

/// Resolves a source name to its client. Built once at startup from the
/// source table; no ambient global state.
pub struct ClientRegistry {
    clients: HashMap<String, Arc<dyn NewsClient>>,
}

impl ClientRegistry {
    pub fn from_sources(
        sources: Vec<Source>,
        fetcher: Arc<dyn Fetcher>,
        policy: BackoffPolicy,
    ) -> Self {
        let clients = sources
            .into_iter()
            .map(|source| {
                let name = source.name.clone();
                let client: Arc<dyn NewsClient> =
                    Arc::new(RuleClient::new(source, fetcher.clone(), policy));
                (name, client)
            })
            .collect();

        Self { clients }
    }

    pub fn get(&self, source: &str) -> Result<Arc<dyn NewsClient>> {
        self.clients
            .get(source)
            .cloned()
            .ok_or_else(|| NewsstandError::UnknownSource(source.to_string()))
    }

    pub fn clients(&self) -> impl Iterator<Item = &Arc<dyn NewsClient>> {
        self.clients.values()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
