//! Ingestion orchestrator.
//!
//! Drives the two workflows over the clients and the store: a refresh run
//! (`Idle → Fetching → Merging → Idle`, per-feed tasks in parallel under a
//! semaphore) and hydrate-on-demand (at most one in-flight hydration per
//! item key; later callers attach to the pending result instead of issuing
//! a duplicate fetch). Clients never touch the store directly; every write
//! goes through here.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::app::error::{NewsstandError, Result};
use crate::cancel::CancelToken;
use crate::client::ClientRegistry;
use crate::domain::Item;
use crate::store::ItemStore;

pub const DEFAULT_WORKERS: usize = 10;

/// Outcome of one refresh run. A degraded source returned an empty batch
/// because its retries were exhausted; the run still completes with
/// whatever the other sources produced.
#[derive(Debug, Default)]
pub struct RefreshSummary {
    pub feeds_fetched: usize,
    pub sources_degraded: usize,
    pub items_merged: usize,
    pub cancelled: bool,
}

type SharedHydration = Shared<BoxFuture<'static, Option<Item>>>;

pub struct Orchestrator {
    registry: Arc<ClientRegistry>,
    store: Arc<dyn ItemStore + Send + Sync>,
    semaphore: Arc<Semaphore>,
    inflight: Mutex<HashMap<String, SharedHydration>>,
}

impl Orchestrator {
    pub fn new(registry: Arc<ClientRegistry>, store: Arc<dyn ItemStore + Send + Sync>) -> Self {
        Self::with_workers(registry, store, DEFAULT_WORKERS)
    }

    pub fn with_workers(
        registry: Arc<ClientRegistry>,
        store: Arc<dyn ItemStore + Send + Sync>,
        workers: usize,
    ) -> Self {
        Self {
            registry,
            store,
            semaphore: Arc::new(Semaphore::new(workers)),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Refresh every feed of every registered source. Per-feed failures
    /// never abort the run; a cancelled run leaves the store untouched.
    pub async fn refresh_all(&self, cancel: &CancelToken) -> Result<RefreshSummary> {
        debug!("Refresh run: fetching");

        let mut handles = Vec::new();
        for client in self.registry.clients() {
            for endpoint in client.source().feeds.clone() {
                let client = client.clone();
                let semaphore = self.semaphore.clone();
                let cancel = cancel.clone();

                handles.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire().await.expect("Semaphore closed");
                    let batch = client.fetch_feed(&endpoint, &cancel).await;
                    (client.source().name.clone(), batch)
                }));
            }
        }

        let mut summary = RefreshSummary::default();
        let mut degraded_sources: HashSet<String> = HashSet::new();
        let mut items: Vec<Item> = Vec::new();

        // The run is complete only once every feed has either succeeded or
        // exhausted its retries.
        for handle in handles {
            match handle.await {
                Ok((source, batch)) => {
                    summary.feeds_fetched += 1;
                    if batch.degraded {
                        degraded_sources.insert(source);
                    }
                    items.extend(batch.items);
                }
                Err(e) => {
                    error!("Fetch task join error: {e}");
                }
            }
        }
        summary.sources_degraded = degraded_sources.len();

        if cancel.is_cancelled() {
            summary.cancelled = true;
            return Ok(summary);
        }

        debug!("Refresh run: merging {} items", items.len());
        let merged = self.store.merge(&items)?;
        summary.items_merged = merged.len();

        info!(
            feeds = summary.feeds_fetched,
            degraded = summary.sources_degraded,
            merged = summary.items_merged,
            "Refresh run complete"
        );
        Ok(summary)
    }

    /// Hydrate one stored item on demand and merge the result back.
    ///
    /// Returns the post-merge item, or `None` when the operation was
    /// cancelled before delivery. A request for a key that is already
    /// being hydrated attaches to the in-flight result.
    pub async fn hydrate(&self, key: &str, cancel: &CancelToken) -> Result<Option<Item>> {
        let fut = {
            let mut inflight = self
                .inflight
                .lock()
                .map_err(|_| NewsstandError::Config("Hydration map poisoned".into()))?;

            if let Some(existing) = inflight.get(key) {
                debug!(key, "Attaching to in-flight hydration");
                existing.clone()
            } else {
                let item = self
                    .store
                    .get(key)?
                    .ok_or_else(|| NewsstandError::ItemNotFound(key.to_string()))?;
                let client = self.registry.get(&item.source)?;
                let store = self.store.clone();
                let cancel = cancel.clone();

                let task = tokio::spawn(async move {
                    let hydrated = client.hydrate(item, &cancel).await;
                    if cancel.is_cancelled() {
                        return None;
                    }
                    match store.merge(std::slice::from_ref(&hydrated)) {
                        Ok(mut merged) => merged.pop(),
                        Err(error) => {
                            error!(%error, "Failed to merge hydrated item");
                            None
                        }
                    }
                });

                let fut: SharedHydration =
                    async move { task.await.ok().flatten() }.boxed().shared();
                inflight.insert(key.to_string(), fut.clone());
                fut
            }
        };

        let result = fut.clone().await;

        let mut inflight = self
            .inflight
            .lock()
            .map_err(|_| NewsstandError::Config("Hydration map poisoned".into()))?;
        if let Some(current) = inflight.get(key) {
            if current.ptr_eq(&fut) {
                inflight.remove(key);
            }
        }

        Ok(result)
    }
}
