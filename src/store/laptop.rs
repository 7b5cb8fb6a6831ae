use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::context::CallContext;
use super::filter::matches;
use crate::proto::{Filter, Laptop};
use crate::{Error, Result};

/// Validates a client-supplied laptop id, or generates one when empty.
pub fn resolve_id(id: &str) -> Result<Uuid> {
    if id.is_empty() {
        return Ok(Uuid::new_v4());
    }

    Uuid::parse_str(id)
        .map_err(|e| Error::InvalidArgument(format!("laptop ID is not a valid UUID: {e}")))
}

/// Concurrent in-memory laptop repository.
///
/// Records are immutable once stored and ordered by id, which gives
/// searches a stable iteration order.
#[derive(Clone, Default)]
pub struct LaptopStore {
    laptops: Arc<RwLock<BTreeMap<Uuid, Arc<Laptop>>>>,
}

impl LaptopStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `laptop`, assigning an id if it has none, and returns the id.
    ///
    /// The check for an existing id and the insert happen under one write
    /// lock, so of several concurrent saves with the same id exactly one
    /// succeeds. The store takes ownership, so the caller keeps no alias to
    /// the stored record.
    pub async fn save(&self, mut laptop: Laptop) -> Result<String> {
        let id = resolve_id(&laptop.id)?;
        laptop.id = id.to_string();

        let mut laptops = self.laptops.write().await;

        if laptops.contains_key(&id) {
            return Err(Error::AlreadyExists(format!(
                "a laptop with ID {id} already exists"
            )));
        }

        let stored_id = laptop.id.clone();
        laptops.insert(id, Arc::new(laptop));
        Ok(stored_id)
    }

    /// Returns a copy of the laptop with `id`.
    pub async fn find(&self, id: &str) -> Option<Laptop> {
        let id = Uuid::parse_str(id).ok()?;
        self.laptops
            .read()
            .await
            .get(&id)
            .map(|laptop| Laptop::clone(laptop))
    }

    /// Whether a laptop with `id` exists.
    pub async fn contains(&self, id: &str) -> bool {
        match Uuid::parse_str(id) {
            Ok(id) => self.laptops.read().await.contains_key(&id),
            Err(_) => false,
        }
    }

    /// Number of stored laptops.
    pub async fn len(&self) -> usize {
        self.laptops.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.laptops.read().await.is_empty()
    }

    /// Streams every laptop matching `filter` to `found`, in id order.
    ///
    /// The set of candidates is snapshotted under the read lock at the start
    /// and the lock is released before any call to `found`, so saves made
    /// while a search is in flight proceed and are not reflected in it.
    /// Each emitted laptop is an owned copy.
    ///
    /// Cancellation is checked before every emit. An error from `found`
    /// stops the search and is reported as `Internal`, unless the call was
    /// cancelled or timed out meanwhile.
    pub async fn search<F, Fut>(
        &self,
        ctx: &CallContext,
        filter: &Filter,
        mut found: F,
    ) -> Result<()>
    where
        F: FnMut(Laptop) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let snapshot: Vec<Arc<Laptop>> = {
            let laptops = self.laptops.read().await;
            laptops
                .values()
                .filter(|laptop| matches(laptop, filter))
                .cloned()
                .collect()
        };

        debug!(matches = snapshot.len(), "search snapshot taken");

        for laptop in snapshot {
            ctx.check()?;

            if let Err(e) = found(Laptop::clone(&laptop)).await {
                ctx.check()?;
                debug!(error = %e, "search consumer failed");
                return Err(Error::Internal("cannot send search result".to_string()));
            }
        }

        Ok(())
    }
}
