use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{Error, Result};

/// Running score aggregate for one laptop.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rating {
    /// Number of scores received.
    pub count: u32,
    /// Sum of all scores received.
    pub sum: f64,
}

impl Rating {
    /// Mean score, or zero before the first score.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / f64::from(self.count)
        }
    }
}

/// Per-laptop rating aggregates.
///
/// Each aggregate sits behind its own mutex: updates to one laptop
/// serialize, updates to different laptops only share the brief map lookup.
#[derive(Clone, Default)]
pub struct RatingStore {
    ratings: Arc<RwLock<HashMap<Uuid, Arc<Mutex<Rating>>>>>,
}

impl RatingStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `score` to the aggregate for `laptop_id`, creating it on first
    /// use, and returns the updated aggregate.
    ///
    /// Fails with `Internal`, leaving the aggregate untouched, once the
    /// count cannot grow any further.
    pub async fn add(&self, laptop_id: Uuid, score: f64) -> Result<Rating> {
        let slot = self.slot(laptop_id).await;
        let mut rating = slot.lock();
        rating.count = rating.count.checked_add(1).ok_or_else(|| {
            Error::Internal(format!("rating count of laptop {laptop_id} is exhausted"))
        })?;
        rating.sum += score;
        Ok(*rating)
    }

    /// Current aggregate for `laptop_id`, if any score was recorded.
    pub async fn get(&self, laptop_id: Uuid) -> Option<Rating> {
        let slot = self.ratings.read().await.get(&laptop_id).cloned()?;
        let rating = *slot.lock();
        Some(rating)
    }

    async fn slot(&self, laptop_id: Uuid) -> Arc<Mutex<Rating>> {
        if let Some(slot) = self.ratings.read().await.get(&laptop_id) {
            return Arc::clone(slot);
        }

        let mut ratings = self.ratings.write().await;
        Arc::clone(ratings.entry(laptop_id).or_default())
    }
}
