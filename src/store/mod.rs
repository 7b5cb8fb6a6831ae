//! Concurrent in-memory catalog: laptops, ratings and image assets.

/// Per-call cancellation and deadline.
pub mod context;

/// Search predicate.
pub mod filter;

/// Laptop repository.
pub mod laptop;

/// Rating aggregates.
pub mod rating;

/// Image sink.
pub mod image;

use std::sync::Arc;

use tokio::pin;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

pub use context::CallContext;
pub use image::{DiskImageStore, ImageAsset, ImageStore};
pub use laptop::LaptopStore;
pub use rating::{Rating, RatingStore};

use crate::proto::{Filter, Laptop};
use crate::{Error, Result};

/// The domain store behind `LaptopService`.
#[derive(Clone)]
pub struct Catalog {
    laptops: LaptopStore,
    ratings: RatingStore,
    images: Arc<dyn ImageStore>,
}

impl Catalog {
    /// Creates a catalog committing images to `images`.
    pub fn new(images: Arc<dyn ImageStore>) -> Self {
        Self {
            laptops: LaptopStore::new(),
            ratings: RatingStore::new(),
            images,
        }
    }

    /// Laptop repository.
    pub fn laptops(&self) -> &LaptopStore {
        &self.laptops
    }

    /// Rating aggregates.
    pub fn ratings(&self) -> &RatingStore {
        &self.ratings
    }

    /// Image sink.
    pub fn images(&self) -> &dyn ImageStore {
        self.images.as_ref()
    }

    /// See [`LaptopStore::save`].
    pub async fn save(&self, laptop: Laptop) -> Result<String> {
        self.laptops.save(laptop).await
    }

    /// See [`LaptopStore::search`].
    pub async fn search<F, Fut>(&self, ctx: &CallContext, filter: &Filter, found: F) -> Result<()>
    where
        F: FnMut(Laptop) -> Fut,
        Fut: std::future::Future<Output = Result<()>>,
    {
        self.laptops.search(ctx, filter, found).await
    }

    /// Records `score` for an existing laptop and returns the new aggregate.
    pub async fn add_rating(&self, laptop_id: &str, score: f64) -> Result<Rating> {
        if !score.is_finite() {
            return Err(Error::InvalidArgument(format!("score {score} is not a number")));
        }

        let id = uuid::Uuid::parse_str(laptop_id).map_err(|_| laptop_not_found(laptop_id))?;

        if !self.laptops.contains(laptop_id).await {
            return Err(laptop_not_found(laptop_id));
        }

        self.ratings.add(id, score).await
    }

    /// Consumes `chunks` for an image of `laptop_id` and commits it.
    ///
    /// Fails with `NotFound` before reading anything if the laptop does not
    /// exist. Exceeding `max_size` (or declaring a larger `size_hint`) aborts
    /// with `InvalidArgument` and nothing is committed.
    pub async fn save_image_chunks<S>(
        &self,
        ctx: &CallContext,
        laptop_id: &str,
        image_type: &str,
        size_hint: u64,
        chunks: S,
        max_size: usize,
    ) -> Result<ImageAsset>
    where
        S: Stream<Item = Result<Vec<u8>>>,
    {
        let data = self
            .receive_image_chunks(ctx, laptop_id, size_hint, chunks, max_size)
            .await?;
        self.commit_image(ctx, laptop_id, image_type, data).await
    }

    /// Accumulates the bytes of an upload in memory, enforcing `max_size`.
    ///
    /// Cancellation is checked before every chunk is read.
    pub async fn receive_image_chunks<S>(
        &self,
        ctx: &CallContext,
        laptop_id: &str,
        size_hint: u64,
        chunks: S,
        max_size: usize,
    ) -> Result<Vec<u8>>
    where
        S: Stream<Item = Result<Vec<u8>>>,
    {
        if !self.laptops.contains(laptop_id).await {
            return Err(laptop_not_found(laptop_id));
        }

        if size_hint > max_size as u64 {
            return Err(too_large(size_hint, max_size));
        }

        pin!(chunks);
        let mut data = Vec::with_capacity(size_hint as usize);

        loop {
            ctx.check()?;

            let Some(chunk) = chunks.next().await else {
                break;
            };
            let chunk = chunk?;

            let size = data.len() + chunk.len();
            if size > max_size {
                return Err(too_large(size as u64, max_size));
            }

            debug!(chunk = chunk.len(), total = size, "received image chunk");
            data.extend_from_slice(&chunk);
        }

        Ok(data)
    }

    /// Hands a fully received image to the image sink.
    pub async fn commit_image(
        &self,
        ctx: &CallContext,
        laptop_id: &str,
        image_type: &str,
        data: Vec<u8>,
    ) -> Result<ImageAsset> {
        ctx.check()?;
        self.images.save(laptop_id, image_type, data).await
    }
}

fn laptop_not_found(laptop_id: &str) -> Error {
    Error::NotFound(format!("laptop {laptop_id} doesn't exist"))
}

fn too_large(size: u64, max_size: usize) -> Error {
    Error::InvalidArgument(format!("image is too large: {size} > {max_size}"))
}
