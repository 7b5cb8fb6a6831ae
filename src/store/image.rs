use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, error};
use uuid::Uuid;

use crate::{Error, Result};

/// A committed image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageAsset {
    /// Generated image id.
    pub id: String,
    /// Laptop the image belongs to.
    pub laptop_id: String,
    /// Size in bytes.
    pub size: u64,
    /// Where the bytes were written.
    pub location: String,
}

/// Rejects image types that could escape the image folder, e.g. `/../x`.
pub fn validate_image_type(image_type: &str) -> Result<()> {
    if image_type.contains(['/', '\\']) || image_type.contains("..") {
        return Err(Error::InvalidArgument(format!(
            "invalid image type '{image_type}'"
        )));
    }
    Ok(())
}

/// Sink for completed image uploads.
#[tonic::async_trait]
pub trait ImageStore: Send + Sync {
    /// Persists `data` under a newly generated id.
    async fn save(&self, laptop_id: &str, image_type: &str, data: Vec<u8>) -> Result<ImageAsset>;

    /// Looks up a committed image.
    async fn find(&self, image_id: &str) -> Option<ImageAsset>;
}

/// Writes images as files in a folder, named `<id><image_type>`.
pub struct DiskImageStore {
    folder: PathBuf,
    images: Arc<RwLock<HashMap<String, ImageAsset>>>,
}

impl DiskImageStore {
    /// Creates a store writing into `folder` (created on first save).
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            images: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of committed images.
    pub async fn len(&self) -> usize {
        self.images.read().await.len()
    }

    /// Whether no image has been committed.
    pub async fn is_empty(&self) -> bool {
        self.images.read().await.is_empty()
    }
}

#[tonic::async_trait]
impl ImageStore for DiskImageStore {
    async fn save(&self, laptop_id: &str, image_type: &str, data: Vec<u8>) -> Result<ImageAsset> {
        validate_image_type(image_type)?;

        let image_id = Uuid::new_v4().to_string();
        let path = self.folder.join(format!("{image_id}{image_type}"));
        let partial = self.folder.join(format!("{image_id}{image_type}.part"));

        fs::create_dir_all(&self.folder).await.map_err(|e| {
            error!(folder = %self.folder.display(), error = %e, "cannot create image folder");
            Error::Internal("cannot save image".to_string())
        })?;

        // Write aside and rename so a failed write never leaves a visible
        // partial image.
        if let Err(e) = fs::write(&partial, &data).await {
            error!(path = %partial.display(), error = %e, "cannot write image");
            let _ = fs::remove_file(&partial).await;
            return Err(Error::Internal("cannot save image".to_string()));
        }
        if let Err(e) = fs::rename(&partial, &path).await {
            error!(path = %path.display(), error = %e, "cannot commit image");
            let _ = fs::remove_file(&partial).await;
            return Err(Error::Internal("cannot save image".to_string()));
        }

        let asset = ImageAsset {
            id: image_id.clone(),
            laptop_id: laptop_id.to_string(),
            size: data.len() as u64,
            location: path.display().to_string(),
        };

        self.images.write().await.insert(image_id, asset.clone());
        debug!(image_id = %asset.id, size = asset.size, "image committed");

        Ok(asset)
    }

    async fn find(&self, image_id: &str) -> Option<ImageAsset> {
        self.images.read().await.get(image_id).cloned()
    }
}
