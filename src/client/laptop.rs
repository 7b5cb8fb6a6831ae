use std::path::Path;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Channel;
use tracing::{debug, info};

use super::interceptor::ClientAuthInterceptor;
use crate::proto::laptop_service_client::LaptopServiceClient;
use crate::proto::upload_image_request::Data;
use crate::proto::{
    CreateLaptopRequest, Filter, ImageInfo, Laptop, RateLaptopRequest, RateLaptopResponse,
    SearchLaptopRequest, UploadImageRequest, UploadImageResponse,
};
use crate::{Error, Result};

/// Size of each `chunk_data` message sent by [`LaptopClient::upload_image`].
pub const UPLOAD_CHUNK_SIZE: usize = 1024;

/// Channel type of an authenticated catalog client.
pub type AuthChannel = InterceptedService<Channel, ClientAuthInterceptor>;

/// Convenience wrapper over the generated `LaptopService` client.
#[derive(Clone)]
pub struct LaptopClient {
    client: LaptopServiceClient<AuthChannel>,
}

impl LaptopClient {
    /// Creates a client sending every call through `interceptor`.
    pub fn new(channel: Channel, interceptor: ClientAuthInterceptor) -> Self {
        Self {
            client: LaptopServiceClient::with_interceptor(channel, interceptor),
        }
    }

    /// Creates `laptop` and returns its id.
    pub async fn create_laptop(&self, laptop: Laptop) -> Result<String> {
        let mut client = self.client.clone();
        let response = client
            .create_laptop(CreateLaptopRequest {
                laptop: Some(laptop),
            })
            .await?;

        let id = response.into_inner().id;
        info!(%id, "created laptop");
        Ok(id)
    }

    /// Collects every laptop matching `filter`.
    pub async fn search_laptop(&self, filter: Filter) -> Result<Vec<Laptop>> {
        let mut client = self.client.clone();
        let mut stream = client
            .search_laptop(SearchLaptopRequest {
                filter: Some(filter),
            })
            .await?
            .into_inner();

        let mut laptops = Vec::new();
        while let Some(response) = stream.message().await? {
            if let Some(laptop) = response.laptop {
                debug!(id = %laptop.id, price = laptop.price_usd, "found laptop");
                laptops.push(laptop);
            }
        }

        Ok(laptops)
    }

    /// Uploads `data` as an image of `laptop_id`: an info message followed
    /// by [`UPLOAD_CHUNK_SIZE`] byte chunks.
    pub async fn upload_image(
        &self,
        laptop_id: &str,
        image_type: &str,
        data: Vec<u8>,
    ) -> Result<UploadImageResponse> {
        let info = UploadImageRequest {
            data: Some(Data::Info(ImageInfo {
                laptop_id: laptop_id.to_string(),
                image_type: image_type.to_string(),
                size_hint: data.len() as u64,
            })),
        };

        let mut messages = Vec::with_capacity(1 + data.len().div_ceil(UPLOAD_CHUNK_SIZE));
        messages.push(info);
        messages.extend(data.chunks(UPLOAD_CHUNK_SIZE).map(|chunk| UploadImageRequest {
            data: Some(Data::ChunkData(chunk.to_vec())),
        }));

        let mut client = self.client.clone();
        let response = client
            .upload_image(tokio_stream::iter(messages))
            .await?
            .into_inner();

        info!(image_id = %response.id, size = response.size, "uploaded image");
        Ok(response)
    }

    /// Reads the file at `path` and uploads it, taking the image type from
    /// the file extension.
    pub async fn upload_image_file(
        &self,
        laptop_id: &str,
        path: impl AsRef<Path>,
    ) -> Result<UploadImageResponse> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|e| {
            Error::InvalidArgument(format!("cannot read image file {}: {e}", path.display()))
        })?;
        let image_type = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        self.upload_image(laptop_id, &image_type, data).await
    }

    /// Sends each `(laptop_id, score)` over one `RateLaptop` stream, waiting
    /// for the answer to a score before sending the next.
    pub async fn rate_laptops(
        &self,
        scores: Vec<(String, f64)>,
    ) -> Result<Vec<RateLaptopResponse>> {
        let mut pending = scores.into_iter().map(|(laptop_id, score)| RateLaptopRequest {
            laptop_id,
            score,
        });

        let Some(first) = pending.next() else {
            return Ok(Vec::new());
        };

        let (tx, rx) = mpsc::channel(1);
        tx.send(first)
            .await
            .map_err(|_| Error::Internal("cannot send rating".to_string()))?;
        let mut outbound = Some(tx);

        let mut client = self.client.clone();
        let mut inbound = client
            .rate_laptop(ReceiverStream::new(rx))
            .await?
            .into_inner();

        let mut responses = Vec::new();
        while let Some(response) = inbound.message().await? {
            debug!(
                laptop_id = %response.laptop_id,
                count = response.rated_count,
                average = response.average_score,
                "received rating"
            );
            responses.push(response);

            match (pending.next(), outbound.as_ref()) {
                (Some(next), Some(tx)) => tx
                    .send(next)
                    .await
                    .map_err(|_| Error::Internal("cannot send rating".to_string()))?,
                // Half-close so the server ends the stream.
                _ => outbound = None,
            }
        }

        Ok(responses)
    }
}
