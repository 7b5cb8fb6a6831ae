use std::fmt;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, instrument, warn};

use crate::proto::laptop_service_server::LaptopService;
use crate::proto::upload_image_request::Data;
use crate::proto::{
    CreateLaptopRequest, CreateLaptopResponse, Filter, RateLaptopRequest, RateLaptopResponse,
    SearchLaptopRequest, SearchLaptopResponse, UploadImageRequest, UploadImageResponse,
};
use crate::store::image::validate_image_type;
use crate::store::laptop::resolve_id;
use crate::store::{CallContext, Catalog};
use crate::{Error, Result};

/// Matches found ahead of the client before the search task waits.
const SEARCH_BUFFER: usize = 16;

/// Lifecycle of one `SearchLaptop` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchPhase {
    /// Request received, filter decoded.
    Filtering,
    /// Matches are being sent.
    Streaming,
    /// Every match was sent.
    Done,
    /// Cancelled, past its deadline, or the client went away.
    Aborted,
}

impl fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchPhase::Filtering => "filtering",
            SearchPhase::Streaming => "streaming",
            SearchPhase::Done => "done",
            SearchPhase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Where a search task stopped and how many matches it handed to the
/// response stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchProgress {
    /// Last phase reached.
    pub phase: SearchPhase,
    /// Matches sent, including one whose send failed.
    pub sent: usize,
}

/// Lifecycle of one `UploadImage` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadPhase {
    /// Waiting for the `ImageInfo` message.
    AwaitingMetadata,
    /// Accumulating chunks.
    Receiving,
    /// Handing the bytes to the image sink.
    Committing,
    /// Image stored.
    Complete,
    /// Upload rejected; nothing was committed.
    Failed,
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadPhase::AwaitingMetadata => "awaiting-metadata",
            UploadPhase::Receiving => "receiving",
            UploadPhase::Committing => "committing",
            UploadPhase::Complete => "complete",
            UploadPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// gRPC `LaptopService` over a shared [`Catalog`].
#[derive(Clone)]
pub struct LaptopServiceImpl {
    catalog: Catalog,
    max_image_size: usize,
}

impl LaptopServiceImpl {
    /// Creates the service. Uploads larger than `max_image_size` bytes are
    /// rejected.
    pub fn new(catalog: Catalog, max_image_size: usize) -> Self {
        Self {
            catalog,
            max_image_size,
        }
    }

    /// The catalog this service reads and writes.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    async fn create(&self, ctx: &CallContext, req: CreateLaptopRequest) -> Result<String> {
        let mut laptop = req
            .laptop
            .ok_or_else(|| Error::InvalidArgument("laptop is required".to_string()))?;

        laptop.id = resolve_id(&laptop.id)?.to_string();
        tracing::Span::current().record("laptop_id", laptop.id.as_str());

        ctx.check()?;

        self.catalog.save(laptop).await
    }

    /// Runs an upload over any stream of request messages.
    ///
    /// `phase` is left at the point the upload reached, so callers can tell
    /// where a failure happened.
    pub async fn upload<S>(
        &self,
        ctx: &CallContext,
        mut messages: S,
        phase: &mut UploadPhase,
    ) -> Result<UploadImageResponse>
    where
        S: Stream<Item = std::result::Result<UploadImageRequest, Status>> + Unpin,
    {
        *phase = UploadPhase::AwaitingMetadata;
        ctx.check()?;

        let info = match messages.next().await {
            Some(Ok(UploadImageRequest {
                data: Some(Data::Info(info)),
            })) => info,
            Some(Ok(_)) => {
                return Err(Error::InvalidArgument(
                    "first message must carry image info".to_string(),
                ));
            }
            Some(Err(status)) => return Err(status.into()),
            None => {
                return Err(Error::InvalidArgument("missing image info".to_string()));
            }
        };
        validate_image_type(&info.image_type)?;

        *phase = UploadPhase::Receiving;
        debug!(laptop_id = %info.laptop_id, image_type = %info.image_type, "receiving image");

        let chunks = messages.map(|message| match message {
            Ok(UploadImageRequest {
                data: Some(Data::ChunkData(chunk)),
            }) => Ok(chunk),
            Ok(_) => Err(Error::InvalidArgument(
                "expected chunk data after image info".to_string(),
            )),
            Err(status) => Err(status.into()),
        });

        let data = self
            .catalog
            .receive_image_chunks(
                ctx,
                &info.laptop_id,
                info.size_hint,
                chunks,
                self.max_image_size,
            )
            .await?;

        *phase = UploadPhase::Committing;
        let asset = self
            .catalog
            .commit_image(ctx, &info.laptop_id, &info.image_type, data)
            .await?;

        *phase = UploadPhase::Complete;
        Ok(UploadImageResponse {
            id: asset.id,
            size: asset.size,
        })
    }
}

type SearchSender = mpsc::Sender<std::result::Result<SearchLaptopResponse, Status>>;

/// Streams every match for `filter` into `tx`, tracking `progress`.
async fn stream_search(
    catalog: &Catalog,
    ctx: &CallContext,
    filter: &Filter,
    tx: &SearchSender,
    progress: &mut SearchProgress,
) -> Result<()> {
    progress.phase = SearchPhase::Filtering;

    catalog
        .search(ctx, filter, |laptop| {
            progress.phase = SearchPhase::Streaming;
            progress.sent += 1;
            let tx = tx.clone();
            async move {
                tx.send(Ok(SearchLaptopResponse {
                    laptop: Some(laptop),
                }))
                .await
                .map_err(|_| Error::Canceled)
            }
        })
        .await
}

/// Runs a search on its own task and returns the response stream with the
/// task handle.
///
/// The task stops before its next send once the stream is dropped, or once
/// `ctx` is cancelled or past its deadline; the error is then sent as the
/// final stream item.
fn spawn_search(
    catalog: Catalog,
    ctx: CallContext,
    filter: Filter,
) -> (
    ReceiverStream<std::result::Result<SearchLaptopResponse, Status>>,
    JoinHandle<SearchProgress>,
) {
    let (tx, rx) = mpsc::channel(SEARCH_BUFFER);
    let probe = tx.clone();
    let ctx = ctx.with_peer_probe(move || probe.is_closed());

    let handle = tokio::spawn(async move {
        let start = Instant::now();
        let mut progress = SearchProgress {
            phase: SearchPhase::Filtering,
            sent: 0,
        };

        let result = stream_search(&catalog, &ctx, &filter, &tx, &mut progress).await;

        histogram!("laptop.search.duration").record(start.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                progress.phase = SearchPhase::Done;
                counter!("laptop.search.success").increment(1);
                info!(sent = progress.sent, phase = %progress.phase, "search finished");
            }
            Err(e) => {
                progress.phase = SearchPhase::Aborted;
                counter!("laptop.search.failure").increment(1);
                warn!(sent = progress.sent, phase = %progress.phase, error = %e, "search aborted");
                let _ = tx.send(Err(e.into())).await;
            }
        }

        progress
    });

    (ReceiverStream::new(rx), handle)
}

/// Reads scores one at a time and answers each with the updated aggregate
/// before reading the next. Returns the number of scores processed once the
/// client half-closes.
async fn rate_exchange<S>(
    catalog: &Catalog,
    ctx: &CallContext,
    mut inbound: S,
    outbound: &mpsc::Sender<std::result::Result<RateLaptopResponse, Status>>,
) -> Result<u32>
where
    S: Stream<Item = std::result::Result<RateLaptopRequest, Status>> + Unpin,
{
    let mut rated = 0;

    loop {
        ctx.check()?;

        let Some(message) = inbound.next().await else {
            return Ok(rated);
        };
        let req = message?;

        let rating = catalog.add_rating(&req.laptop_id, req.score).await?;
        debug!(laptop_id = %req.laptop_id, score = req.score, count = rating.count, "laptop rated");

        outbound
            .send(Ok(RateLaptopResponse {
                laptop_id: req.laptop_id,
                rated_count: rating.count,
                average_score: rating.average(),
            }))
            .await
            .map_err(|_| Error::Internal("cannot send stream response".to_string()))?;

        rated += 1;
    }
}

#[tonic::async_trait]
impl LaptopService for LaptopServiceImpl {
    #[instrument(skip_all, fields(laptop_id))]
    async fn create_laptop(
        &self,
        request: Request<CreateLaptopRequest>,
    ) -> std::result::Result<Response<CreateLaptopResponse>, Status> {
        let start = Instant::now();
        counter!("laptop.create.requests").increment(1);

        let ctx = CallContext::from_request(&request);
        let result = self.create(&ctx, request.into_inner()).await;

        histogram!("laptop.create.duration").record(start.elapsed().as_secs_f64());

        match result {
            Ok(id) => {
                counter!("laptop.create.success").increment(1);
                info!(%id, "saved laptop");
                Ok(Response::new(CreateLaptopResponse { id }))
            }
            Err(e) => {
                counter!("laptop.create.failure").increment(1);
                warn!(error = %e, "cannot save laptop");
                Err(e.into())
            }
        }
    }

    type SearchLaptopStream = ReceiverStream<std::result::Result<SearchLaptopResponse, Status>>;

    async fn search_laptop(
        &self,
        request: Request<SearchLaptopRequest>,
    ) -> std::result::Result<Response<Self::SearchLaptopStream>, Status> {
        counter!("laptop.search.requests").increment(1);

        let ctx = CallContext::from_request(&request);
        let filter = request.into_inner().filter.unwrap_or_default();
        debug!(?filter, "search requested");

        let (stream, _task) = spawn_search(self.catalog.clone(), ctx, filter);
        Ok(Response::new(stream))
    }

    async fn upload_image(
        &self,
        request: Request<Streaming<UploadImageRequest>>,
    ) -> std::result::Result<Response<UploadImageResponse>, Status> {
        let start = Instant::now();
        counter!("laptop.upload.requests").increment(1);

        let ctx = CallContext::from_request(&request);
        let mut phase = UploadPhase::AwaitingMetadata;
        let result = self.upload(&ctx, request.into_inner(), &mut phase).await;

        histogram!("laptop.upload.duration").record(start.elapsed().as_secs_f64());

        match result {
            Ok(response) => {
                counter!("laptop.upload.success").increment(1);
                info!(image_id = %response.id, size = response.size, %phase, "saved image");
                Ok(Response::new(response))
            }
            Err(e) => {
                counter!("laptop.upload.failure").increment(1);
                warn!(at = %phase, phase = %UploadPhase::Failed, error = %e, "upload failed");
                Err(e.into())
            }
        }
    }

    type RateLaptopStream = ReceiverStream<std::result::Result<RateLaptopResponse, Status>>;

    async fn rate_laptop(
        &self,
        request: Request<Streaming<RateLaptopRequest>>,
    ) -> std::result::Result<Response<Self::RateLaptopStream>, Status> {
        counter!("laptop.rate.requests").increment(1);

        let ctx = CallContext::from_request(&request);
        let inbound = request.into_inner();

        let (tx, rx) = mpsc::channel(1);
        let probe = tx.clone();
        let ctx = ctx.with_peer_probe(move || probe.is_closed());
        let catalog = self.catalog.clone();

        tokio::spawn(async move {
            let start = Instant::now();
            let result = rate_exchange(&catalog, &ctx, inbound, &tx).await;

            histogram!("laptop.rate.duration").record(start.elapsed().as_secs_f64());

            match result {
                Ok(rated) => {
                    counter!("laptop.rate.success").increment(1);
                    info!(rated, "rating stream closed");
                }
                Err(e) => {
                    counter!("laptop.rate.failure").increment(1);
                    warn!(error = %e, "rating stream aborted");
                    let _ = tx.send(Err(e.into())).await;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
