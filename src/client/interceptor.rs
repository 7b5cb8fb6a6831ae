//! Client-side token handling: a background refresher that keeps a current
//! access token, and an interceptor that attaches it to protected calls.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tonic::metadata::{AsciiMetadataValue, MetadataMap};
use tonic::service::Interceptor;
use tonic::{GrpcMethod, Request, Status};
use tracing::{debug, info, instrument, warn};

use super::auth::TokenSource;
use crate::auth::AUTHORIZATION_HEADER;
use crate::{Error, Result};

/// Attaches `authorization: Bearer <token>` to calls whose method path is in
/// the protected set. Other calls go out unmodified.
#[derive(Clone)]
pub struct ClientAuthInterceptor {
    token: Arc<RwLock<String>>,
    protected: Arc<HashSet<String>>,
}

impl ClientAuthInterceptor {
    /// Creates an interceptor reading the token from `token` on every call.
    pub fn new<I, M>(token: Arc<RwLock<String>>, protected: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        Self {
            token,
            protected: Arc::new(protected.into_iter().map(Into::into).collect()),
        }
    }

    /// Whether calls to `method` carry the token.
    pub fn is_protected(&self, method: &str) -> bool {
        self.protected.contains(method)
    }

    /// Adds the current token to `metadata` if `method` is protected.
    pub fn attach(&self, method: &str, metadata: &mut MetadataMap) -> Result<()> {
        if !self.is_protected(method) {
            return Ok(());
        }

        let value: AsciiMetadataValue = format!("Bearer {}", self.token.read())
            .parse()
            .map_err(|_| Error::Internal("access token is not valid metadata".to_string()))?;
        metadata.insert(AUTHORIZATION_HEADER, value);

        Ok(())
    }
}

impl Interceptor for ClientAuthInterceptor {
    fn call(&mut self, mut request: Request<()>) -> std::result::Result<Request<()>, Status> {
        let method = request
            .extensions()
            .get::<GrpcMethod>()
            .map(|method| format!("/{}/{}", method.service(), method.method()));

        if let Some(method) = method {
            self.attach(&method, request.metadata_mut())?;
        }

        Ok(request)
    }
}

/// Keeps an access token fresh by logging in again every `refresh` period.
///
/// A failed refresh is logged and retried on the next tick; calls keep using
/// the last good token meanwhile. The loop stops on [`shutdown`] or when the
/// refresher is dropped.
///
/// [`shutdown`]: TokenRefresher::shutdown
pub struct TokenRefresher {
    token: Arc<RwLock<String>>,
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl TokenRefresher {
    /// Logs in once and starts the refresh loop.
    ///
    /// # Errors
    /// Fails if the initial login fails or `refresh` is zero.
    pub async fn start<S: TokenSource>(source: S, refresh: Duration) -> Result<Self> {
        if refresh.is_zero() {
            return Err(Error::InvalidArgument(
                "refresh period must be positive".to_string(),
            ));
        }

        let token = Arc::new(RwLock::new(source.login().await?));
        info!(refresh_secs = refresh.as_secs(), "access token obtained");

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(refresh_loop(source, Arc::clone(&token), refresh, shutdown_rx));

        Ok(Self {
            token,
            shutdown,
            handle: Some(handle),
        })
    }

    /// The current token.
    pub fn token(&self) -> String {
        self.token.read().clone()
    }

    /// An interceptor sharing this refresher's token.
    pub fn interceptor<I, M>(&self, protected: I) -> ClientAuthInterceptor
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        ClientAuthInterceptor::new(Arc::clone(&self.token), protected)
    }

    /// Stops the refresh loop and waits for it to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TokenRefresher {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

#[instrument(skip_all, name = "token_refresher")]
async fn refresh_loop<S: TokenSource>(
    source: S,
    token: Arc<RwLock<String>>,
    refresh: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + refresh, refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => match source.login().await {
                Ok(fresh) => {
                    *token.write() = fresh;
                    debug!("access token refreshed");
                }
                Err(e) => warn!(error = %e, "cannot refresh access token, keeping the last one"),
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    debug!("token refresher stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::proto::methods;

    #[derive(Clone)]
    struct Counting {
        calls: Arc<AtomicUsize>,
        fail_after: usize,
    }

    impl Counting {
        fn new(fail_after: usize) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                fail_after,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[tonic::async_trait]
    impl TokenSource for Counting {
        async fn login(&self) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n > self.fail_after {
                Err(Error::Unauthenticated("auth server down".into()))
            } else {
                Ok(format!("token-{n}"))
            }
        }
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn initial_login_then_periodic_refresh() {
        let source = Counting::new(usize::MAX);
        let refresher = TokenRefresher::start(source.clone(), Duration::from_secs(30))
            .await
            .unwrap();

        assert_eq!(refresher.token(), "token-1");

        tokio::time::sleep(Duration::from_secs(29)).await;
        settle().await;
        assert_eq!(source.calls(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(refresher.token(), "token-2");

        tokio::time::sleep(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(refresher.token(), "token-3");

        refresher.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_keeps_last_token() {
        let source = Counting::new(1);
        let refresher = TokenRefresher::start(source.clone(), Duration::from_secs(30))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(95)).await;
        settle().await;

        assert_eq!(source.calls(), 4);
        assert_eq!(refresher.token(), "token-1");

        refresher.shutdown().await;
    }

    #[tokio::test]
    async fn failed_initial_login_is_fatal() {
        let result = TokenRefresher::start(Counting::new(0), Duration::from_secs(30)).await;
        assert!(matches!(result, Err(Error::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn zero_refresh_period_is_rejected() {
        let source = Counting::new(usize::MAX);
        let result = TokenRefresher::start(source.clone(), Duration::ZERO).await;

        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_refreshing() {
        let source = Counting::new(usize::MAX);
        let refresher = TokenRefresher::start(source.clone(), Duration::from_secs(30))
            .await
            .unwrap();

        refresher.shutdown().await;
        tokio::time::sleep(Duration::from_secs(300)).await;
        settle().await;

        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_stops_refreshing() {
        let source = Counting::new(usize::MAX);
        let refresher = TokenRefresher::start(source.clone(), Duration::from_secs(30))
            .await
            .unwrap();

        drop(refresher);
        settle().await;
        tokio::time::sleep(Duration::from_secs(300)).await;
        settle().await;

        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn attaches_token_only_to_protected_methods() {
        let token = Arc::new(RwLock::new("abc".to_string()));
        let interceptor = ClientAuthInterceptor::new(
            Arc::clone(&token),
            [methods::CREATE_LAPTOP, methods::RATE_LAPTOP],
        );

        let mut metadata = MetadataMap::new();
        interceptor.attach(methods::CREATE_LAPTOP, &mut metadata).unwrap();
        assert_eq!(metadata.get(AUTHORIZATION_HEADER).unwrap().to_str().unwrap(), "Bearer abc");

        let mut metadata = MetadataMap::new();
        interceptor.attach(methods::SEARCH_LAPTOP, &mut metadata).unwrap();
        assert!(metadata.get(AUTHORIZATION_HEADER).is_none());
    }

    #[test]
    fn attaches_latest_token() {
        let token = Arc::new(RwLock::new("old".to_string()));
        let interceptor = ClientAuthInterceptor::new(Arc::clone(&token), [methods::UPLOAD_IMAGE]);

        *token.write() = "new".to_string();

        let mut metadata = MetadataMap::new();
        interceptor.attach(methods::UPLOAD_IMAGE, &mut metadata).unwrap();
        assert_eq!(metadata.get(AUTHORIZATION_HEADER).unwrap().to_str().unwrap(), "Bearer new");
    }

    #[test]
    fn call_without_method_extension_passes_through() {
        let token = Arc::new(RwLock::new("abc".to_string()));
        let mut interceptor = ClientAuthInterceptor::new(token, [methods::CREATE_LAPTOP]);

        let request = interceptor.call(Request::new(())).unwrap();
        assert!(request.metadata().get(AUTHORIZATION_HEADER).is_none());
    }
}
