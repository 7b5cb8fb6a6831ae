use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tonic::metadata::MetadataMap;
use tonic::Request;

use crate::{Error, Result};

/// Metadata key of the caller's remaining time budget.
const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

type PeerProbe = Arc<dyn Fn() -> bool + Send + Sync>;

/// Cancellation and deadline signal for one call.
///
/// Store operations call [`CallContext::check`] before each unit of work
/// (one record, one chunk, one message), so cancellation is observed
/// promptly rather than only at call entry.
#[derive(Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
    peer_gone: Option<PeerProbe>,
}

impl CallContext {
    /// A context that never expires until cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context expiring at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::default()
        }
    }

    /// Derives the context of an incoming request from its `grpc-timeout`.
    pub fn from_request<T>(request: &Request<T>) -> Self {
        Self::from_metadata(request.metadata())
    }

    /// Derives a context from request metadata, measuring the timeout from now.
    pub fn from_metadata(metadata: &MetadataMap) -> Self {
        let deadline = metadata
            .get(GRPC_TIMEOUT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_grpc_timeout)
            .and_then(|timeout| Instant::now().checked_add(timeout));

        Self {
            deadline,
            ..Self::default()
        }
    }

    /// Treats the call as cancelled once `probe` returns true, e.g. when the
    /// response stream's receiver has been dropped.
    pub fn with_peer_probe(mut self, probe: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.peer_gone = Some(Arc::new(probe));
        self
    }

    /// Marks the call cancelled. Shared by all clones of this context.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether the call has been cancelled by either side.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.peer_gone.as_ref().is_some_and(|probe| probe())
    }

    /// Deadline of the call, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails with `Canceled` or `DeadlineExceeded` if work must stop.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Canceled);
        }

        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Error::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

/// Parses a `grpc-timeout` value: up to 8 ASCII digits followed by a unit
/// (`H`, `M`, `S`, `m`, `u`, `n`).
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 || !value.is_ascii() {
        return None;
    }

    let (digits, unit) = value.split_at(value.len() - 1);
    if digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    match unit {
        "H" => Some(Duration::from_secs(amount * 3600)),
        "M" => Some(Duration::from_secs(amount * 60)),
        "S" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_millis(amount)),
        "u" => Some(Duration::from_micros(amount)),
        "n" => Some(Duration::from_nanos(amount)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timeout_units() {
        assert_eq!(parse_grpc_timeout("1H"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_grpc_timeout("2M"), Some(Duration::from_secs(120)));
        assert_eq!(parse_grpc_timeout("3S"), Some(Duration::from_secs(3)));
        assert_eq!(parse_grpc_timeout("250m"), Some(Duration::from_millis(250)));
        assert_eq!(parse_grpc_timeout("7u"), Some(Duration::from_micros(7)));
        assert_eq!(parse_grpc_timeout("9n"), Some(Duration::from_nanos(9)));
    }

    #[test]
    fn rejects_malformed_timeouts() {
        assert_eq!(parse_grpc_timeout(""), None);
        assert_eq!(parse_grpc_timeout("S"), None);
        assert_eq!(parse_grpc_timeout("10x"), None);
        assert_eq!(parse_grpc_timeout("-1S"), None);
        assert_eq!(parse_grpc_timeout("123456789S"), None);
    }

    #[test]
    fn fresh_context_passes() {
        assert!(CallContext::new().check().is_ok());
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let ctx = CallContext::new();
        let clone = ctx.clone();
        clone.cancel();
        assert_eq!(ctx.check(), Err(Error::Canceled));
    }

    #[test]
    fn deadline_is_distinct_from_cancellation() {
        let ctx = CallContext::with_deadline(Instant::now());
        assert_eq!(ctx.check(), Err(Error::DeadlineExceeded));

        let future = CallContext::with_deadline(Instant::now() + Duration::from_secs(60));
        assert!(future.check().is_ok());
    }

    #[test]
    fn peer_probe_cancels() {
        let gone = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&gone);
        let ctx = CallContext::new().with_peer_probe(move || flag.load(Ordering::SeqCst));

        assert!(ctx.check().is_ok());
        gone.store(true, Ordering::SeqCst);
        assert_eq!(ctx.check(), Err(Error::Canceled));
    }

    #[test]
    fn deadline_read_from_metadata() {
        let mut metadata = MetadataMap::new();
        metadata.insert(GRPC_TIMEOUT_HEADER, "5S".parse().unwrap());
        let ctx = CallContext::from_metadata(&metadata);

        let deadline = ctx.deadline().unwrap();
        assert!(deadline > Instant::now());
        assert!(deadline <= Instant::now() + Duration::from_secs(5));
    }
}
