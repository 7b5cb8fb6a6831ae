//! Error types for the catalog service.

use tonic::{Code, Status};

/// Main error type for the library.
///
/// Each variant corresponds to one status kind surfaced across the RPC
/// boundary, so conversion into [`Status`] never loses the kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The caller supplied a malformed or out-of-bounds value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A record with the same identifier already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing, malformed, forged or expired credentials.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Valid credentials without the role required by the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The caller cancelled the request.
    #[error("request is canceled")]
    Canceled,

    /// The caller's deadline passed before the work completed.
    #[error("deadline is exceeded")]
    DeadlineExceeded,

    /// Unexpected server-side fault.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias using the crate error.
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidArgument(msg) => Status::invalid_argument(msg),
            Error::AlreadyExists(msg) => Status::already_exists(msg),
            Error::NotFound(msg) => Status::not_found(msg),
            Error::Unauthenticated(msg) => Status::unauthenticated(msg),
            Error::PermissionDenied(msg) => Status::permission_denied(msg),
            Error::Canceled => Status::cancelled("request is canceled"),
            Error::DeadlineExceeded => Status::deadline_exceeded("deadline is exceeded"),
            Error::Internal(msg) => Status::internal(msg),
        }
    }
}

/// Maps a status received from the peer back into the crate taxonomy.
///
/// Codes outside the taxonomy (transport failures while reading a request
/// stream, `Unavailable` on the client side) become `Internal`.
impl From<Status> for Error {
    fn from(status: Status) -> Self {
        let message = status.message().to_string();
        match status.code() {
            Code::InvalidArgument => Error::InvalidArgument(message),
            Code::AlreadyExists => Error::AlreadyExists(message),
            Code::NotFound => Error::NotFound(message),
            Code::Unauthenticated => Error::Unauthenticated(message),
            Code::PermissionDenied => Error::PermissionDenied(message),
            Code::Cancelled => Error::Canceled,
            Code::DeadlineExceeded => Error::DeadlineExceeded,
            code => Error::Internal(format!("cannot receive response ({code:?})")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_maps_to_its_status_code() {
        let cases = [
            (Error::InvalidArgument("x".into()), Code::InvalidArgument),
            (Error::AlreadyExists("x".into()), Code::AlreadyExists),
            (Error::NotFound("x".into()), Code::NotFound),
            (Error::Unauthenticated("x".into()), Code::Unauthenticated),
            (Error::PermissionDenied("x".into()), Code::PermissionDenied),
            (Error::Canceled, Code::Cancelled),
            (Error::DeadlineExceeded, Code::DeadlineExceeded),
            (Error::Internal("x".into()), Code::Internal),
        ];

        for (err, code) in cases {
            assert_eq!(Status::from(err).code(), code);
        }
    }

    #[test]
    fn transport_status_maps_back() {
        assert_eq!(Error::from(Status::cancelled("gone")), Error::Canceled);
        assert_eq!(
            Error::from(Status::deadline_exceeded("late")),
            Error::DeadlineExceeded
        );
        assert_eq!(
            Error::from(Status::unauthenticated("expired")),
            Error::Unauthenticated("expired".into())
        );
        assert!(matches!(
            Error::from(Status::unavailable("broken pipe")),
            Error::Internal(_)
        ));
    }
}
