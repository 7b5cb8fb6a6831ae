//! gRPC service implementations.

/// `AuthService`: login.
pub mod auth;

/// `LaptopService`: create, search, upload and rate.
pub mod laptop;

pub use auth::AuthServiceImpl;
pub use laptop::{LaptopServiceImpl, SearchPhase, SearchProgress, UploadPhase};
