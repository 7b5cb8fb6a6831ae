//! Client side of the catalog: login, token refresh and the laptop RPCs.

/// Login and the token source abstraction.
pub mod auth;

/// Token attachment and refresh.
pub mod interceptor;

/// Catalog RPC wrapper.
pub mod laptop;

pub use auth::{AuthClient, TokenSource};
pub use interceptor::{ClientAuthInterceptor, TokenRefresher};
pub use laptop::{AuthChannel, LaptopClient, UPLOAD_CHUNK_SIZE};
