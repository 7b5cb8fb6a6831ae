//! # pcbook
//!
//! A laptop catalog served over gRPC.
//!
//! Clients log in with a username and password and receive a short-lived
//! signed access token. Calls to protected methods carry the token as a
//! bearer credential and are checked against a per-method role table before
//! any handler runs; methods missing from the table are public.
//!
//! The catalog supports four calls over a shared in-memory store:
//!
//! - `CreateLaptop`: store a laptop under a client or server chosen UUID
//! - `SearchLaptop`: stream every laptop matching a filter
//! - `UploadImage`: stream an image for a laptop in chunks
//! - `RateLaptop`: exchange scores for running averages over one stream
//!
//! ## Server
//!
//! ```ignore
//! use std::sync::Arc;
//! use pcbook::auth::{AccessPolicy, AuthInterceptor, MethodPathLayer, TokenManager};
//! use pcbook::proto::laptop_service_server::LaptopServiceServer;
//! use pcbook::service::LaptopServiceImpl;
//! use pcbook::store::{Catalog, DiskImageStore};
//!
//! let tokens = Arc::new(TokenManager::new(b"secret", Duration::from_secs(900)));
//! let auth = AuthInterceptor::new(tokens, AccessPolicy::laptop_service());
//! let catalog = Catalog::new(Arc::new(DiskImageStore::new("img")));
//!
//! Server::builder()
//!     .layer(MethodPathLayer)
//!     .add_service(LaptopServiceServer::with_interceptor(
//!         LaptopServiceImpl::new(catalog, 1 << 20),
//!         auth,
//!     ))
//!     .serve(addr)
//!     .await?;
//! ```
//!
//! ## Client
//!
//! ```ignore
//! use pcbook::client::{AuthClient, LaptopClient, TokenRefresher};
//!
//! let source = AuthClient::new(channel.clone(), "admin1", "secret");
//! let refresher = TokenRefresher::start(source, refresh).await?;
//! let interceptor = refresher.interceptor(AccessPolicy::laptop_service().protected_methods());
//! let laptops = LaptopClient::new(channel, interceptor);
//! let id = laptops.create_laptop(pcbook::sample::new_laptop()).await?;
//! ```

/// Error types.
pub mod error;

/// Wire messages and generated gRPC stubs.
pub mod proto;

/// Accounts, tokens and authorization.
pub mod auth;

/// Laptop, rating and image storage.
pub mod store;

/// gRPC service implementations.
pub mod service;

/// Client helpers.
pub mod client;

/// Server configuration.
pub mod config;

/// Sample data.
pub mod sample;

pub use error::{Error, Result};
