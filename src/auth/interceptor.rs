//! Server-side authentication and authorization for every RPC.
//!
//! tonic interceptors only see metadata and extensions, not the request
//! URI, so [`MethodPathLayer`] runs first at the HTTP level and records the
//! method path as an [`OperationPath`] extension. [`AuthInterceptor`] then
//! resolves it against the [`AccessPolicy`]. Both unary and streaming calls
//! pass through the same check once, at call setup; a token that expires
//! while a stream is open is not re-validated.

use std::sync::Arc;
use std::task::{Context, Poll};

use tonic::metadata::MetadataMap;
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::jwt::{Claims, TokenManager};
use super::policy::AccessPolicy;
use crate::{Error, Result};

/// Metadata key carrying the access token.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Full gRPC method path of the current request, e.g.
/// `/pcbook.LaptopService/CreateLaptop`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationPath(pub String);

/// Tower layer that tags each request with its [`OperationPath`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MethodPathLayer;

impl<S> Layer<S> for MethodPathLayer {
    type Service = MethodPath<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MethodPath { inner }
    }
}

/// Service produced by [`MethodPathLayer`].
#[derive(Clone, Debug)]
pub struct MethodPath<S> {
    inner: S,
}

impl<S, B> Service<http::Request<B>> for MethodPath<S>
where
    S: Service<http::Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        let path = req.uri().path().to_string();
        req.extensions_mut().insert(OperationPath(path));
        self.inner.call(req)
    }
}

/// Checks the caller's token and role before any handler runs.
///
/// On success for a protected method the verified [`Claims`] are inserted
/// into the request extensions.
#[derive(Clone)]
pub struct AuthInterceptor {
    tokens: Arc<TokenManager>,
    policy: Arc<AccessPolicy>,
}

impl AuthInterceptor {
    /// Creates an interceptor enforcing `policy` with tokens from `tokens`.
    pub fn new(tokens: Arc<TokenManager>, policy: AccessPolicy) -> Self {
        Self {
            tokens,
            policy: Arc::new(policy),
        }
    }

    /// Authorizes a call to `method` carrying `metadata`.
    ///
    /// Returns `Ok(None)` for public methods and the verified claims for
    /// protected ones.
    pub fn authorize(&self, method: &str, metadata: &MetadataMap) -> Result<Option<Claims>> {
        let Some(allowed) = self.policy.allowed_roles(method) else {
            return Ok(None);
        };

        let token = extract_token(metadata)?;
        let claims = self.tokens.verify(token)?;

        if !allowed.contains(&claims.role) {
            return Err(Error::PermissionDenied(format!(
                "role '{}' has no permission to call {method}",
                claims.role
            )));
        }

        Ok(Some(claims))
    }
}

impl Interceptor for AuthInterceptor {
    fn call(&mut self, mut request: Request<()>) -> std::result::Result<Request<()>, Status> {
        let Some(OperationPath(method)) = request.extensions().get::<OperationPath>().cloned()
        else {
            warn!("request reached the auth interceptor without a method path");
            return Err(Status::internal("cannot resolve the called method"));
        };

        match self.authorize(&method, request.metadata()) {
            Ok(Some(claims)) => {
                debug!(%method, user = %claims.sub, role = %claims.role, "call authorized");
                request.extensions_mut().insert(claims);
                Ok(request)
            }
            Ok(None) => Ok(request),
            Err(err) => {
                debug!(%method, error = %err, "call rejected");
                Err(err.into())
            }
        }
    }
}

fn extract_token(metadata: &MetadataMap) -> Result<&str> {
    let value = metadata
        .get(AUTHORIZATION_HEADER)
        .ok_or_else(|| Error::Unauthenticated("authorization token is not provided".to_string()))?;

    let value = value
        .to_str()
        .map_err(|_| Error::Unauthenticated("access token is invalid".to_string()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => Ok(token.trim()),
        _ => Ok(value),
    }
}
