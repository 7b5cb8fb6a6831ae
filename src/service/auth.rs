use std::time::Instant;

use metrics::{counter, histogram};
use tonic::{Request, Response, Status};
use tracing::{info, instrument, warn};

use crate::auth::Authenticator;
use crate::proto::auth_service_server::AuthService;
use crate::proto::{LoginRequest, LoginResponse};

/// gRPC `AuthService`: exchanges credentials for an access token.
pub struct AuthServiceImpl {
    authenticator: Authenticator,
}

impl AuthServiceImpl {
    /// Creates the service over `authenticator`.
    pub fn new(authenticator: Authenticator) -> Self {
        Self { authenticator }
    }
}

#[tonic::async_trait]
impl AuthService for AuthServiceImpl {
    #[instrument(skip_all, fields(username))]
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        let start = Instant::now();
        counter!("auth.login.requests").increment(1);

        let req = request.into_inner();
        tracing::Span::current().record("username", req.username.as_str());

        let result = self.authenticator.login(&req.username, &req.password).await;

        histogram!("auth.login.duration").record(start.elapsed().as_secs_f64());

        match result {
            Ok(access_token) => {
                counter!("auth.login.success").increment(1);
                info!("user logged in");
                Ok(Response::new(LoginResponse { access_token }))
            }
            Err(e) => {
                counter!("auth.login.failure").increment(1);
                warn!(error = %e, "login rejected");
                Err(e.into())
            }
        }
    }
}
