//! Accounts, session tokens, access policy and the server-side interceptor.

/// Credential store and password hashing.
pub mod users;

/// Session token issuance and verification.
pub mod jwt;

/// Password login.
pub mod login;

/// Per-method role requirements.
pub mod policy;

/// Request authentication and authorization.
pub mod interceptor;

pub use interceptor::{AuthInterceptor, MethodPathLayer, OperationPath, AUTHORIZATION_HEADER};
pub use jwt::{Claims, TokenManager};
pub use login::Authenticator;
pub use policy::AccessPolicy;
pub use users::{Account, Role, UserStore};
