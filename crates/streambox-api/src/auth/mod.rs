pub mod middleware;
pub mod models;

pub use middleware::{auth_middleware, issue_token, AuthState};
pub use models::{JwtClaims, UploaderContext, UserRole};
