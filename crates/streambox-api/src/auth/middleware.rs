use crate::auth::models::{JwtClaims, UploaderContext, UserRole};
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use streambox_core::AppError;
use uuid::Uuid;

/// Shared secret material for verifying bearer tokens.
#[derive(Clone)]
pub struct AuthState {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthState {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    fn verify(&self, token: &str) -> Result<JwtClaims, AppError> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "JWT verification failed");
                AppError::Unauthorized("Invalid or expired token".to_string())
            })
    }
}

/// Sign an HS256 token for `user_id` with the given role.
pub fn issue_token(
    jwt_secret: &str,
    user_id: Uuid,
    role: UserRole,
    ttl: Duration,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id,
        role: role.to_string(),
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
}

/// Require a valid bearer token carrying the admin role.
///
/// Missing or invalid tokens are rejected with 401, valid non-admin tokens
/// with 403.
pub async fn auth_middleware(
    State(auth): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, HttpAppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized("Authorization header must use the Bearer scheme".to_string())
        })?;

    let claims = auth.verify(token)?;
    let role = UserRole::from_claim(&claims.role);
    if role != UserRole::Admin {
        tracing::debug!(user_id = %claims.sub, role = %claims.role, "Non-admin upload attempt rejected");
        return Err(AppError::Forbidden("Admin role required".to_string()).into());
    }

    request.extensions_mut().insert(UploaderContext {
        user_id: claims.sub,
        role,
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_issued_token_verifies() {
        let user = Uuid::new_v4();
        let token = issue_token(SECRET, user, UserRole::Admin, Duration::hours(1)).unwrap();
        let claims = AuthState::new(SECRET).verify(&token).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token =
            issue_token(SECRET, Uuid::new_v4(), UserRole::Admin, Duration::hours(1)).unwrap();
        let err = AuthState::new("another-secret-another-secret-xx")
            .verify(&token)
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let token =
            issue_token(SECRET, Uuid::new_v4(), UserRole::Admin, Duration::hours(-2)).unwrap();
        assert!(AuthState::new(SECRET).verify(&token).is_err());
    }
}
