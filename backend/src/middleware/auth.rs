//! Authentication middleware
//!
//! Sessions are issued by the clinic's identity provider. This service only
//! verifies the bearer JWT it hands out and exposes the caller to handlers.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, ErrorDetail, ErrorResponse};
use crate::models::Role;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    /// Guard for administrator-only operations
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role.can_recalculate_ledger() {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions)
        }
    }

    /// Name recorded on approvals, falling back to the email address
    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
            .to_string()
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    // Extract Authorization header
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => return unauthorized_response("Missing or invalid Authorization header"),
    };

    let claims = match decode_jwt(token, &state.config.auth.jwt_secret, state.config.auth.issuer.as_deref()) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    let user_id = match Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid user ID in token"),
    };

    // Create AuthUser and insert into request extensions
    let auth_user = AuthUser {
        user_id,
        name: claims.name,
        email: claims.email,
        role: claims.role,
    };

    tracing::debug!(user_id = %auth_user.user_id, role = auth_user.role.as_str(), "Authenticated request");
    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// Decode and validate JWT token
pub fn decode_jwt(token: &str, secret: &str, issuer: Option<&str>) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    if let Some(issuer) = issuer {
        validation.set_issuer(&[issuer]);
    }

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        })
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message_en: message.to_string(),
            message_th: "ไม่ได้รับอนุญาต".to_string(),
            field: None,
        },
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: ErrorDetail {
                        code: "UNAUTHORIZED".to_string(),
                        message_en: "Authentication required".to_string(),
                        message_th: "ต้องเข้าสู่ระบบก่อน".to_string(),
                        field: None,
                    },
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token(role: Role, exp: i64, iss: Option<&str>) -> String {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            name: Some("Somchai".into()),
            email: "somchai@clinic.test".into(),
            role,
            exp,
            iss: iss.map(str::to_string),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    fn future() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn decodes_valid_token() {
        let claims = decode_jwt(&token(Role::StockOfficer, future(), None), SECRET, None).unwrap();
        assert_eq!(claims.role, Role::StockOfficer);
    }

    #[test]
    fn rejects_wrong_secret_and_expired() {
        assert!(matches!(
            decode_jwt(&token(Role::Admin, future(), None), "other", None),
            Err(AppError::InvalidToken)
        ));
        let expired = chrono::Utc::now().timestamp() - 3600;
        assert!(matches!(
            decode_jwt(&token(Role::Admin, expired, None), SECRET, None),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn checks_issuer_when_configured() {
        let t = token(Role::Admin, future(), Some("clinic-auth"));
        assert!(decode_jwt(&t, SECRET, Some("clinic-auth")).is_ok());
        assert!(decode_jwt(&t, SECRET, Some("someone-else")).is_err());
    }

    #[test]
    fn admin_guard() {
        let mut user = AuthUser {
            user_id: Uuid::new_v4(),
            name: None,
            email: "officer@clinic.test".into(),
            role: Role::StockOfficer,
        };
        assert!(matches!(user.require_admin(), Err(AppError::InsufficientPermissions)));
        assert_eq!(user.display_name(), "officer@clinic.test");

        user.role = Role::Admin;
        assert!(user.require_admin().is_ok());
    }
}
