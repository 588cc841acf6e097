// src/utils/auth.rs

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    models::user::{Role, User},
    state::AppState,
    utils::{
        api_key::{API_KEY_HEADER, is_well_formed},
        jwt::verify_jwt,
    },
};

/// How the current request proved its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Bearer,
    ApiKey,
}

/// The authenticated identity, injected into request extensions by the
/// auth middlewares.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub method: AuthMethod,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }
}

/// Token from an `Authorization: Bearer <token>` header, if one is present.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// Resolves a bearer token to an active user.
pub async fn authenticate_bearer(state: &AppState, token: &str) -> Result<AuthUser, AppError> {
    let claims = verify_jwt(token, &state.config.jwt_secret)?;
    let user_id = claims.user_id()?;

    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| AppError::AuthError("User not found or inactive".to_string()))?;

    Ok(AuthUser {
        user,
        method: AuthMethod::Bearer,
    })
}

/// Resolves an API key to a user whose key and account are both active.
pub async fn authenticate_api_key(state: &AppState, key: &str) -> Result<AuthUser, AppError> {
    if !is_well_formed(key) {
        return Err(AppError::AuthError("Invalid API key format".to_string()));
    }

    let user = state
        .users
        .find_by_api_key(key)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid API key".to_string()))?;

    tracing::debug!(user_id = user.id, "Authenticated with API key");

    Ok(AuthUser {
        user,
        method: AuthMethod::ApiKey,
    })
}

/// Bearer first; the API key is consulted only when no bearer token is sent.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    if let Some(token) = bearer_token(headers) {
        authenticate_bearer(state, token).await
    } else if let Some(key) = api_key(headers) {
        authenticate_api_key(state, key).await
    } else {
        Err(AppError::AuthError(
            "Authentication required - provide either Bearer token or API key".to_string(),
        ))
    }
}

/// Axum Middleware: Bearer authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and injects the
/// `AuthUser` into the request extensions. Returns 401 otherwise.
pub async fn bearer_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::AuthError("Access token required".to_string()))?;

    let auth = authenticate_bearer(&state, token).await?;
    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}

/// Axum Middleware: accepts either a bearer token or an API key.
pub async fn dual_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth = authenticate(&state, req.headers()).await?;
    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}

/// Rejects identities whose role is not in `allowed`.
pub fn require_role(auth: &AuthUser, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&auth.role()) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Insufficient permissions".to_string()))
    }
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER an authentication middleware. Returns 403 Forbidden
/// unless the injected `AuthUser` has the 'admin' role.
pub async fn require_admin(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let auth = req
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| AppError::AuthError("Authentication required".to_string()))?;

    require_role(auth, &[Role::Admin])?;

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue};
    use chrono::Utc;

    fn user(role: Role) -> AuthUser {
        let now = Utc::now();
        AuthUser {
            user: User {
                id: 7,
                username: "someone".into(),
                email: "someone@example.com".into(),
                password: String::new(),
                role,
                is_active: true,
                api_key: None,
                api_key_active: false,
                last_login: None,
                created_at: now,
                updated_at: now,
            },
            method: AuthMethod::Bearer,
        }
    }

    #[test]
    fn role_gate() {
        assert!(require_role(&user(Role::Admin), &[Role::Admin]).is_ok());
        assert!(matches!(
            require_role(&user(Role::User), &[Role::Admin]),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn bearer_header_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn api_key_header_name_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_bytes(b"X-API-Key").unwrap(),
            HeaderValue::from_static("pk_26466_x"),
        );
        assert_eq!(api_key(&headers), Some("pk_26466_x"));
    }
}
