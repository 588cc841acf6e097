// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, AppJson},
    models::user::{
        LoginRequest, NewUser, ProfileChanges, RegisterRequest, Role, UpdateProfileRequest,
        normalize_email,
    },
    store::UserStore,
    utils::{
        api_key::generate_api_key,
        auth::AuthUser,
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(users): State<Arc<dyn UserStore>>,
    AppJson(mut payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.username = payload.username.trim().to_string();
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = users
        .create(NewUser {
            username: payload.username.clone(),
            email: normalize_email(&payload.email),
            password_hash: hashed_password,
            role: Role::User,
        })
        .await
        .map_err(|e| {
            tracing::warn!("Failed to register user '{}': {}", payload.username, e);
            AppError::from(e)
        })?;

    tracing::info!(user_id = user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": user,
        })),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// Unknown email, inactive account and wrong password all produce the same
/// 401 so callers cannot probe which accounts exist.
pub async fn login(
    State(users): State<Arc<dyn UserStore>>,
    State(config): State<Config>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let invalid = || AppError::AuthError("Invalid credentials".to_string());

    let mut user = users
        .find_by_email(&normalize_email(&payload.email))
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(invalid());
    }

    users.record_login(user.id).await?;
    user.last_login = Some(Utc::now());

    let token = sign_jwt(user.id, &config.jwt_secret, config.jwt_expiration)?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "type": "Bearer",
        "user": user,
    })))
}

/// Returns the current user's profile.
pub async fn get_profile(Extension(auth): Extension<AuthUser>) -> impl IntoResponse {
    Json(json!({ "user": auth.user }))
}

/// Edits username, email and/or password of the current user.
/// Setting a new password requires the current one.
pub async fn update_profile(
    State(users): State<Arc<dyn UserStore>>,
    Extension(auth): Extension<AuthUser>,
    AppJson(mut payload): AppJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.username = payload.username.map(|u| u.trim().to_string());
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let password_hash = match &payload.new_password {
        Some(new_password) => {
            let current = payload.current_password.as_deref().ok_or_else(|| {
                AppError::BadRequest(
                    "Current password is required to set a new password".to_string(),
                )
            })?;
            if !verify_password(current, &auth.user.password)? {
                return Err(AppError::AuthError(
                    "Current password is incorrect".to_string(),
                ));
            }
            Some(hash_password(new_password)?)
        }
        None => None,
    };

    let changes = ProfileChanges {
        username: payload.username,
        email: payload.email.as_deref().map(normalize_email),
        password_hash,
    };

    let user = users
        .update_profile(auth.id(), changes)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": user,
    })))
}

/// Issues a fresh API key for the current user, replacing any previous one.
/// The key is only ever returned here.
pub async fn generate_key(
    State(users): State<Arc<dyn UserStore>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let api_key = generate_api_key();
    users.set_api_key(auth.id(), Some(api_key.clone())).await?;

    tracing::info!(user_id = auth.id(), "API key generated");

    Ok(Json(json!({
        "message": "API key generated successfully",
        "apiKey": api_key,
        "note": "Store this API key securely. It will not be shown again.",
    })))
}

/// Clears and deactivates the current user's API key.
pub async fn revoke_key(
    State(users): State<Arc<dyn UserStore>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    users.set_api_key(auth.id(), None).await?;

    tracing::info!(user_id = auth.id(), "API key revoked");

    Ok(Json(json!({ "message": "API key revoked successfully" })))
}
