// src/utils/jwt.rs

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// Issued-at as Unix timestamp.
    pub iat: i64,
    /// Expiration time as Unix timestamp.
    pub exp: i64,
}

impl Claims {
    /// The user id carried in `sub`.
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse()
            .map_err(|_| AppError::AuthError("Invalid or expired token".to_string()))
    }
}

/// Signs a new JWT for the user, valid for `expiration_seconds` from now.
pub fn sign_jwt(user_id: i64, secret: &str, expiration_seconds: u64) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let lifetime = i64::try_from(expiration_seconds)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let claims = Claims {
        sub: user_id.to_string(), // Store User ID in 'sub' claim
        iat: now,
        exp: now + lifetime,
    };

    encode_claims(&claims, secret)
}

/// Encodes arbitrary claims with HS256.
pub fn encode_claims(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies signature and expiry, and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise an `AppError::AuthError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        AppError::AuthError("Invalid or expired token".to_string())
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn signed_token_verifies() {
        let token = sign_jwt(42, SECRET, 24 * 60 * 60).unwrap();
        let claims = verify_jwt(&token, SECRET).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.exp - claims.iat, 86_400);
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "1".into(),
            iat: now - 2 * 86_400,
            exp: now - 86_400,
        };
        let token = encode_claims(&claims, SECRET).unwrap();
        assert!(matches!(verify_jwt(&token, SECRET), Err(AppError::AuthError(_))));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign_jwt(1, SECRET, 60).unwrap();
        assert!(verify_jwt(&token, "other-secret").is_err());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = sign_jwt(1, SECRET, 60).unwrap();
        let other = sign_jwt(2, SECRET, 60).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        // Swap in another token's payload while keeping the original signature.
        parts[1] = other.split('.').nth(1).unwrap();
        assert!(verify_jwt(&parts.join("."), SECRET).is_err());
    }

    #[test]
    fn non_numeric_subject_is_an_auth_error() {
        let claims = Claims {
            sub: "abc".into(),
            iat: 0,
            exp: 0,
        };
        assert!(matches!(claims.user_id(), Err(AppError::AuthError(_))));
    }
}
