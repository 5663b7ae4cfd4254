use chrono::{TimeDelta, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Email of the authenticated user
    pub sub: String,
    pub exp: i64,
}

pub fn create_access_token(email: &str, secret: &str, ttl_minutes: i64) -> Result<String> {
    let expires_at = TimeDelta::try_minutes(ttl_minutes)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| {
            AppError::Internal(format!("Token lifetime of {} minutes is out of range", ttl_minutes))
        })?;
    let claims = Claims {
        sub: email.to_string(),
        exp: expires_at.timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to encode token: {}", e)))
}

/// Returns the subject email; bad signature, expiry or malformed input is `InvalidToken`
pub fn decode_access_token(token: &str, secret: &str) -> Result<String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims.sub)
        .map_err(|e| {
            log::debug!("Rejected bearer token: {}", e);
            AppError::InvalidToken
        })
}
