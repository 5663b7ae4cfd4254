use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::token::decode_access_token;
use crate::db::users;
use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;

/// The user behind a valid `Authorization: Bearer <token>` header.
///
/// Any failure (missing header, bad token, unknown subject) rejects with 401.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AppError::InvalidToken)?;

        let email = decode_access_token(token, &state.config.secret_key)?;

        let user = {
            let conn = state.db.conn.lock()?;
            users::find_by_email(&conn, &email)?
        };

        user.map(AuthUser).ok_or(AppError::InvalidToken)
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}
