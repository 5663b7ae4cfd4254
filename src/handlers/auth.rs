use axum::{extract::State, Form, Json};

use crate::auth::{create_access_token, hash_password, verify_password};
use crate::db::users;
use crate::error::{AppError, Result};
use crate::models::{LoginForm, TokenResponse, UserCreate, UserResponse};
use crate::state::AppState;

/// `POST /register`
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<UserCreate>,
) -> Result<Json<UserResponse>> {
    let email = payload.email.trim().to_string();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation("Email and password are required".to_string()));
    }

    let hashed = hash_password(&payload.password)?;

    let conn = state.db.conn.lock()?;
    if users::find_by_email(&conn, &email)?.is_some() {
        return Err(AppError::EmailTaken);
    }

    let user = users::insert_user(&conn, &email, &hashed).map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AppError::EmailTaken
        }
        other => AppError::WriteFailed(other.to_string()),
    })?;

    log::info!("Registered user {}", user.id);
    Ok(Json(UserResponse::from(&user)))
}

/// `POST /token`, OAuth2 password flow: `username` carries the email
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>> {
    let user = {
        let conn = state.db.conn.lock()?;
        users::find_by_email(&conn, form.username.trim())?
    };

    let user = match user {
        Some(user) if verify_password(&form.password, &user.hashed_password) => user,
        _ => {
            log::debug!("Rejected login for {}", form.username);
            return Err(AppError::InvalidCredentials);
        }
    };

    let token = create_access_token(
        &user.email,
        &state.config.secret_key,
        state.config.token_ttl_minutes,
    )?;
    Ok(Json(TokenResponse::bearer(token)))
}
