//! Authentication HTTP handlers.
//!
//! This module implements the account endpoints:
//! - POST /api/v1/auth/register - Create a user account
//! - POST /api/v1/auth/login - Exchange credentials for a session token
//! - POST /api/v1/auth/logout - Revoke the current session

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::hash_token,
    models::user::{LoginRequest, LoginResponse, RegisterRequest, User, UserResponse},
    state::AppState,
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::HeaderMap};
use chrono::{Duration, Utc};

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 8;

/// Usernames allow word characters, spaces and @/./+/-.
fn valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c.is_whitespace() || ".@+-".contains(c))
}

/// Register a new user account.
///
/// # Request Body
///
/// ```json
/// {
///   "username": "jane.doe",
///   "email": "jane@example.com",
///   "password": "correct horse battery staple"
/// }
/// ```
///
/// # Response (200)
///
/// The created user, without any credential material.
///
/// # Errors
///
/// - 400 if the username or password fails validation
/// - 409 if the username or email is already registered
pub async fn register(
    State(pool): State<DbPool>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, AppError> {
    if !valid_username(&request.username) {
        return Err(AppError::InvalidRequest(
            "Username may only contain letters, digits, spaces and @/./+/-/_".to_string(),
        ));
    }
    if request.email.trim().is_empty() || !request.email.contains('@') {
        return Err(AppError::InvalidRequest(
            "A valid email address is required".to_string(),
        ));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    // Uniqueness checks before hashing (hashing is the expensive part)
    let username_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(&request.username)
            .fetch_one(&pool)
            .await?;
    if username_taken {
        return Err(AppError::UsernameTaken);
    }

    let email_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(&request.email)
            .fetch_one(&pool)
            .await?;
    if email_taken {
        return Err(AppError::EmailTaken);
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(request.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {e}")))?
        .to_string();

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(&request.username)
    .bind(&request.email)
    .bind(&password_hash)
    .fetch_one(&pool)
    .await?;

    tracing::info!("Registered user {}", user.username);
    Ok(Json(user.into()))
}

/// Log in with username and password.
///
/// # Response (200)
///
/// ```json
/// {
///   "token": "9f3b...64 hex chars...",
///   "expires_at": "2026-09-28T10:00:00Z",
///   "user": { "id": "...", "username": "jane.doe", "email": "jane@example.com" }
/// }
/// ```
///
/// The token is shown exactly once; only its SHA-256 hash is stored.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(&request.username)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let parsed = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::Internal(format!("Stored password hash is invalid: {e}")))?;
    Argon2::default()
        .verify_password(request.password.as_bytes(), &parsed)
        .map_err(|_| AppError::InvalidCredentials)?;

    // 32 random bytes = 64 hex chars, hashed at rest like any bearer token
    let token_bytes: [u8; 32] = rand::random();
    let token = hex::encode(token_bytes);
    let expires_at = Utc::now() + Duration::hours(state.config.session_ttl_hours);

    sqlx::query(
        r#"
        INSERT INTO sessions (user_id, token_hash, expires_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(user.id)
    .bind(hash_token(&token))
    .bind(expires_at)
    .execute(&state.pool)
    .await?;

    tracing::info!("User {} logged in", user.username);
    Ok(Json(LoginResponse {
        token,
        expires_at,
        user: user.into(),
    }))
}

/// Log out by revoking the presented session token.
///
/// Runs behind the auth middleware, so the token is known to be live;
/// it is re-read from the Authorization header to delete exactly this
/// session and leave the user's other devices logged in.
pub async fn logout(
    State(pool): State<DbPool>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::InvalidSessionToken)?;

    sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
        .bind(hash_token(token))
        .execute(&pool)
        .await?;

    Ok(Json(serde_json::json!({ "logged_out": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_charset() {
        assert!(valid_username("jane.doe"));
        assert!(valid_username("jane doe+test@home_1"));
        assert!(!valid_username(""));
        assert!(!valid_username("jane#doe"));
        assert!(!valid_username("jane/doe"));
    }
}
