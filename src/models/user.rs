//! User account and session models.
//!
//! Users authenticate with a username/password pair and receive a bearer
//! session token. Only the SHA-256 hash of the token is stored; the
//! plaintext is shown exactly once in the login response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `users` table. Passwords are stored as argon2id PHC
/// strings and never leave the server.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique identifier for this user
    pub id: Uuid,

    /// Unique username (letters, digits, spaces and @/./+/-/_)
    pub username: String,

    /// Unique email address
    pub email: String,

    /// argon2id PHC hash of the password
    pub password_hash: String,

    /// Timestamp when the account was created
    pub created_at: DateTime<Utc>,
}

/// Represents a login session record from the database.
///
/// # Database Table
///
/// Maps to the `sessions` table. The bearer token presented by clients
/// is hashed with SHA-256 before lookup, so a database leak does not
/// expose usable tokens.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    /// Unique identifier for this session
    pub id: Uuid,

    /// Owner of the session
    pub user_id: Uuid,

    /// SHA-256 hash of the bearer token (64 hex characters)
    pub token_hash: String,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// When the session stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Request body for registering a new user.
///
/// # JSON Example
///
/// ```json
/// {
///   "username": "jane.doe",
///   "email": "jane@example.com",
///   "password": "correct horse battery staple"
/// }
/// ```
///
/// # Validation
///
/// - `username`: required, must match `^[\w\s.@+\-]+$`, unique
/// - `email`: required, unique
/// - `password`: at least 8 characters
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for logging in.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Public view of a user returned by the API.
///
/// Strips the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// Response returned on successful login.
///
/// # JSON Example
///
/// ```json
/// {
///   "token": "9f3b...64 hex chars...",
///   "expires_at": "2026-02-01T10:00:00Z",
///   "user": { "id": "...", "username": "jane.doe", "email": "jane@example.com" }
/// }
/// ```
///
/// The token is only returned here; store it client-side and send it as
/// `Authorization: Bearer <token>`.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}
