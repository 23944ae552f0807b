//! Budget alert endpoint models.
//!
//! When an expense pushes a budget's total spend past 100%, the server
//! POSTs a signed JSON payload to every active alert endpoint the user
//! has registered.
//!
//! # Security
//!
//! - Secrets are only shown once during registration
//! - Payloads are signed using HMAC-SHA256 (`X-Alert-Signature` header)
//! - HTTPS is required for non-localhost endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Alert endpoint registered by a user.
///
/// # Secret Storage
///
/// The `secret` is stored in plaintext (required for HMAC generation)
/// but never returned in list operations.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlertEndpoint {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub secret: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Request to register a new alert endpoint.
///
/// # Example
///
/// ```json
/// {
///   "url": "https://example.com/budget-alerts"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct AlertEndpointRequest {
    pub url: String,
}

/// Response when registering or listing an alert endpoint.
///
/// The `secret` field is ONLY included when creating a new endpoint.
#[derive(Debug, Serialize)]
pub struct AlertEndpointResponse {
    pub id: Uuid,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<AlertEndpoint> for AlertEndpointResponse {
    fn from(endpoint: AlertEndpoint) -> Self {
        Self {
            id: endpoint.id,
            url: endpoint.url,
            secret: None, // Never include secret by default
            is_active: endpoint.is_active,
            created_at: endpoint.created_at,
        }
    }
}

impl AlertEndpointResponse {
    /// Create response with secret included (only for registration).
    pub fn with_secret(mut self, secret: String) -> Self {
        self.secret = Some(secret);
        self
    }
}

/// Payload POSTed to alert endpoints when a budget is exceeded.
///
/// # Example
///
/// ```json
/// {
///   "event_type": "budget.exceeded",
///   "event_id": "550e8400-e29b-41d4-a716-446655440000",
///   "created_at": "2026-08-14T10:30:00Z",
///   "data": {
///     "budget_id": "...",
///     "budget_name": "August",
///     "limit_cents": 200000,
///     "previous_total_cents": 198000,
///     "new_total_cents": 206450,
///     "expense_name": "Weekly groceries",
///     "expense_amount_cents": 8450,
///     "expense_category": "Groceries"
///   }
/// }
/// ```
///
/// # Signature Verification
///
/// The request carries an `X-Alert-Signature` header with format
/// `sha256=<hex_encoded_hmac>`. Clients should compute
/// HMAC-SHA256(secret, json_body) and compare in constant time.
#[derive(Debug, Serialize, Deserialize)]
pub struct AlertPayload {
    /// Type of event (always "budget.exceeded" in this phase)
    pub event_type: String,

    /// Unique identifier for this alert event
    pub event_id: Uuid,

    /// When the event was created
    pub created_at: DateTime<Utc>,

    /// Event data describing the crossing
    pub data: BudgetExceededData,
}

/// Data portion of the alert payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetExceededData {
    pub budget_id: Uuid,
    pub budget_name: String,
    pub limit_cents: i64,
    pub previous_total_cents: i64,
    pub new_total_cents: i64,
    pub expense_name: String,
    pub expense_amount_cents: i64,
    pub expense_category: String,
}
