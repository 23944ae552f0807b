//! Budget alert delivery.
//!
//! This module handles alert endpoint registration, signed delivery of
//! budget-exceeded events, and HMAC signature generation so receivers
//! can verify authenticity.

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::alert::{
    AlertEndpoint, AlertEndpointRequest, AlertEndpointResponse, AlertPayload, BudgetExceededData,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Create a new alert endpoint.
///
/// # Process
///
/// 1. Validate URL format
/// 2. Generate cryptographically secure secret (32 bytes)
/// 3. Store endpoint in database
/// 4. Return endpoint with secret (only shown once)
pub async fn create_alert_endpoint(
    pool: &DbPool,
    user_id: Uuid,
    request: AlertEndpointRequest,
) -> Result<AlertEndpointResponse, AppError> {
    validate_alert_url(&request.url)?;

    // 32 bytes = 64 hex chars
    let secret = generate_secret();

    let endpoint = sqlx::query_as::<_, AlertEndpoint>(
        r#"
        INSERT INTO alert_endpoints (user_id, url, secret)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&request.url)
    .bind(&secret)
    .fetch_one(pool)
    .await?;

    Ok(AlertEndpointResponse::from(endpoint).with_secret(secret))
}

/// List all active alert endpoints for a user (secrets excluded).
pub async fn list_alert_endpoints(
    pool: &DbPool,
    user_id: Uuid,
) -> Result<Vec<AlertEndpointResponse>, AppError> {
    let endpoints = sqlx::query_as::<_, AlertEndpoint>(
        "SELECT * FROM alert_endpoints WHERE user_id = $1 AND is_active = true ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(endpoints.into_iter().map(|e| e.into()).collect())
}

/// Delete an alert endpoint (soft delete; preserves event history).
pub async fn delete_alert_endpoint(
    pool: &DbPool,
    user_id: Uuid,
    endpoint_id: Uuid,
) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE alert_endpoints SET is_active = false WHERE id = $1 AND user_id = $2",
    )
    .bind(endpoint_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::AlertNotFound);
    }

    Ok(())
}

/// Send a budget-exceeded event to all of the user's active endpoints.
///
/// Individual delivery failures are logged but don't fail the overall
/// operation; the expense write is independent of alert delivery.
pub async fn notify_budget_exceeded(
    pool: &DbPool,
    user_id: Uuid,
    data: &BudgetExceededData,
) -> Result<(), AppError> {
    let endpoints = sqlx::query_as::<_, AlertEndpoint>(
        "SELECT * FROM alert_endpoints WHERE user_id = $1 AND is_active = true",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    for endpoint in endpoints {
        if let Err(e) = send_alert(pool, &endpoint, data).await {
            tracing::error!("Failed to send alert to {}: {:?}", endpoint.url, e);
            // Continue to next endpoint even if one fails
        }
    }

    Ok(())
}

/// Send a single alert with HMAC signature.
///
/// # Headers Sent
///
/// - `Content-Type: application/json`
/// - `X-Alert-Signature: sha256=<hex>`
/// - `X-Alert-Event-Id: <uuid>`
///
/// # Timeout
///
/// 5 seconds per endpoint (prevents hanging on slow receivers)
async fn send_alert(
    pool: &DbPool,
    endpoint: &AlertEndpoint,
    data: &BudgetExceededData,
) -> Result<(), AppError> {
    let event_id = Uuid::new_v4();

    let payload = AlertPayload {
        event_type: "budget.exceeded".to_string(),
        event_id,
        created_at: Utc::now(),
        data: data.clone(),
    };
    let payload_json = serde_json::to_string(&payload)
        .map_err(|e| AppError::InvalidRequest(format!("Failed to serialize payload: {}", e)))?;

    let signature = generate_signature(&endpoint.secret, &payload_json);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .map_err(|e| AppError::InvalidRequest(format!("HTTP client error: {}", e)))?;

    let response = client
        .post(&endpoint.url)
        .header("Content-Type", "application/json")
        .header("X-Alert-Signature", &signature)
        .header("X-Alert-Event-Id", event_id.to_string())
        .body(payload_json.clone())
        .send()
        .await;

    let (status, body) = match response {
        Ok(resp) => {
            let status = resp.status().as_u16() as i32;
            let body = resp.text().await.ok();
            (Some(status), body)
        }
        Err(e) => {
            let error_msg = format!("Request failed: {}", e);
            tracing::error!("{}", error_msg);
            (None, Some(error_msg))
        }
    };

    let payload_value = serde_json::from_str::<serde_json::Value>(&payload_json)
        .map_err(|e| AppError::InvalidRequest(format!("Failed to parse payload: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO alert_events (
            id,
            alert_endpoint_id,
            budget_id,
            payload,
            response_status,
            response_body
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(event_id)
    .bind(endpoint.id)
    .bind(data.budget_id)
    .bind(payload_value)
    .bind(status)
    .bind(body)
    .execute(pool)
    .await?;

    Ok(())
}

/// Generate HMAC-SHA256 signature for an alert payload.
///
/// # Format
///
/// `sha256=<hex_encoded_hmac>`
///
/// Receivers should compute HMAC-SHA256(secret, request_body) and
/// compare using constant-time comparison.
fn generate_signature(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload.as_bytes());
    let result = mac.finalize();
    format!("sha256={}", hex::encode(result.into_bytes()))
}

/// Generate cryptographically secure random secret (64 hex chars).
fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Validate alert URL format.
///
/// # Rules
///
/// - Must be a valid URL of at most 2048 characters
/// - Must be HTTPS (HTTP localhost allowed for development)
fn validate_alert_url(url: &str) -> Result<(), AppError> {
    if url.len() > 2048 {
        return Err(AppError::InvalidAlertUrl(
            "URL exceeds 2048 characters".to_string(),
        ));
    }

    let parsed = url::Url::parse(url)
        .map_err(|_| AppError::InvalidAlertUrl("Invalid URL format".to_string()))?;

    match parsed.scheme() {
        "https" => Ok(()),
        "http" => {
            // Allow HTTP for localhost/127.0.0.1 (testing)
            if parsed.host_str() == Some("localhost")
                || parsed.host_str() == Some("127.0.0.1")
                || parsed.host_str() == Some("0.0.0.0")
            {
                Ok(())
            } else {
                Err(AppError::InvalidAlertUrl(
                    "HTTP is only allowed for localhost. Use HTTPS for production.".to_string(),
                ))
            }
        }
        _ => Err(AppError::InvalidAlertUrl(
            "URL must use HTTP or HTTPS".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_urls_accepted() {
        assert!(validate_alert_url("https://example.com/hook").is_ok());
    }

    #[test]
    fn http_only_for_localhost() {
        assert!(validate_alert_url("http://localhost:8080/hook").is_ok());
        assert!(validate_alert_url("http://127.0.0.1/hook").is_ok());
        assert!(validate_alert_url("http://example.com/hook").is_err());
    }

    #[test]
    fn bad_schemes_and_garbage_rejected() {
        assert!(validate_alert_url("ftp://example.com").is_err());
        assert!(validate_alert_url("not a url").is_err());
    }

    #[test]
    fn signatures_are_stable_hex() {
        let sig = generate_signature("secret", "{}");
        assert!(sig.starts_with("sha256="));
        assert_eq!(sig.len(), "sha256=".len() + 64);
        assert_eq!(sig, generate_signature("secret", "{}"));
    }
}
