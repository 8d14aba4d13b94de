//! Payment processor integration via REST API (no SDK dependency)
//!
//! Covers the three surfaces the pipeline consumes: hosted checkout sessions
//! (destination charge + application fee), webhook signature verification,
//! and destination-account transfers.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::state::PspKeys;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A created hosted checkout session
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Session state as reported by the processor (reconciliation reads)
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub id: String,
    pub status: String,
    pub payment_status: String,
    pub payment_ref: Option<String>,
}

pub struct CheckoutSessionParams<'a> {
    /// Gross amount in minor units
    pub amount_minor: i64,
    pub currency: &'a str,
    /// Platform commission, deducted before funds reach the destination
    pub application_fee_minor: i64,
    pub destination_account: &'a str,
    pub buyer_email: &'a str,
    /// Tagged into metadata so webhooks map back to the order group
    pub order_group_id: i64,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
}

/// Create a hosted checkout session with a destination charge
pub async fn create_checkout_session(
    keys: &PspKeys,
    params: &CheckoutSessionParams<'_>,
) -> Result<CheckoutSession, BoxError> {
    let amount = params.amount_minor.to_string();
    let fee = params.application_fee_minor.to_string();
    let quantity = "1".to_string();
    let group_id = params.order_group_id.to_string();
    let product_name = format!("Order {}", params.order_group_id);

    let client = reqwest::Client::new();
    let resp: serde_json::Value = client
        .post(format!("{}/v1/checkout/sessions", keys.api_base))
        .basic_auth(&keys.secret_key, None::<&str>)
        .form(&[
            ("mode", "payment"),
            ("customer_email", params.buyer_email),
            ("line_items[0][price_data][currency]", params.currency),
            (
                "line_items[0][price_data][product_data][name]",
                product_name.as_str(),
            ),
            ("line_items[0][price_data][unit_amount]", amount.as_str()),
            ("line_items[0][quantity]", quantity.as_str()),
            ("payment_intent_data[application_fee_amount]", fee.as_str()),
            (
                "payment_intent_data[transfer_data][destination]",
                params.destination_account,
            ),
            (
                "payment_intent_data[metadata][order_group_id]",
                group_id.as_str(),
            ),
            ("metadata[order_group_id]", group_id.as_str()),
            ("success_url", params.success_url),
            ("cancel_url", params.cancel_url),
        ])
        .send()
        .await?
        .json()
        .await?;

    match (resp["id"].as_str(), resp["url"].as_str()) {
        (Some(id), Some(url)) => Ok(CheckoutSession {
            id: id.to_string(),
            url: url.to_string(),
        }),
        _ => Err(format!("checkout session creation failed: {resp}").into()),
    }
}

/// Read back a session's status (webhook-loss reconciliation)
pub async fn fetch_checkout_session(
    keys: &PspKeys,
    session_id: &str,
) -> Result<SessionStatus, BoxError> {
    let client = reqwest::Client::new();
    let resp: serde_json::Value = client
        .get(format!("{}/v1/checkout/sessions/{session_id}", keys.api_base))
        .basic_auth(&keys.secret_key, None::<&str>)
        .send()
        .await?
        .json()
        .await?;

    let id = resp["id"]
        .as_str()
        .ok_or_else(|| format!("session fetch failed: {resp}"))?;
    Ok(SessionStatus {
        id: id.to_string(),
        status: resp["status"].as_str().unwrap_or("").to_string(),
        payment_status: resp["payment_status"].as_str().unwrap_or("").to_string(),
        payment_ref: resp["payment_intent"].as_str().map(String::from),
    })
}

/// Transfer funds to a retailer's destination account
pub async fn create_transfer(
    keys: &PspKeys,
    destination_account: &str,
    amount_minor: i64,
    currency: &str,
    payout_id: i64,
) -> Result<String, BoxError> {
    let amount = amount_minor.to_string();
    let payout = payout_id.to_string();

    let client = reqwest::Client::new();
    let resp: serde_json::Value = client
        .post(format!("{}/v1/transfers", keys.api_base))
        .basic_auth(&keys.secret_key, None::<&str>)
        .form(&[
            ("amount", amount.as_str()),
            ("currency", currency),
            ("destination", destination_account),
            ("metadata[payout_id]", payout.as_str()),
        ])
        .send()
        .await?
        .json()
        .await?;

    resp["id"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| format!("transfer failed: {resp}").into())
}

/// Verify webhook signature (HMAC-SHA256)
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signature = "";
    for part in sig_header.split(',') {
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signature = v;
        }
    }

    if timestamp.is_empty() || signature.is_empty() {
        return Err("Invalid signature header");
    }

    let signed_payload = format!("{timestamp}.{}", std::str::from_utf8(payload).unwrap_or(""));
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(signed_payload.as_bytes());

    // Decode hex signature and use constant-time comparison via hmac::verify_slice
    let sig_bytes = hex::decode(signature).map_err(|_| "Invalid signature hex")?;
    mac.verify_slice(&sig_bytes)
        .map_err(|_| "Webhook signature mismatch")?;

    // Reject events older than 5 minutes to prevent replay attacks
    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    let now = chrono::Utc::now().timestamp();
    if (now - ts).abs() > 300 {
        return Err("Webhook timestamp too old");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &[u8], timestamp: i64, secret: &str) -> String {
        let signed_payload = format!("{timestamp}.{}", std::str::from_utf8(payload).unwrap());
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_accepted() {
        let payload = br#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;
        let ts = chrono::Utc::now().timestamp();
        let sig = sign(payload, ts, "whsec_test");
        let header = format!("t={ts},v1={sig}");
        assert!(verify_webhook_signature(payload, &header, "whsec_test").is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let payload = br#"{"id":"evt_1"}"#;
        let ts = chrono::Utc::now().timestamp();
        let sig = sign(payload, ts, "whsec_test");
        let header = format!("t={ts},v1={sig}");
        assert!(verify_webhook_signature(br#"{"id":"evt_2"}"#, &header, "whsec_test").is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = br#"{"id":"evt_1"}"#;
        let ts = chrono::Utc::now().timestamp();
        let sig = sign(payload, ts, "whsec_other");
        let header = format!("t={ts},v1={sig}");
        assert!(verify_webhook_signature(payload, &header, "whsec_test").is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = br#"{"id":"evt_1"}"#;
        let ts = chrono::Utc::now().timestamp() - 600;
        let sig = sign(payload, ts, "whsec_test");
        let header = format!("t={ts},v1={sig}");
        assert_eq!(
            verify_webhook_signature(payload, &header, "whsec_test"),
            Err("Webhook timestamp too old")
        );
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(verify_webhook_signature(b"{}", "v1=abcd", "whsec_test").is_err());
        assert!(verify_webhook_signature(b"{}", "t=123", "whsec_test").is_err());
        assert!(verify_webhook_signature(b"{}", "", "whsec_test").is_err());
    }
}
