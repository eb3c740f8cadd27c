use std::collections::HashMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Event type that carries a completed hosted checkout.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Allowed clock skew for timestamps ahead of the local clock.
const FUTURE_SKEW_SECS: i64 = 60;

/// Why a `Stripe-Signature` header was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("missing Stripe-Signature header")]
    MissingHeader,
    #[error("malformed Stripe-Signature header")]
    Malformed,
    #[error("timestamp outside tolerance (age={age}s)")]
    Stale { age: i64 },
    #[error("no v1 signature matches")]
    Mismatch,
}

/// Verifies webhook deliveries against the endpoint signing secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Vec<u8>,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    pub fn new(secret: &str, tolerance_secs: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            tolerance_secs,
        }
    }

    /// Check `header` (`t=<unix>,v1=<hex>[,v1=<hex>...]`) against the raw
    /// request body. Any `v1` entry may match, which covers secret rotation.
    pub fn verify(
        &self,
        header: Option<&str>,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let header = header.ok_or(SignatureError::MissingHeader)?;

        let mut timestamp = None;
        let mut candidates = Vec::new();
        for part in header.split(',') {
            let Some((name, value)) = part.trim().split_once('=') else {
                continue;
            };
            match name {
                "t" => timestamp = Some(value),
                "v1" => candidates.push(value),
                _ => {}
            }
        }

        let timestamp_str = timestamp.ok_or(SignatureError::Malformed)?;
        let timestamp: i64 = timestamp_str
            .parse()
            .map_err(|_| SignatureError::Malformed)?;
        if candidates.is_empty() {
            return Err(SignatureError::Malformed);
        }

        let age = now
            .timestamp()
            .checked_sub(timestamp)
            .ok_or(SignatureError::Malformed)?;
        if age > self.tolerance_secs || age < -FUTURE_SKEW_SECS {
            return Err(SignatureError::Stale { age });
        }

        let expected = self.expected_signature(timestamp_str, payload)?;
        let matched = candidates.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|provided| {
                    provided.len() == expected.len()
                        && bool::from(provided.as_slice().ct_eq(expected.as_slice()))
                })
                .unwrap_or(false)
        });

        if matched {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    fn expected_signature(&self, timestamp: &str, payload: &[u8]) -> Result<Vec<u8>, SignatureError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| SignatureError::Mismatch)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Generic Stripe webhook event; `data.object` is parsed per event type.
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: StripeEventData,
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

// ============ checkout.session.completed ============

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    #[serde(default)]
    pub id: Option<String>,
    /// "paid", "unpaid" or "no_payment_required".
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub payment_intent: Option<PaymentIntentRef>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// `payment_intent` is an id unless the session was fetched with expansion.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PaymentIntentRef {
    Id(String),
    Expanded { id: String },
}

impl PaymentIntentRef {
    fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Expanded { id } => id,
        }
    }
}

/// Fields of a paid checkout needed to record an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaidCheckout {
    pub user_id: String,
    pub product_id: i32,
    pub amount_total: i64,
    pub payment_intent_id: String,
}

/// What a completed checkout session asks of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Paid(PaidCheckout),
    /// Payment still pending (delayed methods); carries the reported status.
    NotPaid(String),
}

impl StripeCheckoutSession {
    pub fn from_object(object: serde_json::Value) -> Result<Self, String> {
        serde_json::from_value(object).map_err(|e| format!("Malformed checkout session: {e}"))
    }

    /// Validate the session and extract what fulfillment needs.
    pub fn into_outcome(self) -> Result<CheckoutOutcome, String> {
        if let Some(status) = self.payment_status.as_deref()
            && status != "paid"
            && status != "no_payment_required"
        {
            return Ok(CheckoutOutcome::NotPaid(status.to_string()));
        }

        let user_id = non_empty(self.metadata.get("userId").map(String::as_str))
            .ok_or_else(|| "metadata.userId is required".to_string())?;

        let product_id = non_empty(self.metadata.get("productId").map(String::as_str))
            .ok_or_else(|| "metadata.productId is required".to_string())?
            .parse::<i32>()
            .map_err(|_| "metadata.productId must be an integer".to_string())?;

        let amount_total = self
            .amount_total
            .ok_or_else(|| "amount_total is required".to_string())?;
        if amount_total < 0 {
            return Err("amount_total must not be negative".into());
        }

        let payment_intent_id = non_empty(self.payment_intent.as_ref().map(PaymentIntentRef::id))
            .ok_or_else(|| "payment_intent is required".to_string())?;

        Ok(CheckoutOutcome::Paid(PaidCheckout {
            user_id: user_id.to_string(),
            product_id,
            amount_total,
            payment_intent_id: payment_intent_id.to_string(),
        }))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Compute a `Stripe-Signature` header value. Used by tests and local tooling.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let verifier = WebhookVerifier::new(secret, 0);
    let sig = verifier
        .expected_signature(&timestamp.to_string(), payload)
        .map(hex::encode)
        .unwrap_or_default();
    format!("t={timestamp},v1={sig}")
}
