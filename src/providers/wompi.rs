use crate::domain::outcome::{NormalizedWebhook, ProviderOutcome, WebhookRejection};
use crate::providers::{
    cart_id_from_reference, event_checksum, parse_body, require_i64, require_str, ProviderAdapter,
};
use axum::http::HeaderMap;

/// Wompi event payloads carry the transaction under `data.transaction` and a
/// `signature.checksum` computed as
/// SHA-256(transaction_id + status + amount_in_cents + timestamp + secret).
pub struct WompiAdapter {
    pub events_secret: String,
}

fn transaction<'a>(payload: &'a serde_json::Value) -> Result<&'a serde_json::Value, WebhookRejection> {
    payload
        .get("data")
        .and_then(|d| d.get("transaction"))
        .ok_or_else(|| WebhookRejection::Validation("missing data.transaction".to_string()))
}

impl ProviderAdapter for WompiAdapter {
    fn name(&self) -> &'static str {
        "wompi"
    }

    fn verify(&self, _headers: &HeaderMap, raw_body: &[u8]) -> Result<(), WebhookRejection> {
        let payload = parse_body(raw_body)?;
        let tx = transaction(&payload)?;
        let transaction_id = require_str(tx, "id")?;
        let status = require_str(tx, "status")?;
        let amount_in_cents = require_i64(tx, "amount_in_cents")?.to_string();
        let timestamp = require_i64(&payload, "timestamp")?.to_string();
        let provided = payload
            .get("signature")
            .and_then(|s| s.get("checksum"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| WebhookRejection::Auth("missing signature checksum".to_string()))?;

        let expected = event_checksum(
            &[transaction_id, status, &amount_in_cents, &timestamp],
            &self.events_secret,
        );
        if provided.to_uppercase() != expected {
            return Err(WebhookRejection::Auth("event checksum mismatch".to_string()));
        }
        Ok(())
    }

    fn normalize(&self, raw_body: &[u8]) -> Result<NormalizedWebhook, WebhookRejection> {
        let payload = parse_body(raw_body)?;
        let tx = transaction(&payload)?;
        let reference = require_str(tx, "reference")?;
        let cart_id = cart_id_from_reference(reference).ok_or_else(|| {
            WebhookRejection::Validation(format!("reference '{}' does not contain a cart id", reference))
        })?;
        let raw_status = require_str(tx, "status")?.to_uppercase();
        let transaction_id = require_str(tx, "id")?.to_string();
        let amount_minor = require_i64(tx, "amount_in_cents")?;
        let currency = tx
            .get("currency")
            .and_then(|v| v.as_str())
            .unwrap_or("COP")
            .to_string();

        let outcome = match raw_status.as_str() {
            "APPROVED" | "CAPTURED" => ProviderOutcome::Approved,
            "DECLINED" | "VOIDED" | "ERROR" | "INTERNAL_ERROR" => ProviderOutcome::Rejected {
                reason: raw_status.clone(),
            },
            other => ProviderOutcome::Unknown {
                raw: other.to_string(),
            },
        };

        Ok(NormalizedWebhook {
            provider: self.name(),
            cart_id,
            outcome,
            raw_status,
            transaction_id,
            amount_minor,
            currency,
            metadata: tx.clone(),
        })
    }
}
