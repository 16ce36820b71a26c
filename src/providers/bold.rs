use crate::config::DeployMode;
use crate::domain::outcome::{NormalizedWebhook, ProviderOutcome, WebhookRejection};
use crate::providers::{
    cart_id_from_reference, event_checksum, parse_body, require_i64, require_str, ProviderAdapter,
};
use axum::http::HeaderMap;

/// Accepted instead of a real checksum in development deployments only.
const TEST_CHECKSUM: &str = "TEST_CHECKSUM";

/// Same checksum scheme as Wompi, with Bold's own events secret. Notifications
/// arrive as `{type, timestamp, data: {...}, signature: {checksum}}`.
pub struct BoldAdapter {
    pub events_secret: String,
    pub deploy_mode: DeployMode,
}

fn data<'a>(payload: &'a serde_json::Value) -> Result<&'a serde_json::Value, WebhookRejection> {
    payload
        .get("data")
        .ok_or_else(|| WebhookRejection::Validation("missing data".to_string()))
}

impl ProviderAdapter for BoldAdapter {
    fn name(&self) -> &'static str {
        "bold"
    }

    fn verify(&self, _headers: &HeaderMap, raw_body: &[u8]) -> Result<(), WebhookRejection> {
        let payload = parse_body(raw_body)?;
        let body = data(&payload)?;
        let transaction_id = require_str(body, "transaction_id")?;
        let status = require_str(&payload, "type")?;
        let amount_in_cents = require_i64(body, "amount_in_cents")?.to_string();
        let timestamp = require_i64(&payload, "timestamp")?.to_string();
        let provided = payload
            .get("signature")
            .and_then(|s| s.get("checksum"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| WebhookRejection::Auth("missing signature checksum".to_string()))?;

        if provided == TEST_CHECKSUM {
            if self.deploy_mode == DeployMode::Development {
                return Ok(());
            }
            return Err(WebhookRejection::Auth(
                "test checksum is not accepted in production".to_string(),
            ));
        }

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
        let body = data(&payload)?;
        let reference = require_str(body, "reference")?;
        let cart_id = cart_id_from_reference(reference).ok_or_else(|| {
            WebhookRejection::Validation(format!("reference '{}' does not contain a cart id", reference))
        })?;
        let raw_status = require_str(&payload, "type")?.to_uppercase();
        let transaction_id = require_str(body, "transaction_id")?.to_string();
        let amount_minor = require_i64(body, "amount_in_cents")?;
        let currency = body
            .get("currency")
            .and_then(|v| v.as_str())
            .unwrap_or("COP")
            .to_string();

        let outcome = match raw_status.as_str() {
            "SALE_APPROVED" | "VOID_APPROVED" => ProviderOutcome::Approved,
            "SALE_REJECTED" | "VOID_REJECTED" => ProviderOutcome::Rejected {
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
            metadata: body.clone(),
        })
    }
}
