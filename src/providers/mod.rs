use crate::domain::outcome::{NormalizedWebhook, WebhookRejection};
use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;

pub mod bold;
pub mod payvalida;
pub mod wompi;

pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Authenticity check against the raw request. Runs on the unparsed body so
    /// checksum providers are never compared against a re-serialized object.
    fn verify(&self, headers: &HeaderMap, raw_body: &[u8]) -> Result<(), WebhookRejection>;

    fn normalize(&self, raw_body: &[u8]) -> Result<NormalizedWebhook, WebhookRejection>;

    fn verify_and_normalize(
        &self,
        headers: &HeaderMap,
        raw_body: &[u8],
    ) -> Result<NormalizedWebhook, WebhookRejection> {
        self.verify(headers, raw_body)?;
        self.normalize(raw_body)
    }
}

#[derive(Clone)]
pub struct Providers {
    pub payvalida: Arc<payvalida::PayvalidaAdapter>,
    pub wompi: Arc<wompi::WompiAdapter>,
    pub bold: Arc<bold::BoldAdapter>,
}

/// Uppercase hex SHA-256 over the concatenated event fields plus the shared
/// secret. Both checksum providers use this exact scheme.
pub fn event_checksum(parts: &[&str], secret: &str) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize()).to_uppercase()
}

/// Recovers a cart id from a provider reference. References are either the cart
/// id itself (`cart_...`) or `{unix_ts}_{cart_id}`. Cart ids contain
/// underscores, so everything from the `cart_` marker onward is the id.
pub fn cart_id_from_reference(reference: &str) -> Option<String> {
    if reference.starts_with("cart_") {
        return Some(reference.to_string());
    }
    reference
        .find("_cart_")
        .map(|idx| reference[idx + 1..].to_string())
}

pub(crate) fn parse_body(raw_body: &[u8]) -> Result<serde_json::Value, WebhookRejection> {
    serde_json::from_slice(raw_body)
        .map_err(|_| WebhookRejection::Validation("request body is not valid JSON".to_string()))
}

pub(crate) fn require_str<'a>(
    value: &'a serde_json::Value,
    field: &str,
) -> Result<&'a str, WebhookRejection> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| WebhookRejection::Validation(format!("missing required field '{}'", field)))
}

pub(crate) fn require_i64(
    value: &serde_json::Value,
    field: &str,
) -> Result<i64, WebhookRejection> {
    value
        .get(field)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| WebhookRejection::Validation(format!("missing required field '{}'", field)))
}
