use crate::domain::outcome::{NormalizedWebhook, ProviderOutcome};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const BUFFER_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferedStatus {
    Approved,
    Rejected,
    Failed,
}

impl BufferedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BufferedStatus::Approved => "approved",
            BufferedStatus::Rejected => "rejected",
            BufferedStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "approved" => BufferedStatus::Approved,
            "rejected" => BufferedStatus::Rejected,
            _ => BufferedStatus::Failed,
        }
    }
}

/// A payment outcome that arrived before its order existed. At most one live
/// entry per cart; a later webhook for the same cart overwrites it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingPaymentResult {
    pub cart_id: String,
    pub status: BufferedStatus,
    pub transaction_id: String,
    pub provider: String,
    pub amount_minor: i64,
    pub currency: String,
    pub metadata: serde_json::Value,
    pub webhook_received_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingPaymentResult {
    pub fn from_webhook(webhook: &NormalizedWebhook, now: DateTime<Utc>) -> Self {
        let status = match &webhook.outcome {
            ProviderOutcome::Approved => BufferedStatus::Approved,
            ProviderOutcome::Rejected { .. } => BufferedStatus::Rejected,
            ProviderOutcome::Pending | ProviderOutcome::Unknown { .. } => BufferedStatus::Failed,
        };
        Self {
            cart_id: webhook.cart_id.clone(),
            status,
            transaction_id: webhook.transaction_id.clone(),
            provider: webhook.provider.to_string(),
            amount_minor: webhook.amount_minor,
            currency: webhook.currency.clone(),
            metadata: webhook.metadata.clone(),
            webhook_received_at: now,
            expires_at: now + Duration::minutes(BUFFER_TTL_MINUTES),
        }
    }

    pub fn is_live(&self, at: DateTime<Utc>) -> bool {
        self.expires_at > at
    }
}

/// Rejected/failed outcome recorded on the cart's metadata so a storefront can
/// surface it on the next cart read. Not buffered; there is nothing to capture
/// later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentErrorRecord {
    pub status: String,
    pub provider: String,
    pub message: String,
    pub transaction_id: String,
    pub timestamp: DateTime<Utc>,
}
