use axum::http::StatusCode;
use serde::Serialize;

/// Provider-native status collapsed for branching. The verbatim status string
/// stays on `NormalizedWebhook::raw_status` for audit trails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    Approved,
    Pending,
    Rejected { reason: String },
    Unknown { raw: String },
}

#[derive(Debug, Clone)]
pub struct NormalizedWebhook {
    pub provider: &'static str,
    pub cart_id: String,
    pub outcome: ProviderOutcome,
    pub raw_status: String,
    pub transaction_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub metadata: serde_json::Value,
}

impl NormalizedWebhook {
    pub fn status_message(&self) -> String {
        format!("payment {}", self.raw_status.to_lowercase().replace('_', " "))
    }
}

/// Terminal webhook rejection: the request is answered and nothing downstream
/// runs. Auth maps to 401, Validation to 400.
#[derive(Debug)]
pub enum WebhookRejection {
    Auth(String),
    Validation(String),
}

impl WebhookRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookRejection::Auth(_) => StatusCode::UNAUTHORIZED,
            WebhookRejection::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let (code, message) = match self {
            WebhookRejection::Auth(msg) => ("UNAUTHORIZED", msg),
            WebhookRejection::Validation(msg) => ("INVALID_PAYLOAD", msg),
        };
        ErrorEnvelope {
            error: ErrorPayload {
                code: code.to_string(),
                message: message.clone(),
                details: None,
            },
        }
    }
}

impl std::fmt::Display for WebhookRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebhookRejection::Auth(msg) => write!(f, "authentication failed: {}", msg),
            WebhookRejection::Validation(msg) => write!(f, "invalid payload: {}", msg),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}
