use crate::config::DeployMode;
use crate::domain::outcome::{NormalizedWebhook, ProviderOutcome, WebhookRejection};
use crate::providers::{parse_body, require_i64, require_str, ProviderAdapter};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

const TEST_USERNAME: &str = "payvalida_test";
const TEST_PASSWORD: &str = "payvalida_test_secret";

pub struct PayvalidaAdapter {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Skips the Basic-auth check entirely. Must be enabled explicitly.
    pub test_mode: bool,
    pub deploy_mode: DeployMode,
}

impl PayvalidaAdapter {
    fn expected_credentials(&self) -> Result<(&str, &str), WebhookRejection> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Ok((user.as_str(), pass.as_str())),
            // Fixed test pair only exists outside production.
            _ if self.deploy_mode == DeployMode::Development => Ok((TEST_USERNAME, TEST_PASSWORD)),
            _ => Err(WebhookRejection::Auth(
                "webhook credentials are not configured".to_string(),
            )),
        }
    }
}

impl ProviderAdapter for PayvalidaAdapter {
    fn name(&self) -> &'static str {
        "payvalida"
    }

    fn verify(&self, headers: &HeaderMap, _raw_body: &[u8]) -> Result<(), WebhookRejection> {
        if self.test_mode {
            return Ok(());
        }

        let header = headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| WebhookRejection::Auth("missing authorization header".to_string()))?;
        let encoded = header
            .strip_prefix("Basic ")
            .ok_or_else(|| WebhookRejection::Auth("expected Basic authorization".to_string()))?;
        let decoded = BASE64_STANDARD
            .decode(encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| WebhookRejection::Auth("malformed Basic credentials".to_string()))?;
        let (user, pass) = decoded
            .split_once(':')
            .ok_or_else(|| WebhookRejection::Auth("malformed Basic credentials".to_string()))?;

        let (expected_user, expected_pass) = self.expected_credentials()?;
        if user != expected_user || pass != expected_pass {
            return Err(WebhookRejection::Auth("invalid credentials".to_string()));
        }
        Ok(())
    }

    fn normalize(&self, raw_body: &[u8]) -> Result<NormalizedWebhook, WebhookRejection> {
        let payload = parse_body(raw_body)?;
        // The reference field is the cart id directly for this provider.
        let cart_id = require_str(&payload, "reference")?.to_string();
        let raw_status = require_str(&payload, "status")?.to_uppercase();
        let transaction_id = require_str(&payload, "transaction_id")?.to_string();
        let amount_minor = require_i64(&payload, "amount")?;
        let currency = payload
            .get("currency")
            .and_then(|v| v.as_str())
            .unwrap_or("COP")
            .to_string();

        let outcome = match raw_status.as_str() {
            "APPROVED" => ProviderOutcome::Approved,
            "PENDING" => ProviderOutcome::Pending,
            "REJECTED" | "DECLINED" | "ABANDONED" | "INTERNAL_ERROR" => ProviderOutcome::Rejected {
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
            metadata: payload,
        })
    }
}
