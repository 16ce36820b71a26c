use crate::commerce::{PaymentView, PaymentsModule};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Capture and cancel go through the commerce platform's admin API so its
/// payment module keeps ownership of state transitions (and their idempotency).
#[derive(Clone)]
pub struct PaymentsApiClient {
    pub base_url: String,
    pub api_token: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl PaymentsApiClient {
    fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }

    async fn post_action(&self, path: &str, action: &str) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_token)
            .timeout(self.timeout())
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "{} call failed with status {}: {}",
                action,
                status,
                body.chars().take(200).collect::<String>()
            );
        }
        Ok(())
    }
}

fn parse_timestamp(value: Option<&serde_json::Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait::async_trait]
impl PaymentsModule for PaymentsApiClient {
    async fn find_collection_by_order(&self, order_id: &str) -> Result<Option<String>> {
        let url = format!("{}/admin/orders/{}/payment-collections", self.base_url, order_id);
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .timeout(self.timeout())
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            anyhow::bail!("payment collection lookup failed with status {}", resp.status());
        }
        let body: serde_json::Value = resp.json().await?;
        Ok(body
            .get("payment_collections")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("id"))
            .and_then(|id| id.as_str())
            .map(ToString::to_string))
    }

    async fn list_payments(&self, collection_id: &str) -> Result<Vec<PaymentView>> {
        let url = format!("{}/admin/payment-collections/{}", self.base_url, collection_id);
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .timeout(self.timeout())
            .send()
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("payment collection fetch failed with status {}", resp.status());
        }
        let body: serde_json::Value = resp.json().await?;
        let payments = body
            .get("payment_collection")
            .and_then(|c| c.get("payments"))
            .and_then(|p| p.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(payments
            .iter()
            .filter_map(|p| {
                Some(PaymentView {
                    id: p.get("id")?.as_str()?.to_string(),
                    amount_minor: p.get("amount").and_then(|a| a.as_i64()).unwrap_or(0),
                    captured_at: parse_timestamp(p.get("captured_at")),
                    canceled_at: parse_timestamp(p.get("canceled_at")),
                })
            })
            .collect())
    }

    async fn capture(&self, payment_id: &str) -> Result<()> {
        self.post_action(&format!("/admin/payments/{}/capture", payment_id), "capture")
            .await
    }

    async fn cancel(&self, payment_id: &str) -> Result<()> {
        self.post_action(&format!("/admin/payments/{}/cancel", payment_id), "cancel")
            .await
    }
}
