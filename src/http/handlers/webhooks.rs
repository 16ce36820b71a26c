use crate::domain::outcome::WebhookRejection;
use crate::providers::ProviderAdapter;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

fn rejection_response(provider: &'static str, rejection: WebhookRejection) -> Response {
    tracing::warn!(provider, "webhook rejected: {}", rejection);
    (rejection.status(), Json(rejection.envelope())).into_response()
}

async fn handle_provider_webhook<A: ProviderAdapter>(
    state: &AppState,
    adapter: &A,
    headers: &HeaderMap,
    body: &[u8],
) -> Response {
    match adapter.verify_and_normalize(headers, body) {
        Ok(webhook) => {
            let reply = state.reconciliation.handle_webhook(webhook).await;
            (reply.status, Json(reply.body)).into_response()
        }
        Err(rejection) => rejection_response(adapter.name(), rejection),
    }
}

pub async fn payvalida_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_provider_webhook(&state, state.providers.payvalida.as_ref(), &headers, &body).await
}

pub async fn bold_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    handle_provider_webhook(&state, state.providers.bold.as_ref(), &headers, &body).await
}

/// Wompi retries aggressively on anything but a fast 200. When the order
/// already exists the response is committed before the signature check
/// finishes; verification and settlement continue on a spawned task, and a
/// failure there can only log.
pub async fn wompi_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let adapter = state.providers.wompi.clone();
    let webhook = match adapter.normalize(&body) {
        Ok(webhook) => webhook,
        Err(rejection) => return rejection_response(adapter.name(), rejection),
    };

    if let Some(order_id) = state.reconciliation.known_order(&webhook.cart_id).await {
        let cart_id = webhook.cart_id.clone();
        let service = state.reconciliation.clone();
        tokio::spawn(async move {
            match adapter.verify(&headers, &body) {
                Ok(()) => {
                    service.settle_with_order(webhook, &order_id).await;
                }
                Err(rejection) => {
                    tracing::warn!(
                        order_id = %order_id,
                        "wompi signature rejected after early ack: {}",
                        rejection
                    );
                }
            }
        });
        return (
            axum::http::StatusCode::OK,
            Json(json!({ "message": "ok", "cart_id": cart_id })),
        )
            .into_response();
    }

    match adapter.verify(&headers, &body) {
        Ok(()) => {
            let reply = state.reconciliation.handle_webhook(webhook).await;
            (reply.status, Json(reply.body)).into_response()
        }
        Err(rejection) => rejection_response(adapter.name(), rejection),
    }
}
