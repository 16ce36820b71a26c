use crate::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// Redacted projection of a buffered result; providers' opaque metadata stays
/// internal.
pub async fn get_payment_status(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
) -> impl IntoResponse {
    match state.buffer_store.get(&cart_id).await {
        Some(result) => (
            axum::http::StatusCode::OK,
            Json(json!({
                "status": result.status,
                "transaction_id": result.transaction_id,
                "provider": result.provider,
                "amount": result.amount_minor,
                "currency": result.currency,
                "webhook_received_at": result.webhook_received_at,
            })),
        )
            .into_response(),
        None => (
            axum::http::StatusCode::NOT_FOUND,
            Json(json!({ "message": "no pending payment result", "cart_id": cart_id })),
        )
            .into_response(),
    }
}
