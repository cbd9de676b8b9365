use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::{
    error::Result,
    explorer::extract_hash_from_url,
    models::{ApiResponse, ReceiptRecord, TransactionRecord},
};

use super::AppState;

#[derive(Debug, Serialize)]
pub struct TransactionDetailResponse {
    #[serde(flatten)]
    pub transaction: TransactionRecord,
    pub explorer_url: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmationResponse {
    #[serde(flatten)]
    pub receipt: ReceiptRecord,
    pub confirmed: bool,
    pub explorer_url: String,
}

// Accepts a bare hash or a pasted explorer link.
fn resolve_hash(raw: &str) -> String {
    let raw = raw.trim();
    extract_hash_from_url(raw).unwrap_or_else(|| raw.to_string())
}

/// GET /api/v1/transactions/{tx_hash}
pub async fn get_details(
    State(state): State<AppState>,
    Path(tx_hash): Path<String>,
) -> Result<Json<ApiResponse<TransactionDetailResponse>>> {
    let hash = resolve_hash(&tx_hash);
    let tx = state.transactions.detail(Some(&hash)).await?;

    Ok(Json(ApiResponse::success(TransactionDetailResponse {
        explorer_url: state.explorer.transaction_url(&tx.hash),
        transaction: tx,
    })))
}

/// GET /api/v1/transactions/{tx_hash}/confirmation
///
/// Waits for the receipt up to the configured timeout.
pub async fn get_confirmation(
    State(state): State<AppState>,
    Path(tx_hash): Path<String>,
) -> Result<Json<ApiResponse<ConfirmationResponse>>> {
    let hash = resolve_hash(&tx_hash);
    let receipt = state.transactions.confirmation(Some(&hash)).await?;

    Ok(Json(ApiResponse::success(ConfirmationResponse {
        confirmed: receipt.succeeded(),
        explorer_url: state.explorer.transaction_url(&receipt.transaction_hash),
        receipt,
    })))
}
