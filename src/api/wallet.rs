use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::{constants::NATIVE_SYMBOL, error::Result, models::ApiResponse};

#[derive(Debug, Default, Deserialize)]
pub struct BalanceParams {
    /// Skip the cache and ask the node again.
    pub refresh: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct WalletBalanceResponse {
    pub address: String,
    pub balance: String,
    pub symbol: String,
    pub explorer_url: String,
}

/// GET /api/v1/wallet/{address}/balance
pub async fn get_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(params): Query<BalanceParams>,
) -> Result<Json<ApiResponse<WalletBalanceResponse>>> {
    let address = address.trim().to_string();
    let balance = if params.refresh.unwrap_or(false) {
        state.balances.refetch(&address).await?
    } else {
        state.balances.fetch(&address).await?
    };

    tracing::debug!("balance served address={} balance={}", address, balance);
    Ok(Json(ApiResponse::success(WalletBalanceResponse {
        explorer_url: state.explorer.address_url(&address),
        address,
        balance,
        symbol: NATIVE_SYMBOL.to_string(),
    })))
}
