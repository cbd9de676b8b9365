use axum::{extract::State, Json};
use serde::Serialize;
use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub rpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    // RPC is reachable if it answers a block number
    let (rpc, block_number) = match state.client.get_block_number().await {
        Ok(block) => ("connected".to_string(), Some(block)),
        Err(e) => {
            tracing::warn!("health check RPC probe failed: {}", e);
            ("disconnected".to_string(), None)
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        rpc,
        block_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::test_state;
    use crate::testing::FakeChainClient;
    use std::sync::Arc;

    #[tokio::test]
    async fn health_reports_connected_rpc() {
        let state = test_state(Arc::new(FakeChainClient::new()));
        let Json(body) = health_check(State(state)).await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.rpc, "connected");
        assert_eq!(body.block_number, Some(1));
    }
}
