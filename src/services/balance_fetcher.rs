use std::sync::Arc;

use crate::{
    amount::{format_native_amount, truncate_balance},
    error::{BalanceErrorCode, BalanceQueryError, ExternalError},
    models::has_address_shape,
    services::onchain::ChainClient,
};

// JSON-RPC codes nodes use for throttling.
const RATE_LIMIT_RPC_CODES: [i64; 2] = [429, -32005];

#[derive(Clone, Copy)]
enum BalanceFailureKind {
    Network,
    InvalidAddress,
    RateLimit,
}

// Checked in order; the first matching substring decides.
const BALANCE_FAILURE_RULES: &[(&str, BalanceFailureKind)] = &[
    ("network", BalanceFailureKind::Network),
    ("timeout", BalanceFailureKind::Network),
    ("invalid", BalanceFailureKind::InvalidAddress),
    ("address", BalanceFailureKind::InvalidAddress),
    ("rate limit", BalanceFailureKind::RateLimit),
    ("429", BalanceFailureKind::RateLimit),
];

/// Reads a native balance and renders it for display.
pub struct BalanceFetcher {
    client: Arc<dyn ChainClient>,
}

impl BalanceFetcher {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }

    pub async fn fetch_balance(&self, address: &str) -> Result<String, BalanceQueryError> {
        if address.is_empty() {
            return Err(BalanceQueryError::new(
                "Wallet address is required",
                BalanceErrorCode::MissingAddress,
            ));
        }
        if !has_address_shape(address) {
            return Err(BalanceQueryError::new(
                "Invalid wallet address format",
                BalanceErrorCode::InvalidAddress,
            ));
        }

        match self.client.get_balance(address).await {
            Ok(wei) => {
                let formatted = truncate_balance(&format_native_amount(wei));
                tracing::debug!("balance address={} balance={}", address, formatted);
                Ok(formatted)
            }
            Err(err) => {
                tracing::warn!("balance fetch failed address={}: {}", address, err);
                Err(classify_balance_failure(err))
            }
        }
    }
}

/// Maps an RPC failure onto the balance taxonomy, keeping it as the cause.
pub fn classify_balance_failure(err: ExternalError) -> BalanceQueryError {
    let message = match &err {
        ExternalError::Failure { message, .. } => message.clone(),
        ExternalError::Opaque(_) => {
            return BalanceQueryError::new(
                "Unknown error occurred while fetching balance",
                BalanceErrorCode::UnknownError,
            )
            .with_cause(err);
        }
    };

    let kind = if err
        .rpc_code()
        .is_some_and(|code| RATE_LIMIT_RPC_CODES.contains(&code))
    {
        Some(BalanceFailureKind::RateLimit)
    } else {
        BALANCE_FAILURE_RULES
            .iter()
            .find(|(needle, _)| message.contains(*needle))
            .map(|(_, kind)| *kind)
    };

    let classified = match kind {
        Some(BalanceFailureKind::Network) => BalanceQueryError::new(
            "Network error while fetching balance",
            BalanceErrorCode::NetworkError,
        ),
        Some(BalanceFailureKind::InvalidAddress) => BalanceQueryError::new(
            "Invalid address provided to balance query",
            BalanceErrorCode::InvalidAddress,
        ),
        Some(BalanceFailureKind::RateLimit) => BalanceQueryError::new(
            "Rate limit exceeded, please try again later",
            BalanceErrorCode::RateLimit,
        ),
        None => BalanceQueryError::new(
            format!("Failed to fetch wallet balance: {}", message),
            BalanceErrorCode::FetchError,
        ),
    };
    classified.with_cause(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCause;
    use crate::testing::{ether, milli_ether, FakeChainClient, ALICE};

    fn fetcher(client: Arc<FakeChainClient>) -> BalanceFetcher {
        BalanceFetcher::new(client)
    }

    #[tokio::test]
    async fn rejects_missing_and_malformed_addresses_without_rpc() {
        let client = Arc::new(FakeChainClient::new());
        let fetcher = fetcher(client.clone());

        let err = fetcher.fetch_balance("").await.unwrap_err();
        assert_eq!(err.code(), &BalanceErrorCode::MissingAddress);
        assert_eq!(err.message(), "Wallet address is required");

        let err = fetcher.fetch_balance("0x1234").await.unwrap_err();
        assert_eq!(err.code(), &BalanceErrorCode::InvalidAddress);
        assert_eq!(err.message(), "Invalid wallet address format");

        assert_eq!(client.balance_calls(), 0);
    }

    #[tokio::test]
    async fn formats_balance_through_truncation() {
        let client = Arc::new(FakeChainClient::new().with_balance(milli_ether(500)));
        assert_eq!(fetcher(client).fetch_balance(ALICE).await.unwrap(), "0.5");

        let client = Arc::new(FakeChainClient::new().with_balance(ether(3)));
        assert_eq!(fetcher(client).fetch_balance(ALICE).await.unwrap(), "3");

        let dust = ethers::types::U256::from(600_048_720_000u64);
        let client = Arc::new(FakeChainClient::new().with_balance(dust));
        assert_eq!(fetcher(client).fetch_balance(ALICE).await.unwrap(), "0.00000060");
    }

    #[test]
    fn classifies_failures_by_message() {
        let cases = [
            ("network down", BalanceErrorCode::NetworkError),
            ("request timeout", BalanceErrorCode::NetworkError),
            ("invalid params", BalanceErrorCode::InvalidAddress),
            ("bad address", BalanceErrorCode::InvalidAddress),
            ("rate limit reached", BalanceErrorCode::RateLimit),
            ("HTTP 429", BalanceErrorCode::RateLimit),
            ("execution reverted", BalanceErrorCode::FetchError),
        ];
        for (message, code) in cases {
            let err = classify_balance_failure(ExternalError::failure(message));
            assert_eq!(err.code(), &code, "message {}", message);
            assert!(matches!(err.cause(), Some(ErrorCause::External(_))));
        }
    }

    #[test]
    fn first_matching_rule_wins() {
        let err = classify_balance_failure(ExternalError::failure("network: invalid address"));
        assert_eq!(err.code(), &BalanceErrorCode::NetworkError);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let err = classify_balance_failure(ExternalError::failure("Network unreachable"));
        assert_eq!(err.code(), &BalanceErrorCode::FetchError);
        assert_eq!(err.message(), "Failed to fetch wallet balance: Network unreachable");
    }

    #[test]
    fn structured_rate_limit_code_wins_over_text() {
        let err = classify_balance_failure(ExternalError::with_code("limit exceeded", -32005));
        assert_eq!(err.code(), &BalanceErrorCode::RateLimit);
    }

    #[test]
    fn opaque_rejection_is_unknown() {
        let err = classify_balance_failure(ExternalError::Opaque(serde_json::json!("boom")));
        assert_eq!(err.code(), &BalanceErrorCode::UnknownError);
        assert_eq!(err.message(), "Unknown error occurred while fetching balance");
    }
}
