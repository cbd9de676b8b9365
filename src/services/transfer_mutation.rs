use std::sync::Arc;
use std::time::Duration;

use crate::{
    constants::{RETRY_BASE_DELAY_MS, TRANSFER_NETWORK_RETRIES, TRANSFER_RETRY_MAX_DELAY_MS},
    error::{TransferError, TransferErrorCode},
    models::{TransferRequest, TransferResult},
    query::{run_with_retry, Backoff, Retried, RetryPolicy},
    services::transfer_executor::TransferExecutor,
};

/// Transfers are not retried, except for transient network failures.
#[derive(Debug, Clone, Copy)]
pub struct TransferRetryPolicy {
    backoff: Backoff,
}

impl Default for TransferRetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Backoff::from_millis(RETRY_BASE_DELAY_MS, TRANSFER_RETRY_MAX_DELAY_MS),
        }
    }
}

impl TransferRetryPolicy {
    pub fn with_backoff(backoff: Backoff) -> Self {
        Self { backoff }
    }
}

impl RetryPolicy<TransferError> for TransferRetryPolicy {
    fn should_retry(&self, failure_count: u32, error: &TransferError) -> bool {
        match error.code() {
            TransferErrorCode::InvalidFromAddress
            | TransferErrorCode::InvalidToAddress
            | TransferErrorCode::InvalidAmount
            | TransferErrorCode::SameAddress
            | TransferErrorCode::InsufficientBalance
            | TransferErrorCode::UserRejected
            | TransferErrorCode::MissingSendFunction
            | TransferErrorCode::NoWalletConnection => false,
            TransferErrorCode::NetworkError => failure_count < TRANSFER_NETWORK_RETRIES,
            _ => false,
        }
    }

    fn retry_delay(&self, failure_count: u32) -> Duration {
        self.backoff.delay(failure_count)
    }
}

/// Executor wrapped in the transfer retry policy.
pub struct TransferMutation {
    executor: Arc<TransferExecutor>,
    policy: TransferRetryPolicy,
}

impl TransferMutation {
    pub fn new(executor: Arc<TransferExecutor>) -> Self {
        Self {
            executor,
            policy: TransferRetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: TransferRetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn execute(&self, request: TransferRequest) -> Retried<TransferResult, TransferError> {
        let executor = self.executor.clone();
        run_with_retry(&self.policy, "transfer", move || {
            let executor = executor.clone();
            let request = request.clone();
            async move { executor.send_transfer(request).await }
        })
        .await
    }
}
