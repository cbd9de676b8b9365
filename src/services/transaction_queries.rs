use futures_util::future::join;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    constants::{
        RECEIPT_TIMEOUT_SECS, RETRY_BASE_DELAY_MS, TX_CONFIRMATION_GC_SECS,
        TX_CONFIRMATION_RETRY_DELAY_MS, TX_DETAIL_GC_SECS, TX_DETAIL_RETRY_MAX_DELAY_MS,
        TX_DETAIL_STALE_SECS,
    },
    error::{TransferError, TransferErrorCode},
    models::{ReceiptRecord, TransactionRecord},
    query::{Backoff, QueryCache, QueryKey, QueryOptions, RetryPolicy},
    services::onchain::ChainClient,
};

pub type TransactionCache = QueryCache<TransactionRecord, TransferError>;
pub type ConfirmationCache = QueryCache<ReceiptRecord, TransferError>;

const DETAIL_NETWORK_RETRIES: u32 = 3;
const DETAIL_DEFAULT_RETRIES: u32 = 2;
const CONFIRMATION_RETRIES: u32 = 1;

pub async fn get_transaction(
    client: &dyn ChainClient,
    hash: &str,
) -> Result<TransactionRecord, TransferError> {
    match client.get_transaction(hash).await {
        Ok(Some(tx)) => Ok(tx),
        Ok(None) => Err(TransferError::new(
            "Failed to fetch transaction",
            TransferErrorCode::FetchTransactionError,
        )
        .with_details(serde_json::json!({ "hash": hash, "reason": "not found" }))),
        Err(e) => {
            tracing::warn!("transaction lookup failed hash={}: {}", hash, e);
            Err(
                TransferError::new("Failed to fetch transaction", TransferErrorCode::FetchTransactionError)
                    .with_cause(e),
            )
        }
    }
}

pub async fn wait_for_transaction(
    client: &dyn ChainClient,
    hash: &str,
    timeout: Duration,
) -> Result<ReceiptRecord, TransferError> {
    client
        .wait_for_transaction_receipt(hash, timeout)
        .await
        .map_err(|e| {
            tracing::warn!("confirmation wait failed hash={}: {}", hash, e);
            TransferError::new(
                "Transaction confirmation timeout or failed",
                TransferErrorCode::ConfirmationError,
            )
            .with_cause(e)
        })
}

fn missing_hash() -> TransferError {
    TransferError::new("No transaction hash provided", TransferErrorCode::MissingHash)
}

#[derive(Debug, Clone, Copy)]
pub struct DetailRetryPolicy {
    backoff: Backoff,
}

impl Default for DetailRetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Backoff::from_millis(RETRY_BASE_DELAY_MS, TX_DETAIL_RETRY_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy<TransferError> for DetailRetryPolicy {
    fn should_retry(&self, failure_count: u32, error: &TransferError) -> bool {
        match error.code() {
            TransferErrorCode::MissingHash => false,
            TransferErrorCode::NetworkError => failure_count < DETAIL_NETWORK_RETRIES,
            _ => failure_count < DETAIL_DEFAULT_RETRIES,
        }
    }

    fn retry_delay(&self, failure_count: u32) -> Duration {
        self.backoff.delay(failure_count)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConfirmationRetryPolicy {
    delay: Duration,
}

impl Default for ConfirmationRetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(TX_CONFIRMATION_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy<TransferError> for ConfirmationRetryPolicy {
    fn should_retry(&self, failure_count: u32, error: &TransferError) -> bool {
        match error.code() {
            TransferErrorCode::MissingHash | TransferErrorCode::ConfirmationError => false,
            _ => failure_count < CONFIRMATION_RETRIES,
        }
    }

    fn retry_delay(&self, _failure_count: u32) -> Duration {
        self.delay
    }
}

/// Cached transaction detail and confirmation lookups.
pub struct TransactionQueries {
    client: Arc<dyn ChainClient>,
    details: Arc<TransactionCache>,
    confirmations: Arc<ConfirmationCache>,
    receipt_timeout: Duration,
    detail_policy: DetailRetryPolicy,
    confirmation_policy: ConfirmationRetryPolicy,
}

impl TransactionQueries {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self {
            client,
            details: Arc::new(TransactionCache::new()),
            confirmations: Arc::new(ConfirmationCache::new()),
            receipt_timeout: Duration::from_secs(RECEIPT_TIMEOUT_SECS),
            detail_policy: DetailRetryPolicy::default(),
            confirmation_policy: ConfirmationRetryPolicy::default(),
        }
    }

    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.detail_policy = DetailRetryPolicy { backoff };
        self.confirmation_policy = ConfirmationRetryPolicy { delay: backoff.base };
        self
    }

    pub fn detail_options() -> QueryOptions {
        QueryOptions::new(
            Duration::from_secs(TX_DETAIL_STALE_SECS),
            Duration::from_secs(TX_DETAIL_GC_SECS),
        )
    }

    pub fn confirmation_options() -> QueryOptions {
        QueryOptions::new(Duration::MAX, Duration::from_secs(TX_CONFIRMATION_GC_SECS))
    }

    pub fn detail_cache(&self) -> &Arc<TransactionCache> {
        &self.details
    }

    pub fn confirmation_cache(&self) -> &Arc<ConfirmationCache> {
        &self.confirmations
    }

    pub async fn detail(&self, hash: Option<&str>) -> Result<TransactionRecord, TransferError> {
        let hash = hash.filter(|h| !h.is_empty()).ok_or_else(missing_hash)?;
        let key = QueryKey::transaction_detail(hash);
        let client = self.client.clone();
        let hash = hash.to_string();
        self.details
            .fetch_with(&key, Self::detail_options(), &self.detail_policy, move || {
                let client = client.clone();
                let hash = hash.clone();
                async move { get_transaction(client.as_ref(), &hash).await }
            })
            .await
    }

    pub async fn confirmation(&self, hash: Option<&str>) -> Result<ReceiptRecord, TransferError> {
        let hash = hash.filter(|h| !h.is_empty()).ok_or_else(missing_hash)?;
        let key = QueryKey::transaction_confirmation(hash);
        let client = self.client.clone();
        let hash = hash.to_string();
        let timeout = self.receipt_timeout;
        self.confirmations
            .fetch_with(
                &key,
                Self::confirmation_options(),
                &self.confirmation_policy,
                move || {
                    let client = client.clone();
                    let hash = hash.clone();
                    async move { wait_for_transaction(client.as_ref(), &hash, timeout).await }
                },
            )
            .await
    }

    /// Invalidates detail and confirmation entries for `hash`.
    pub async fn invalidate(&self, hash: &str) {
        let [detail, confirmation] = QueryKey::transaction_keys(hash);
        join(
            self.details.invalidate(&detail),
            self.confirmations.invalidate(&confirmation),
        )
        .await;
    }
}
