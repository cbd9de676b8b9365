use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::{
    config::Config,
    constants::{
        BALANCE_DEFAULT_RETRIES, BALANCE_GC_SECS, BALANCE_NETWORK_RETRIES,
        BALANCE_RETRY_MAX_DELAY_MS, BALANCE_STALE_SECS, RETRY_BASE_DELAY_MS,
    },
    error::{BalanceErrorCode, BalanceQueryError},
    query::{Backoff, QueryCache, QueryKey, QueryNamespace, QueryOptions, QuerySnapshot, RetryPolicy},
    services::balance_fetcher::BalanceFetcher,
};

pub type BalanceCache = QueryCache<String, BalanceQueryError>;
pub type BalanceSnapshot = QuerySnapshot<String, BalanceQueryError>;

/// Retry rules for balance lookups.
#[derive(Debug, Clone, Copy)]
pub struct BalanceRetryPolicy {
    backoff: Backoff,
}

impl Default for BalanceRetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Backoff::from_millis(RETRY_BASE_DELAY_MS, BALANCE_RETRY_MAX_DELAY_MS),
        }
    }
}

impl BalanceRetryPolicy {
    pub fn with_backoff(backoff: Backoff) -> Self {
        Self { backoff }
    }
}

impl RetryPolicy<BalanceQueryError> for BalanceRetryPolicy {
    fn should_retry(&self, failure_count: u32, error: &BalanceQueryError) -> bool {
        match error.code() {
            BalanceErrorCode::MissingAddress
            | BalanceErrorCode::InvalidAddress
            | BalanceErrorCode::RateLimit => false,
            BalanceErrorCode::NetworkError => failure_count < BALANCE_NETWORK_RETRIES,
            _ => failure_count < BALANCE_DEFAULT_RETRIES,
        }
    }

    fn retry_delay(&self, failure_count: u32) -> Duration {
        self.backoff.delay(failure_count)
    }
}

pub fn default_balance_options() -> QueryOptions {
    QueryOptions::new(
        Duration::from_secs(BALANCE_STALE_SECS),
        Duration::from_secs(BALANCE_GC_SECS),
    )
}

/// Cached, retried balance lookups keyed by address.
pub struct BalanceQuery {
    fetcher: Arc<BalanceFetcher>,
    cache: Arc<BalanceCache>,
    options: QueryOptions,
    policy: BalanceRetryPolicy,
}

impl BalanceQuery {
    pub fn new(fetcher: Arc<BalanceFetcher>, cache: Arc<BalanceCache>) -> Self {
        Self {
            fetcher,
            cache,
            options: default_balance_options(),
            policy: BalanceRetryPolicy::default(),
        }
    }

    pub fn from_config(
        config: &Config,
        fetcher: Arc<BalanceFetcher>,
        cache: Arc<BalanceCache>,
    ) -> Self {
        Self::new(fetcher, cache).with_options(QueryOptions::new(
            config.balance_stale_time(),
            config.balance_gc_time(),
        ))
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_policy(mut self, policy: BalanceRetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn cache(&self) -> &Arc<BalanceCache> {
        &self.cache
    }

    pub fn options(&self) -> QueryOptions {
        self.options
    }

    pub async fn fetch(&self, address: &str) -> Result<String, BalanceQueryError> {
        let key = QueryKey::wallet_balance(address);
        let fetcher = self.fetcher.clone();
        let address = address.to_string();
        self.cache
            .fetch_with(&key, self.options, &self.policy, move || {
                let fetcher = fetcher.clone();
                let address = address.clone();
                async move { fetcher.fetch_balance(&address).await }
            })
            .await
    }

    /// Fetches regardless of freshness.
    pub async fn refetch(&self, address: &str) -> Result<String, BalanceQueryError> {
        let key = QueryKey::wallet_balance(address);
        let fetcher = self.fetcher.clone();
        let address = address.to_string();
        self.cache
            .refetch_with(&key, self.options, &self.policy, move || {
                let fetcher = fetcher.clone();
                let address = address.clone();
                async move { fetcher.fetch_balance(&address).await }
            })
            .await
    }

    /// Query-shaped read. Without an address nothing is fetched and the snapshot is idle.
    pub async fn query(&self, address: Option<&str>) -> BalanceSnapshot {
        let Some(address) = address.filter(|a| !a.is_empty()) else {
            return QuerySnapshot::idle();
        };
        let _ = self.fetch(address).await;
        self.snapshot(Some(address)).await
    }

    pub async fn snapshot(&self, address: Option<&str>) -> BalanceSnapshot {
        match address.filter(|a| !a.is_empty()) {
            Some(address) => self
                .cache
                .snapshot(&QueryKey::wallet_balance(address))
                .await
                .unwrap_or_else(QuerySnapshot::idle),
            None => QuerySnapshot::idle(),
        }
    }

    /// Warms the cache in the background. The caller never waits on it.
    pub fn prefetch(self: &Arc<Self>, address: &str) -> JoinHandle<()> {
        let query = self.clone();
        let address = address.to_string();
        tokio::spawn(async move {
            if let Err(e) = query.fetch(&address).await {
                tracing::debug!("balance prefetch failed address={}: {}", address, e);
            }
        })
    }

    /// Background refetch that ignores freshness.
    pub fn spawn_refresh(self: &Arc<Self>, address: &str) -> JoinHandle<()> {
        let query = self.clone();
        let address = address.to_string();
        tokio::spawn(async move {
            if let Err(e) = query.refetch(&address).await {
                tracing::debug!("balance refresh failed address={}: {}", address, e);
            }
        })
    }

    pub async fn invalidate(&self, address: &str) -> bool {
        self.cache.invalidate(&QueryKey::wallet_balance(address)).await
    }

    /// Invalidates every cached balance.
    pub async fn invalidate_all(&self) -> usize {
        self.cache.invalidate_namespace(QueryNamespace::Wallet).await
    }
}
