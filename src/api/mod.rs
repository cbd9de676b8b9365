// src/api/mod.rs

pub mod health;
pub mod transactions;
pub mod wallet;

use std::sync::Arc;

use crate::config::Config;
use crate::explorer::ExplorerNetwork;
use crate::services::{
    balance_query::BalanceCache, BalanceFetcher, BalanceQuery, ChainClient, TransactionQueries,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub client: Arc<dyn ChainClient>,
    pub balances: Arc<BalanceQuery>,
    pub transactions: Arc<TransactionQueries>,
    pub explorer: ExplorerNetwork,
}

impl AppState {
    /// Builds the query layers over one shared RPC client.
    pub fn new(config: Config, client: Arc<dyn ChainClient>) -> Self {
        let fetcher = Arc::new(BalanceFetcher::new(client.clone()));
        let balances = Arc::new(BalanceQuery::from_config(
            &config,
            fetcher,
            Arc::new(BalanceCache::new()),
        ));
        let transactions = Arc::new(
            TransactionQueries::new(client.clone()).with_receipt_timeout(config.receipt_timeout()),
        );
        let explorer = config.explorer().unwrap_or_default();
        Self {
            config,
            client,
            balances,
            transactions,
            explorer,
        }
    }
}
