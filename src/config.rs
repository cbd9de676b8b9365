use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::constants::{
    BALANCE_GC_SECS, BALANCE_STALE_SECS, CACHE_SWEEP_INTERVAL_SECS, CHAIN_ID_MAINNET,
    CHAIN_ID_SEPOLIA, DEFAULT_SEPOLIA_RPC_URL, RECEIPT_TIMEOUT_SECS,
};
use crate::explorer::ExplorerNetwork;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Blockchain
    pub ethereum_rpc_url: String,
    pub chain_id: u64,
    pub explorer_network: String,

    // Query cache
    pub balance_stale_secs: u64,
    pub balance_gc_secs: u64,
    pub cache_sweep_interval_secs: u64,

    // Transactions
    pub receipt_timeout_secs: u64,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            ethereum_rpc_url: env::var("ETHEREUM_RPC_URL")
                .unwrap_or_else(|_| DEFAULT_SEPOLIA_RPC_URL.to_string()),
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| CHAIN_ID_SEPOLIA.to_string())
                .parse()?,
            explorer_network: env::var("EXPLORER_NETWORK")
                .unwrap_or_else(|_| "sepolia".to_string()),

            balance_stale_secs: env::var("BALANCE_STALE_SECS")
                .unwrap_or_else(|_| BALANCE_STALE_SECS.to_string())
                .parse()?,
            balance_gc_secs: env::var("BALANCE_GC_SECS")
                .unwrap_or_else(|_| BALANCE_GC_SECS.to_string())
                .parse()?,
            cache_sweep_interval_secs: env::var("CACHE_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| CACHE_SWEEP_INTERVAL_SECS.to_string())
                .parse()?,

            receipt_timeout_secs: env::var("RECEIPT_TIMEOUT_SECS")
                .unwrap_or_else(|_| RECEIPT_TIMEOUT_SECS.to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ethereum_rpc_url.trim().is_empty() {
            anyhow::bail!("ETHEREUM_RPC_URL is empty");
        }
        if let Err(e) = url::Url::parse(self.ethereum_rpc_url.trim()) {
            anyhow::bail!("ETHEREUM_RPC_URL is not a valid URL: {}", e);
        }
        if self.balance_stale_secs == 0 {
            anyhow::bail!("BALANCE_STALE_SECS must be > 0");
        }
        let Some(explorer) = self.explorer() else {
            anyhow::bail!("Unknown EXPLORER_NETWORK: {}", self.explorer_network);
        };

        if self.balance_gc_secs < self.balance_stale_secs {
            tracing::warn!("BALANCE_GC_SECS is shorter than BALANCE_STALE_SECS; entries expire before going stale");
        }
        if self.cache_sweep_interval_secs == 0 {
            tracing::warn!("CACHE_SWEEP_INTERVAL_SECS is 0; cache sweeper disabled");
        }
        if self.receipt_timeout_secs == 0 {
            tracing::warn!("RECEIPT_TIMEOUT_SECS is 0; confirmations will time out immediately");
        }
        if self.chain_id == CHAIN_ID_MAINNET && self.is_testnet() {
            tracing::warn!("Mainnet chain id configured in a testnet environment");
        }
        if explorer.chain_id() != self.chain_id {
            tracing::warn!(
                "EXPLORER_NETWORK {} does not match CHAIN_ID {}; explorer links may be wrong",
                explorer,
                self.chain_id
            );
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    pub fn is_testnet(&self) -> bool {
        if self.environment == "development" || self.environment == "testnet" {
            return true;
        }
        self.chain_id != CHAIN_ID_MAINNET
    }

    pub fn explorer(&self) -> Option<ExplorerNetwork> {
        ExplorerNetwork::from_name(&self.explorer_network)
    }

    pub fn balance_stale_time(&self) -> Duration {
        Duration::from_secs(self.balance_stale_secs)
    }

    pub fn balance_gc_time(&self) -> Duration {
        Duration::from_secs(self.balance_gc_secs)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            environment: "production".to_string(),
            ethereum_rpc_url: DEFAULT_SEPOLIA_RPC_URL.to_string(),
            chain_id: CHAIN_ID_SEPOLIA,
            explorer_network: "sepolia".to_string(),
            balance_stale_secs: BALANCE_STALE_SECS,
            balance_gc_secs: BALANCE_GC_SECS,
            cache_sweep_interval_secs: CACHE_SWEEP_INTERVAL_SECS,
            receipt_timeout_secs: RECEIPT_TIMEOUT_SECS,
            cors_allowed_origins: "*".to_string(),
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_rpc_url() {
        let mut config = sample();
        config.ethereum_rpc_url = "not a url".to_string();
        assert!(config.validate().is_err());
        config.ethereum_rpc_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_staleness_and_unknown_explorer() {
        let mut config = sample();
        config.balance_stale_secs = 0;
        assert!(config.validate().is_err());

        let mut config = sample();
        config.explorer_network = "ropsten".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn is_testnet_follows_environment_and_chain() {
        let mut config = sample();
        assert!(config.is_testnet());
        config.chain_id = CHAIN_ID_MAINNET;
        assert!(!config.is_testnet());
        config.environment = "development".to_string();
        assert!(config.is_testnet());
    }
}
