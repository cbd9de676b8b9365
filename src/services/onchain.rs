use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, Provider, ProviderError, RpcError},
    types::{
        transaction::eip2718::TypedTransaction, Address, Transaction, TransactionReceipt,
        TransactionRequest, H256, U256,
    },
};
use std::str::FromStr;
use std::time::Duration;

use crate::{
    config::Config,
    constants::RECEIPT_POLL_INTERVAL_MS,
    error::{AppError, ExternalError, Result},
    models::{ReceiptRecord, TransactionRecord},
};

/// Read/estimate side of the ledger RPC.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_balance(&self, address: &str) -> std::result::Result<U256, ExternalError>;

    async fn estimate_gas(
        &self,
        from: &str,
        to: &str,
        value: U256,
    ) -> std::result::Result<U256, ExternalError>;

    async fn get_gas_price(&self) -> std::result::Result<U256, ExternalError>;

    /// `Ok(None)` when the node does not know the hash.
    async fn get_transaction(
        &self,
        hash: &str,
    ) -> std::result::Result<Option<TransactionRecord>, ExternalError>;

    async fn wait_for_transaction_receipt(
        &self,
        hash: &str,
        timeout: Duration,
    ) -> std::result::Result<ReceiptRecord, ExternalError>;

    async fn get_block_number(&self) -> std::result::Result<u64, ExternalError>;
}

pub struct EthersChainClient {
    provider: Provider<Http>,
    poll_interval: Duration,
}

impl EthersChainClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.ethereum_rpc_url)
    }

    pub fn new(rpc_url: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| AppError::Config(format!("Invalid EVM RPC URL: {}", e)))?;
        Ok(Self {
            provider,
            poll_interval: Duration::from_millis(RECEIPT_POLL_INTERVAL_MS),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn poll_receipt(&self, hash: H256) -> std::result::Result<TransactionReceipt, ExternalError> {
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(hash)
                .await
                .map_err(provider_failure)?;
            if let Some(receipt) = receipt {
                return Ok(receipt);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl ChainClient for EthersChainClient {
    async fn get_balance(&self, address: &str) -> std::result::Result<U256, ExternalError> {
        let addr = parse_address(address)?;
        tracing::debug!("eth_getBalance address={}", address);
        self.provider
            .get_balance(addr, None)
            .await
            .map_err(provider_failure)
    }

    async fn estimate_gas(
        &self,
        from: &str,
        to: &str,
        value: U256,
    ) -> std::result::Result<U256, ExternalError> {
        let tx: TypedTransaction = TransactionRequest::new()
            .from(parse_address(from)?)
            .to(parse_address(to)?)
            .value(value)
            .into();
        self.provider
            .estimate_gas(&tx, None)
            .await
            .map_err(provider_failure)
    }

    async fn get_gas_price(&self) -> std::result::Result<U256, ExternalError> {
        self.provider.get_gas_price().await.map_err(provider_failure)
    }

    async fn get_transaction(
        &self,
        hash: &str,
    ) -> std::result::Result<Option<TransactionRecord>, ExternalError> {
        let tx_hash = parse_hash(hash)?;
        let tx = self
            .provider
            .get_transaction(tx_hash)
            .await
            .map_err(provider_failure)?;
        Ok(tx.map(transaction_record))
    }

    async fn wait_for_transaction_receipt(
        &self,
        hash: &str,
        timeout: Duration,
    ) -> std::result::Result<ReceiptRecord, ExternalError> {
        let tx_hash = parse_hash(hash)?;
        tracing::debug!("waiting for receipt hash={} timeout={}s", hash, timeout.as_secs());
        match tokio::time::timeout(timeout, self.poll_receipt(tx_hash)).await {
            Ok(receipt) => receipt.map(receipt_record),
            Err(_) => Err(ExternalError::failure(format!(
                "Timed out while waiting for transaction with hash \"{}\" to be confirmed.",
                hash
            ))),
        }
    }

    async fn get_block_number(&self) -> std::result::Result<u64, ExternalError> {
        self.provider
            .get_block_number()
            .await
            .map(|n| n.as_u64())
            .map_err(provider_failure)
    }
}

// Internal helper that keeps the JSON-RPC error code next to the message.
fn provider_failure(err: ProviderError) -> ExternalError {
    let code = err.as_error_response().map(|rpc| rpc.code);
    ExternalError::Failure {
        message: err.to_string(),
        code,
    }
}

fn parse_address(address: &str) -> std::result::Result<Address, ExternalError> {
    Address::from_str(address)
        .map_err(|_| ExternalError::failure(format!("Address \"{}\" is invalid.", address)))
}

fn parse_hash(hash: &str) -> std::result::Result<H256, ExternalError> {
    H256::from_str(hash)
        .map_err(|_| ExternalError::failure(format!("Transaction hash \"{}\" is invalid.", hash)))
}

fn transaction_record(tx: Transaction) -> TransactionRecord {
    TransactionRecord {
        hash: format!("{:#x}", tx.hash),
        from: format!("{:#x}", tx.from),
        to: tx.to.map(|to| format!("{:#x}", to)),
        value: tx.value.to_string(),
        nonce: tx.nonce.low_u64(),
        block_number: tx.block_number.map(|n| n.as_u64()),
        gas: tx.gas.to_string(),
        gas_price: tx.gas_price.map(|p| p.to_string()),
    }
}

fn receipt_record(receipt: TransactionReceipt) -> ReceiptRecord {
    ReceiptRecord {
        transaction_hash: format!("{:#x}", receipt.transaction_hash),
        block_number: receipt.block_number.map(|n| n.as_u64()),
        status: receipt.status.map(|s| s.as_u64()),
        gas_used: receipt.gas_used.map(|g| g.to_string()),
    }
}
