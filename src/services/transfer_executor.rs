use chrono::Utc;
use ethers::types::U256;
use serde_json::json;
use std::sync::Arc;

use crate::{
    amount::parse_native_amount,
    error::{ExternalError, TransferError, TransferErrorCode},
    integrations::identity::{ConnectedWallet, TransactionSender},
    models::{SendTransactionRequest, TransferRequest, TransferResult, WalletAddress},
    services::onchain::ChainClient,
};

// EIP-1193 "user rejected request".
const USER_REJECTED_RPC_CODE: i64 = 4001;
const EMBEDDED_WALLET_SIGNAL: &str = "embedded wallet";

#[derive(Clone, Copy)]
enum SendFailureKind {
    Network,
    Gas,
    Rejected,
}

// Checked in order; the first matching substring decides.
const SEND_FAILURE_RULES: &[(&str, SendFailureKind)] = &[
    ("network", SendFailureKind::Network),
    ("timeout", SendFailureKind::Network),
    ("gas", SendFailureKind::Gas),
    ("limit", SendFailureKind::Gas),
    ("rejected", SendFailureKind::Rejected),
    ("denied", SendFailureKind::Rejected),
];

/// Capability a transaction is submitted through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPath {
    /// The identity provider's own send primitive.
    EmbeddedSender,
    /// Raw `eth_sendTransaction` on the connected wallet that owns the sender address.
    ConnectedWallet,
}

impl SendPath {
    /// Path to try after `err`, if the failure is one the next path can work around.
    fn fallback(self, err: &ExternalError) -> Option<SendPath> {
        match self {
            SendPath::EmbeddedSender if is_embedded_wallet_unavailable(err) => {
                Some(SendPath::ConnectedWallet)
            }
            _ => None,
        }
    }
}

enum SendFailure {
    Rejected(ExternalError),
    Classified(TransferError),
}

/// Request that passed validation, with the amount already in the smallest unit.
struct ValidatedTransfer {
    from: WalletAddress,
    to: WalletAddress,
    amount: String,
    value: U256,
    sender: Arc<dyn TransactionSender>,
}

/// Validates, checks funds, estimates gas, then submits a native-value transfer.
///
/// Steps run strictly in sequence for one request. Nothing is retried here;
/// retries belong to the mutation policy.
pub struct TransferExecutor {
    client: Arc<dyn ChainClient>,
}

impl TransferExecutor {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }

    pub async fn send_transfer(&self, request: TransferRequest) -> Result<TransferResult, TransferError> {
        let transfer = validate_transfer(&request)?;

        self.check_sufficient_balance(&transfer).await?;
        self.estimate_transaction_cost(&transfer).await?;
        let hash = self.submit(&transfer, &request.wallets).await?;

        tracing::info!(
            "transfer submitted hash={} from={} to={} amount={}",
            hash,
            transfer.from,
            transfer.to,
            transfer.amount
        );
        Ok(TransferResult {
            hash,
            from: transfer.from.into_string(),
            to: transfer.to.into_string(),
            amount: transfer.amount,
            timestamp: Utc::now(),
        })
    }

    async fn check_sufficient_balance(&self, transfer: &ValidatedTransfer) -> Result<(), TransferError> {
        let balance = self.client.get_balance(transfer.from.as_str()).await.map_err(|e| {
            TransferError::new("Failed to check balance", TransferErrorCode::BalanceCheckError)
                .with_cause(e)
        })?;

        if balance < transfer.value {
            return Err(TransferError::new(
                "Insufficient balance for transaction",
                TransferErrorCode::InsufficientBalance,
            )
            .with_details(json!({
                "balance": balance.to_string(),
                "required": transfer.value.to_string(),
            })));
        }
        Ok(())
    }

    // Advisory only: the estimate is logged, never enforced.
    async fn estimate_transaction_cost(&self, transfer: &ValidatedTransfer) -> Result<U256, TransferError> {
        let gas_failure = |e: ExternalError| {
            TransferError::new("Failed to estimate gas", TransferErrorCode::GasEstimationError)
                .with_cause(e)
        };
        let gas = self
            .client
            .estimate_gas(transfer.from.as_str(), transfer.to.as_str(), transfer.value)
            .await
            .map_err(gas_failure)?;
        let gas_price = self.client.get_gas_price().await.map_err(gas_failure)?;
        let estimated_cost = gas.saturating_mul(gas_price);
        tracing::debug!(
            "gas estimate from={} gas={} gas_price={} cost={}",
            transfer.from,
            gas,
            gas_price,
            estimated_cost
        );
        Ok(estimated_cost)
    }

    async fn submit(
        &self,
        transfer: &ValidatedTransfer,
        wallets: &[Arc<dyn ConnectedWallet>],
    ) -> Result<String, TransferError> {
        let mut path = SendPath::EmbeddedSender;
        loop {
            let attempt = match path {
                SendPath::EmbeddedSender => self.send_embedded(transfer).await,
                SendPath::ConnectedWallet => self.send_connected(transfer, wallets).await,
            };
            match attempt {
                Ok(hash) => return Ok(hash),
                Err(SendFailure::Classified(err)) => return Err(err),
                Err(SendFailure::Rejected(err)) => match path.fallback(&err) {
                    Some(next) => {
                        tracing::warn!(
                            "{:?} unavailable for {} ({}), trying {:?}",
                            path,
                            transfer.from,
                            err,
                            next
                        );
                        path = next;
                    }
                    None => return Err(classify_send_failure(err)),
                },
            }
        }
    }

    async fn send_embedded(&self, transfer: &ValidatedTransfer) -> Result<String, SendFailure> {
        let request = SendTransactionRequest {
            to: transfer.to.to_string(),
            value: transfer.value.to_string(),
        };
        transfer
            .sender
            .send_transaction(request)
            .await
            .map(|response| response.hash)
            .map_err(SendFailure::Rejected)
    }

    async fn send_connected(
        &self,
        transfer: &ValidatedTransfer,
        wallets: &[Arc<dyn ConnectedWallet>],
    ) -> Result<String, SendFailure> {
        let wallet = wallets
            .iter()
            .find(|w| transfer.from.matches(w.address()))
            .ok_or_else(|| {
                SendFailure::Classified(TransferError::new(
                    "No connected wallet found",
                    TransferErrorCode::NoWalletConnection,
                ))
            })?;

        let provider = wallet.provider().await.map_err(SendFailure::Rejected)?;
        let params = json!([{
            "from": transfer.from,
            "to": transfer.to,
            "value": format!("0x{:x}", transfer.value),
        }]);
        let result = provider
            .request("eth_sendTransaction", params)
            .await
            .map_err(SendFailure::Rejected)?;

        match result.as_str() {
            Some(hash) if !hash.is_empty() => Ok(hash.to_string()),
            _ => Err(SendFailure::Classified(
                TransferError::new(
                    "Transaction failed: wallet returned no transaction hash",
                    TransferErrorCode::TransactionError,
                )
                .with_details(result),
            )),
        }
    }
}

// Internal helper that applies the ordered validation checks; the first failure wins.
fn validate_transfer(request: &TransferRequest) -> Result<ValidatedTransfer, TransferError> {
    let TransferRequest {
        from, to, amount, ..
    } = request;

    let from_address = WalletAddress::parse(from).ok_or_else(|| {
        TransferError::new("Invalid sender address", TransferErrorCode::InvalidFromAddress)
            .with_details(json!({ "from": from }))
    })?;
    let to_address = WalletAddress::parse(to).ok_or_else(|| {
        TransferError::new("Invalid recipient address", TransferErrorCode::InvalidToAddress)
            .with_details(json!({ "to": to }))
    })?;

    let positive = amount
        .trim()
        .parse::<f64>()
        .map(|n| n.is_finite() && n > 0.0)
        .unwrap_or(false);
    let value = parse_native_amount(amount).filter(|v| !v.is_zero());
    let value = match value {
        Some(value) if positive => value,
        _ => {
            return Err(TransferError::new(
                "Invalid amount: must be a positive number",
                TransferErrorCode::InvalidAmount,
            )
            .with_details(json!({ "amount": amount })))
        }
    };

    if from_address == to_address {
        return Err(
            TransferError::new("Cannot send to the same address", TransferErrorCode::SameAddress)
                .with_details(json!({ "from": from, "to": to })),
        );
    }

    let sender = request.sender.clone().ok_or_else(|| {
        TransferError::new(
            "Send transaction function is required",
            TransferErrorCode::MissingSendFunction,
        )
    })?;

    Ok(ValidatedTransfer {
        from: from_address,
        to: to_address,
        amount: amount.clone(),
        value,
        sender,
    })
}

fn is_embedded_wallet_unavailable(err: &ExternalError) -> bool {
    err.message()
        .is_some_and(|m| m.to_ascii_lowercase().contains(EMBEDDED_WALLET_SIGNAL))
}

/// Maps a send failure onto the transfer taxonomy, keeping it as the cause.
pub fn classify_send_failure(err: ExternalError) -> TransferError {
    let message = match &err {
        ExternalError::Failure { message, .. } => message.clone(),
        ExternalError::Opaque(_) => {
            return TransferError::new(
                "Unknown error occurred during transaction",
                TransferErrorCode::UnknownError,
            )
            .with_cause(err);
        }
    };

    let kind = if err.rpc_code() == Some(USER_REJECTED_RPC_CODE) {
        Some(SendFailureKind::Rejected)
    } else {
        SEND_FAILURE_RULES
            .iter()
            .find(|(needle, _)| message.contains(*needle))
            .map(|(_, kind)| *kind)
    };

    let classified = match kind {
        Some(SendFailureKind::Network) => {
            TransferError::new("Network error during transaction", TransferErrorCode::NetworkError)
        }
        Some(SendFailureKind::Gas) => {
            TransferError::new("Transaction failed due to gas issues", TransferErrorCode::GasError)
        }
        Some(SendFailureKind::Rejected) => {
            TransferError::new("Transaction was rejected by user", TransferErrorCode::UserRejected)
        }
        None => TransferError::new(
            format!("Transaction failed: {}", message),
            TransferErrorCode::TransactionError,
        ),
    };
    classified.with_cause(err)
}
