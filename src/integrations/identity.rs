use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ExternalError;
use crate::models::{AuthState, SendTransactionRequest, SendTransactionResponse};

/// Embedded send primitive exposed by the identity provider.
///
/// Rejects with a message containing "embedded wallet" when the user has no
/// provider-managed wallet; the executor then falls back to a connected wallet.
#[async_trait]
pub trait TransactionSender: Send + Sync {
    async fn send_transaction(
        &self,
        request: SendTransactionRequest,
    ) -> Result<SendTransactionResponse, ExternalError>;
}

/// Raw EIP-1193 `request({method, params})` channel of an external wallet.
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ExternalError>;
}

/// Wallet the user connected through the identity provider.
#[async_trait]
pub trait ConnectedWallet: Send + Sync {
    fn address(&self) -> &str;

    async fn provider(&self) -> Result<Arc<dyn Eip1193Provider>, ExternalError>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn state(&self) -> AuthState;

    async fn login(&self) -> Result<(), ExternalError>;

    async fn logout(&self) -> Result<(), ExternalError>;

    /// `None` while the provider cannot send on the user's behalf.
    fn transaction_sender(&self) -> Option<Arc<dyn TransactionSender>>;

    fn connected_wallets(&self) -> Vec<Arc<dyn ConnectedWallet>>;
}
