use futures_util::future::join;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    error::{describe_error, TransferError, TransferErrorCode},
    integrations::identity::IdentityProvider,
    models::{TransferRequest, TransferResult},
    services::{
        balance_query::BalanceQuery,
        transaction_queries::TransactionQueries,
        transfer_mutation::{TransferMutation, TransferRetryPolicy},
        wallet_session::AuthView,
    },
};

/// What the user typed into a send form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferInput {
    pub recipient: String,
    pub amount: String,
}

impl TransferInput {
    pub fn new(recipient: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            amount: amount.into(),
        }
    }
}

/// Observable state of the most recent transfer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationState {
    pub is_pending: bool,
    pub error: Option<TransferError>,
    pub data: Option<TransferResult>,
    pub failure_count: u32,
}

impl MutationState {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.data.is_some()
    }
}

/// Sends from the signed-in wallet and refreshes dependent caches afterwards.
pub struct TransferService {
    identity: Arc<dyn IdentityProvider>,
    mutation: TransferMutation,
    balances: Arc<BalanceQuery>,
    transactions: Arc<TransactionQueries>,
    state: RwLock<MutationState>,
}

impl TransferService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        mutation: TransferMutation,
        balances: Arc<BalanceQuery>,
        transactions: Arc<TransactionQueries>,
    ) -> Self {
        Self {
            identity,
            mutation,
            balances,
            transactions,
            state: RwLock::new(MutationState::default()),
        }
    }

    pub fn with_policy(mut self, policy: TransferRetryPolicy) -> Self {
        self.mutation = self.mutation.with_policy(policy);
        self
    }

    pub async fn state(&self) -> MutationState {
        self.state.read().await.clone()
    }

    pub async fn is_pending(&self) -> bool {
        self.state.read().await.is_pending
    }

    pub async fn reset(&self) {
        *self.state.write().await = MutationState::default();
    }

    /// Signed in, holding a wallet, and not already sending.
    pub async fn can_transfer(&self) -> bool {
        let view = AuthView::from_state(&self.identity.state());
        view.authenticated && view.address.is_some() && !self.is_pending().await
    }

    /// Sentence for the last failure, if any.
    pub async fn user_friendly_error(&self) -> Option<String> {
        self.state
            .read()
            .await
            .error
            .as_ref()
            .map(|err| describe_error(err))
    }

    pub async fn transfer(&self, input: TransferInput) -> Result<TransferResult, TransferError> {
        {
            let mut state = self.state.write().await;
            state.is_pending = true;
            state.error = None;
        }

        let (result, failure_count) = match self.build_request(input) {
            Ok(request) => {
                let from = request.from.clone();
                let outcome = self.mutation.execute(request).await;
                if let Ok(transfer) = &outcome.result {
                    self.after_success(&from, &transfer.hash).await;
                }
                (outcome.result, outcome.failure_count)
            }
            Err(err) => (Err(err), 1),
        };

        let mut state = self.state.write().await;
        state.is_pending = false;
        state.failure_count = failure_count;
        match &result {
            Ok(transfer) => {
                state.data = Some(transfer.clone());
                state.error = None;
            }
            Err(err) => {
                tracing::warn!("transfer failed code={}: {}", err.code(), err);
                state.data = None;
                state.error = Some(err.clone());
            }
        }
        result
    }

    // Internal helper that turns the session and form input into an executor request.
    fn build_request(&self, input: TransferInput) -> Result<TransferRequest, TransferError> {
        let state = self.identity.state();
        if !state.authenticated {
            return Err(TransferError::new(
                "Please connect your wallet to send transactions",
                TransferErrorCode::NotAuthenticated,
            ));
        }
        let from = AuthView::from_state(&state).address.ok_or_else(|| {
            TransferError::new("No wallet address available", TransferErrorCode::NoWallet)
        })?;

        let mut request = TransferRequest::new(from, input.recipient, input.amount)
            .with_wallets(self.identity.connected_wallets());
        if let Some(sender) = self.identity.transaction_sender() {
            request = request.with_sender(sender);
        }
        Ok(request)
    }

    async fn after_success(&self, from: &str, hash: &str) {
        join(self.balances.invalidate(from), self.transactions.invalidate(hash)).await;
        self.balances.spawn_refresh(from);
        tracing::debug!("caches invalidated after transfer hash={} from={}", hash, from);
    }
}
