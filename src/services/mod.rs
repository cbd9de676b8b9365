// All service modules
pub mod balance_fetcher;
pub mod balance_query;
pub mod onchain;
pub mod transaction_queries;
pub mod transfer_executor;
pub mod transfer_mutation;
pub mod transfer_service;
pub mod wallet_session;

// Re-export for convenience
pub use balance_fetcher::BalanceFetcher;
pub use balance_query::{BalanceQuery, BalanceRetryPolicy};
pub use onchain::{ChainClient, EthersChainClient};
pub use transaction_queries::TransactionQueries;
pub use transfer_executor::TransferExecutor;
pub use transfer_mutation::{TransferMutation, TransferRetryPolicy};
pub use transfer_service::{MutationState, TransferInput, TransferService};
pub use wallet_session::{WalletSession, WalletSessionFacade};
