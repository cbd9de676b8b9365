// src/models/mod.rs
pub mod response;
pub mod transfer;
pub mod wallet;

// Re-export commonly used types so other modules can use `crate::models::X`
pub use response::ApiResponse;
pub use transfer::{
    ReceiptRecord, SendTransactionRequest, SendTransactionResponse, TransactionRecord,
    TransferRequest, TransferResult,
};
pub use wallet::{has_address_shape, AuthState, AuthUser, LinkedWallet, WalletAddress};
