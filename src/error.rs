use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Sentence shown when a failure carries nothing recognizable.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    BalanceQuery(#[from] BalanceQueryError),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Transfer(ref err) => (
                transfer_status(err.code()),
                err.code().to_string(),
                err.user_message(),
            ),
            AppError::BalanceQuery(ref err) => (
                balance_status(err.code()),
                err.code().to_string(),
                err.user_message(),
            ),
            AppError::Config(ref msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR".to_string(),
                msg.clone(),
            ),
        };

        let body = Json(ErrorResponse {
            success: false,
            error: ErrorDetail {
                code,
                message,
                details: None,
            },
        });

        (status, body).into_response()
    }
}

fn transfer_status(code: &TransferErrorCode) -> StatusCode {
    match code {
        TransferErrorCode::NetworkError => StatusCode::SERVICE_UNAVAILABLE,
        TransferErrorCode::NotAuthenticated => StatusCode::UNAUTHORIZED,
        TransferErrorCode::FetchTransactionError | TransferErrorCode::ConfirmationError => {
            StatusCode::BAD_GATEWAY
        }
        TransferErrorCode::TransactionError | TransferErrorCode::UnknownError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::BAD_REQUEST,
    }
}

fn balance_status(code: &BalanceErrorCode) -> StatusCode {
    match code {
        BalanceErrorCode::MissingAddress | BalanceErrorCode::InvalidAddress => {
            StatusCode::BAD_REQUEST
        }
        BalanceErrorCode::RateLimit => StatusCode::TOO_MANY_REQUESTS,
        BalanceErrorCode::NetworkError => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

// ==================== COLLABORATOR FAILURES ====================

/// Failure reported by an external collaborator (RPC node, identity provider, wallet).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExternalError {
    /// A proper error: human-readable message plus an optional JSON-RPC / EIP-1193 code.
    #[error("{message}")]
    Failure { message: String, code: Option<i64> },

    /// The collaborator rejected with something that is not an error at all.
    #[error("non-error rejection: {0}")]
    Opaque(serde_json::Value),
}

impl ExternalError {
    pub fn failure(message: impl Into<String>) -> Self {
        ExternalError::Failure {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: i64) -> Self {
        ExternalError::Failure {
            message: message.into(),
            code: Some(code),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ExternalError::Failure { message, .. } => Some(message),
            ExternalError::Opaque(_) => None,
        }
    }

    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            ExternalError::Failure { code, .. } => *code,
            ExternalError::Opaque(_) => None,
        }
    }
}

/// What a classified error wraps: the collaborator failure, or a structured payload.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorCause {
    #[error(transparent)]
    External(#[from] ExternalError),

    #[error("{0}")]
    Details(serde_json::Value),
}

// ==================== TRANSFER TAXONOMY ====================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransferErrorCode {
    InvalidFromAddress,
    InvalidToAddress,
    InvalidAmount,
    SameAddress,
    MissingSendFunction,
    BalanceCheckError,
    InsufficientBalance,
    GasEstimationError,
    NetworkError,
    GasError,
    UserRejected,
    NoWalletConnection,
    TransactionError,
    UnknownError,
    NotAuthenticated,
    NoWallet,
    MissingHash,
    FetchTransactionError,
    ConfirmationError,
    Other(String),
}

impl TransferErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            TransferErrorCode::InvalidFromAddress => "INVALID_FROM_ADDRESS",
            TransferErrorCode::InvalidToAddress => "INVALID_TO_ADDRESS",
            TransferErrorCode::InvalidAmount => "INVALID_AMOUNT",
            TransferErrorCode::SameAddress => "SAME_ADDRESS",
            TransferErrorCode::MissingSendFunction => "MISSING_SEND_FUNCTION",
            TransferErrorCode::BalanceCheckError => "BALANCE_CHECK_ERROR",
            TransferErrorCode::InsufficientBalance => "INSUFFICIENT_BALANCE",
            TransferErrorCode::GasEstimationError => "GAS_ESTIMATION_ERROR",
            TransferErrorCode::NetworkError => "NETWORK_ERROR",
            TransferErrorCode::GasError => "GAS_ERROR",
            TransferErrorCode::UserRejected => "USER_REJECTED",
            TransferErrorCode::NoWalletConnection => "NO_WALLET_CONNECTION",
            TransferErrorCode::TransactionError => "TRANSACTION_ERROR",
            TransferErrorCode::UnknownError => "UNKNOWN_ERROR",
            TransferErrorCode::NotAuthenticated => "NOT_AUTHENTICATED",
            TransferErrorCode::NoWallet => "NO_WALLET",
            TransferErrorCode::MissingHash => "MISSING_HASH",
            TransferErrorCode::FetchTransactionError => "FETCH_TRANSACTION_ERROR",
            TransferErrorCode::ConfirmationError => "CONFIRMATION_ERROR",
            TransferErrorCode::Other(code) => code,
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "INVALID_FROM_ADDRESS" => TransferErrorCode::InvalidFromAddress,
            "INVALID_TO_ADDRESS" => TransferErrorCode::InvalidToAddress,
            "INVALID_AMOUNT" => TransferErrorCode::InvalidAmount,
            "SAME_ADDRESS" => TransferErrorCode::SameAddress,
            "MISSING_SEND_FUNCTION" => TransferErrorCode::MissingSendFunction,
            "BALANCE_CHECK_ERROR" => TransferErrorCode::BalanceCheckError,
            "INSUFFICIENT_BALANCE" => TransferErrorCode::InsufficientBalance,
            "GAS_ESTIMATION_ERROR" => TransferErrorCode::GasEstimationError,
            "NETWORK_ERROR" => TransferErrorCode::NetworkError,
            "GAS_ERROR" => TransferErrorCode::GasError,
            "USER_REJECTED" => TransferErrorCode::UserRejected,
            "NO_WALLET_CONNECTION" => TransferErrorCode::NoWalletConnection,
            "TRANSACTION_ERROR" => TransferErrorCode::TransactionError,
            "UNKNOWN_ERROR" => TransferErrorCode::UnknownError,
            "NOT_AUTHENTICATED" => TransferErrorCode::NotAuthenticated,
            "NO_WALLET" => TransferErrorCode::NoWallet,
            "MISSING_HASH" => TransferErrorCode::MissingHash,
            "FETCH_TRANSACTION_ERROR" => TransferErrorCode::FetchTransactionError,
            "CONFIRMATION_ERROR" => TransferErrorCode::ConfirmationError,
            other => TransferErrorCode::Other(other.to_string()),
        }
    }

    /// Fixed user-facing sentence for codes that have one.
    pub fn friendly_message(&self) -> Option<&'static str> {
        let message = match self {
            TransferErrorCode::InvalidFromAddress => "Invalid sender address",
            TransferErrorCode::InvalidToAddress => "Please enter a valid recipient address",
            TransferErrorCode::InvalidAmount => "Please enter a valid amount greater than 0",
            TransferErrorCode::SameAddress => "Cannot send funds to yourself",
            TransferErrorCode::InsufficientBalance => "Insufficient balance for this transaction",
            TransferErrorCode::GasEstimationError => "Unable to estimate transaction cost",
            TransferErrorCode::GasError => "Transaction failed due to gas issues",
            TransferErrorCode::UserRejected => "Transaction was cancelled",
            TransferErrorCode::NetworkError => {
                "Network error. Please check your connection and try again"
            }
            TransferErrorCode::ConfirmationError => "Transaction confirmation failed or timed out",
            TransferErrorCode::MissingSendFunction => {
                "Wallet connection error. Please reconnect your wallet"
            }
            TransferErrorCode::NoWalletConnection => {
                "No connected wallet found. Please connect your wallet"
            }
            _ => return None,
        };
        Some(message)
    }
}

impl fmt::Display for TransferErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TransferErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Classified failure of a transfer or of a transaction lookup.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct TransferError {
    message: String,
    code: TransferErrorCode,
    #[source]
    cause: Option<ErrorCause>,
}

impl TransferError {
    pub fn new(message: impl Into<String>, code: TransferErrorCode) -> Self {
        Self {
            message: message.into(),
            code,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<ErrorCause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn with_details(self, details: serde_json::Value) -> Self {
        self.with_cause(ErrorCause::Details(details))
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> &TransferErrorCode {
        &self.code
    }

    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }

    /// Sentence for display; unknown codes fall back to the raw message.
    pub fn user_message(&self) -> String {
        self.code
            .friendly_message()
            .map(str::to_string)
            .unwrap_or_else(|| self.message.clone())
    }
}

// ==================== BALANCE QUERY TAXONOMY ====================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BalanceErrorCode {
    MissingAddress,
    InvalidAddress,
    NetworkError,
    RateLimit,
    FetchError,
    UnknownError,
    Other(String),
}

impl BalanceErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            BalanceErrorCode::MissingAddress => "MISSING_ADDRESS",
            BalanceErrorCode::InvalidAddress => "INVALID_ADDRESS",
            BalanceErrorCode::NetworkError => "NETWORK_ERROR",
            BalanceErrorCode::RateLimit => "RATE_LIMIT",
            BalanceErrorCode::FetchError => "FETCH_ERROR",
            BalanceErrorCode::UnknownError => "UNKNOWN_ERROR",
            BalanceErrorCode::Other(code) => code,
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "MISSING_ADDRESS" => BalanceErrorCode::MissingAddress,
            "INVALID_ADDRESS" => BalanceErrorCode::InvalidAddress,
            "NETWORK_ERROR" => BalanceErrorCode::NetworkError,
            "RATE_LIMIT" => BalanceErrorCode::RateLimit,
            "FETCH_ERROR" => BalanceErrorCode::FetchError,
            "UNKNOWN_ERROR" => BalanceErrorCode::UnknownError,
            other => BalanceErrorCode::Other(other.to_string()),
        }
    }

    pub fn friendly_message(&self) -> Option<&'static str> {
        let message = match self {
            BalanceErrorCode::MissingAddress => "Please connect your wallet to view balance",
            BalanceErrorCode::InvalidAddress => "Invalid wallet address",
            BalanceErrorCode::NetworkError => {
                "Network connection error. Please check your internet connection."
            }
            BalanceErrorCode::RateLimit => "Too many requests. Please wait a moment and try again.",
            _ => return None,
        };
        Some(message)
    }
}

impl fmt::Display for BalanceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BalanceErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Classified failure of a balance lookup.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct BalanceQueryError {
    message: String,
    code: BalanceErrorCode,
    #[source]
    cause: Option<ErrorCause>,
}

impl BalanceQueryError {
    pub fn new(message: impl Into<String>, code: BalanceErrorCode) -> Self {
        Self {
            message: message.into(),
            code,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<ErrorCause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn with_details(self, details: serde_json::Value) -> Self {
        self.with_cause(ErrorCause::Details(details))
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> &BalanceErrorCode {
        &self.code
    }

    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }

    pub fn user_message(&self) -> String {
        self.code
            .friendly_message()
            .map(str::to_string)
            .unwrap_or_else(|| self.message.clone())
    }
}

// ==================== CLASSIFIER ====================

/// Maps any failure to the sentence a display layer should show.
///
/// Taxonomy errors go through their code table, other errors keep their own
/// message, and anything without a usable message gets the generic sentence.
pub fn describe_error(error: &(dyn std::error::Error + 'static)) -> String {
    if let Some(err) = error.downcast_ref::<TransferError>() {
        return err.user_message();
    }
    if let Some(err) = error.downcast_ref::<BalanceQueryError>() {
        return err.user_message();
    }
    if let Some(app) = error.downcast_ref::<AppError>() {
        match app {
            AppError::Transfer(err) => return err.user_message(),
            AppError::BalanceQuery(err) => return err.user_message(),
            _ => {}
        }
    }
    if let Some(ExternalError::Opaque(_)) = error.downcast_ref::<ExternalError>() {
        return UNEXPECTED_ERROR_MESSAGE.to_string();
    }

    let message = error.to_string();
    if message.trim().is_empty() {
        UNEXPECTED_ERROR_MESSAGE.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_codes_map_to_fixed_sentences() {
        let cases = [
            ("INVALID_FROM_ADDRESS", "Invalid sender address"),
            ("INVALID_TO_ADDRESS", "Please enter a valid recipient address"),
            ("INVALID_AMOUNT", "Please enter a valid amount greater than 0"),
            ("SAME_ADDRESS", "Cannot send funds to yourself"),
            ("INSUFFICIENT_BALANCE", "Insufficient balance for this transaction"),
            ("USER_REJECTED", "Transaction was cancelled"),
            (
                "NETWORK_ERROR",
                "Network error. Please check your connection and try again",
            ),
            (
                "MISSING_SEND_FUNCTION",
                "Wallet connection error. Please reconnect your wallet",
            ),
            (
                "NO_WALLET_CONNECTION",
                "No connected wallet found. Please connect your wallet",
            ),
        ];
        for (code, expected) in cases {
            let err = TransferError::new("Original message", TransferErrorCode::from_code(code));
            assert_eq!(describe_error(&err), expected, "code {}", code);
        }
    }

    #[test]
    fn unknown_transfer_code_keeps_message() {
        let err = TransferError::new("Custom message", TransferErrorCode::from_code("UNKNOWN_CODE"));
        assert_eq!(err.code().as_str(), "UNKNOWN_CODE");
        assert_eq!(describe_error(&err), "Custom message");
    }

    #[test]
    fn balance_codes_map_to_fixed_sentences() {
        let err = BalanceQueryError::new("boom", BalanceErrorCode::RateLimit);
        assert_eq!(
            describe_error(&err),
            "Too many requests. Please wait a moment and try again."
        );
        let err = BalanceQueryError::new("Failed to fetch wallet balance: boom", BalanceErrorCode::FetchError);
        assert_eq!(describe_error(&err), "Failed to fetch wallet balance: boom");
    }

    #[test]
    fn app_errors_map_to_http_status() {
        let response = AppError::Config("Invalid EVM RPC URL".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let response =
            AppError::from(TransferError::new("x", TransferErrorCode::NotAuthenticated)).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn plain_errors_keep_their_message() {
        let err = ExternalError::failure("Regular error");
        assert_eq!(describe_error(&err), "Regular error");
    }

    #[test]
    fn shapeless_failures_get_generic_sentence() {
        let err = ExternalError::Opaque(serde_json::json!({}));
        assert_eq!(describe_error(&err), UNEXPECTED_ERROR_MESSAGE);
        let err = ExternalError::failure("  ");
        assert_eq!(describe_error(&err), UNEXPECTED_ERROR_MESSAGE);
    }

    #[test]
    fn code_text_round_trips_through_from_code() {
        for code in ["SAME_ADDRESS", "GAS_ERROR", "CONFIRMATION_ERROR", "SOMETHING_NEW"] {
            assert_eq!(TransferErrorCode::from_code(code).as_str(), code);
        }
        for code in ["MISSING_ADDRESS", "RATE_LIMIT", "SOMETHING_NEW"] {
            assert_eq!(BalanceErrorCode::from_code(code).as_str(), code);
        }
    }

    #[test]
    fn cause_is_exposed_as_source() {
        let err = TransferError::new("Failed to check balance", TransferErrorCode::BalanceCheckError)
            .with_cause(ExternalError::failure("connection refused"));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("connection refused"));
    }
}
