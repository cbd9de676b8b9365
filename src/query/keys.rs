use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryNamespace {
    Wallet,
    Transaction,
}

impl QueryNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryNamespace::Wallet => "wallet",
            QueryNamespace::Transaction => "transaction",
        }
    }
}

/// Cache key. Identifiers are stored lower-cased so spelling differences share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    WalletBalance(String),
    TransactionDetail(String),
    TransactionConfirmation(String),
}

impl QueryKey {
    pub fn wallet_balance(address: &str) -> Self {
        QueryKey::WalletBalance(normalize(address))
    }

    pub fn transaction_detail(hash: &str) -> Self {
        QueryKey::TransactionDetail(normalize(hash))
    }

    pub fn transaction_confirmation(hash: &str) -> Self {
        QueryKey::TransactionConfirmation(normalize(hash))
    }

    /// Every entry a new or changed transaction hash can affect.
    pub fn transaction_keys(hash: &str) -> [QueryKey; 2] {
        [
            QueryKey::transaction_detail(hash),
            QueryKey::transaction_confirmation(hash),
        ]
    }

    pub fn namespace(&self) -> QueryNamespace {
        match self {
            QueryKey::WalletBalance(_) => QueryNamespace::Wallet,
            QueryKey::TransactionDetail(_) | QueryKey::TransactionConfirmation(_) => {
                QueryNamespace::Transaction
            }
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::WalletBalance(address) => write!(f, "wallet:balance:{}", address),
            QueryKey::TransactionDetail(hash) => write!(f, "transaction:detail:{}", hash),
            QueryKey::TransactionConfirmation(hash) => {
                write!(f, "transaction:confirmation:{}", hash)
            }
        }
    }
}

// Internal helper that parses or transforms values for cache keys.
fn normalize(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_ignore_case_and_whitespace() {
        assert_eq!(
            QueryKey::wallet_balance(" 0xABCdef0000000000000000000000000000000001 "),
            QueryKey::wallet_balance("0xabcdef0000000000000000000000000000000001")
        );
    }

    #[test]
    fn keys_belong_to_their_namespace() {
        assert_eq!(QueryKey::wallet_balance("0x1").namespace(), QueryNamespace::Wallet);
        for key in QueryKey::transaction_keys("0xABC") {
            assert_eq!(key.namespace(), QueryNamespace::Transaction);
        }
        assert_eq!(
            QueryKey::transaction_confirmation("0xABC").to_string(),
            "transaction:confirmation:0xabc"
        );
    }
}
