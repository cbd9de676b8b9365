use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{CHAIN_ID_GOERLI, CHAIN_ID_MAINNET, CHAIN_ID_SEPOLIA};

const TX_PATH_MARKER: &str = "/tx/";
const TX_HASH_HEX_LENGTH: usize = 64;

/// Etherscan deployments links can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplorerNetwork {
    Mainnet,
    #[default]
    Sepolia,
    Goerli,
}

impl ExplorerNetwork {
    pub const ALL: [ExplorerNetwork; 3] = [
        ExplorerNetwork::Mainnet,
        ExplorerNetwork::Sepolia,
        ExplorerNetwork::Goerli,
    ];

    pub fn base_url(&self) -> &'static str {
        match self {
            ExplorerNetwork::Mainnet => "https://etherscan.io",
            ExplorerNetwork::Sepolia => "https://sepolia.etherscan.io",
            ExplorerNetwork::Goerli => "https://goerli.etherscan.io",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExplorerNetwork::Mainnet => "mainnet",
            ExplorerNetwork::Sepolia => "sepolia",
            ExplorerNetwork::Goerli => "goerli",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            ExplorerNetwork::Mainnet => CHAIN_ID_MAINNET,
            ExplorerNetwork::Sepolia => CHAIN_ID_SEPOLIA,
            ExplorerNetwork::Goerli => CHAIN_ID_GOERLI,
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|network| network.chain_id() == chain_id)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Some(ExplorerNetwork::Mainnet),
            "sepolia" => Some(ExplorerNetwork::Sepolia),
            "goerli" => Some(ExplorerNetwork::Goerli),
            _ => None,
        }
    }

    pub fn transaction_url(&self, hash: &str) -> String {
        format!("{}/tx/{}", self.base_url(), hash)
    }

    pub fn address_url(&self, address: &str) -> String {
        format!("{}/address/{}", self.base_url(), address)
    }

    pub fn block_url(&self, block: impl fmt::Display) -> String {
        format!("{}/block/{}", self.base_url(), block)
    }
}

impl fmt::Display for ExplorerNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pulls the first `/tx/0x<64 hex>` transaction hash out of a link.
pub fn extract_hash_from_url(link: &str) -> Option<String> {
    link.match_indices(TX_PATH_MARKER).find_map(|(index, _)| {
        let candidate = &link[index + TX_PATH_MARKER.len()..];
        let hex = candidate.strip_prefix("0x")?;
        let digits = hex.get(..TX_HASH_HEX_LENGTH)?;
        if digits.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(format!("0x{}", digits))
        } else {
            None
        }
    })
}

/// True when the link parses and its host is one of the known explorers.
pub fn is_explorer_url(link: &str) -> bool {
    let Ok(parsed) = url::Url::parse(link) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    ExplorerNetwork::ALL.iter().any(|network| {
        url::Url::parse(network.base_url())
            .ok()
            .and_then(|base| base.host_str().map(|h| h == host))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TX_HASH: &str = "0x0c88ac23d080c2037f0ede407b122f8ee4f1fd3f54f634b46b7f37c0041a3540";
    const ADDRESS: &str = "0x742d35Cc6634C0532925a3b8D6ad54EfC04cb2c2";

    #[test]
    fn builds_links_per_network() {
        let sepolia = ExplorerNetwork::default();
        assert_eq!(
            sepolia.transaction_url(TX_HASH),
            format!("https://sepolia.etherscan.io/tx/{}", TX_HASH)
        );
        assert_eq!(
            ExplorerNetwork::Mainnet.address_url(ADDRESS),
            format!("https://etherscan.io/address/{}", ADDRESS)
        );
        assert_eq!(
            ExplorerNetwork::Goerli.block_url(98765),
            "https://goerli.etherscan.io/block/98765"
        );
        assert_eq!(
            ExplorerNetwork::Mainnet.block_url("12345678"),
            "https://etherscan.io/block/12345678"
        );
    }

    #[test]
    fn maps_chain_ids_both_ways() {
        assert_eq!(ExplorerNetwork::from_chain_id(11155111), Some(ExplorerNetwork::Sepolia));
        assert_eq!(ExplorerNetwork::from_chain_id(5), Some(ExplorerNetwork::Goerli));
        assert_eq!(ExplorerNetwork::from_chain_id(1), Some(ExplorerNetwork::Mainnet));
        assert_eq!(ExplorerNetwork::from_chain_id(31337), None);
    }

    #[test]
    fn extracts_hash_from_transaction_links() {
        let link = format!("https://sepolia.etherscan.io/tx/{}", TX_HASH);
        assert_eq!(extract_hash_from_url(&link).as_deref(), Some(TX_HASH));

        let with_query = format!("https://etherscan.io/tx/{}?tab=logs", TX_HASH);
        assert_eq!(extract_hash_from_url(&with_query).as_deref(), Some(TX_HASH));
    }

    #[test]
    fn rejects_links_without_full_hash() {
        assert_eq!(extract_hash_from_url("https://etherscan.io/tx/0x1234"), None);
        assert_eq!(
            extract_hash_from_url(&format!("https://etherscan.io/address/{}", ADDRESS)),
            None
        );
        assert_eq!(extract_hash_from_url("not a url"), None);
    }

    #[test]
    fn recognizes_explorer_hosts() {
        assert!(is_explorer_url("https://etherscan.io/tx/0x1"));
        assert!(is_explorer_url("https://sepolia.etherscan.io/address/0x1"));
        assert!(is_explorer_url("https://goerli.etherscan.io"));
        assert!(!is_explorer_url("https://google.com"));
        assert!(!is_explorer_url("not-a-url"));
        assert!(!is_explorer_url(""));
    }

    #[test]
    fn parses_network_names() {
        assert_eq!(ExplorerNetwork::from_name("Sepolia"), Some(ExplorerNetwork::Sepolia));
        assert_eq!(ExplorerNetwork::from_name("ropsten"), None);
    }
}
