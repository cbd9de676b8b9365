/// Application constants

// Native unit
pub const NATIVE_DECIMALS: u32 = 18;
pub const NATIVE_SYMBOL: &str = "ETH";

// Address shape
pub const ADDRESS_PREFIX: &str = "0x";
pub const ADDRESS_TEXT_LENGTH: usize = 42;

// Chains
pub const CHAIN_ID_MAINNET: u64 = 1;
pub const CHAIN_ID_SEPOLIA: u64 = 11_155_111;
pub const CHAIN_ID_GOERLI: u64 = 5;
pub const DEFAULT_SEPOLIA_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";

// Balance query policy
pub const BALANCE_STALE_SECS: u64 = 30;
pub const BALANCE_GC_SECS: u64 = 300;
pub const BALANCE_NETWORK_RETRIES: u32 = 3;
pub const BALANCE_DEFAULT_RETRIES: u32 = 2;
pub const BALANCE_RETRY_MAX_DELAY_MS: u64 = 30_000;

// Transfer mutation policy
pub const TRANSFER_NETWORK_RETRIES: u32 = 2;
pub const TRANSFER_RETRY_MAX_DELAY_MS: u64 = 10_000;

// Transaction lookups
pub const TX_DETAIL_STALE_SECS: u64 = 300;
pub const TX_DETAIL_GC_SECS: u64 = 1_800;
pub const TX_DETAIL_RETRY_MAX_DELAY_MS: u64 = 30_000;
pub const TX_CONFIRMATION_GC_SECS: u64 = 3_600;
pub const TX_CONFIRMATION_RETRY_DELAY_MS: u64 = 5_000;
pub const RECEIPT_TIMEOUT_SECS: u64 = 60;
pub const RECEIPT_POLL_INTERVAL_MS: u64 = 2_000;

// Shared backoff base
pub const RETRY_BASE_DELAY_MS: u64 = 1_000;

// Background cache sweeper
pub const CACHE_SWEEP_INTERVAL_SECS: u64 = 60;

// API version
pub const API_VERSION: &str = "v1";
