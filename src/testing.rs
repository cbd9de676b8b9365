//! Scriptable fakes for the chain client and identity provider seams.

use async_trait::async_trait;
use ethers::types::U256;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::ExternalError;
use crate::integrations::identity::{
    ConnectedWallet, Eip1193Provider, IdentityProvider, TransactionSender,
};
use crate::models::{
    AuthState, AuthUser, LinkedWallet, ReceiptRecord, SendTransactionRequest,
    SendTransactionResponse, TransactionRecord,
};
use crate::services::onchain::ChainClient;

pub const ALICE: &str = "0x1111111111111111111111111111111111111111";
pub const BOB: &str = "0x2222222222222222222222222222222222222222";
pub const TX_HASH: &str = "0x0c88ac23d080c2037f0ede407b122f8ee4f1fd3f54f634b46b7f37c0041a3540";

pub fn ether(whole: u64) -> U256 {
    U256::from(whole) * U256::exp10(18)
}

pub fn milli_ether(milli: u64) -> U256 {
    U256::from(milli) * U256::exp10(15)
}

// Pops the next scripted outcome, repeating the last one once the script runs dry.
fn next<T: Clone>(script: &Mutex<VecDeque<T>>) -> T {
    let mut guard = script.lock().unwrap();
    if guard.len() > 1 {
        guard.pop_front().unwrap()
    } else {
        guard.front().cloned().expect("fake has no scripted response")
    }
}

pub struct FakeChainClient {
    pub balance_calls: AtomicU32,
    pub estimate_calls: AtomicU32,
    pub gas_price_calls: AtomicU32,
    pub transaction_calls: AtomicU32,
    pub receipt_calls: AtomicU32,
    balances: Mutex<VecDeque<Result<U256, ExternalError>>>,
    gas: Mutex<VecDeque<Result<U256, ExternalError>>>,
    gas_price: Mutex<VecDeque<Result<U256, ExternalError>>>,
    transactions: Mutex<VecDeque<Result<Option<TransactionRecord>, ExternalError>>>,
    receipts: Mutex<VecDeque<Result<ReceiptRecord, ExternalError>>>,
}

impl Default for FakeChainClient {
    fn default() -> Self {
        Self {
            balance_calls: AtomicU32::new(0),
            estimate_calls: AtomicU32::new(0),
            gas_price_calls: AtomicU32::new(0),
            transaction_calls: AtomicU32::new(0),
            receipt_calls: AtomicU32::new(0),
            balances: Mutex::new(VecDeque::from([Ok(ether(10))])),
            gas: Mutex::new(VecDeque::from([Ok(U256::from(21_000u64))])),
            gas_price: Mutex::new(VecDeque::from([Ok(U256::from(1_000_000_000u64))])),
            transactions: Mutex::new(VecDeque::from([Ok(Some(sample_transaction(TX_HASH)))])),
            receipts: Mutex::new(VecDeque::from([Ok(sample_receipt(TX_HASH))])),
        }
    }
}

impl FakeChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(self, balance: U256) -> Self {
        self.with_balances(vec![Ok(balance)])
    }

    pub fn with_balances(self, script: Vec<Result<U256, ExternalError>>) -> Self {
        *self.balances.lock().unwrap() = script.into();
        self
    }

    pub fn with_gas(self, script: Vec<Result<U256, ExternalError>>) -> Self {
        *self.gas.lock().unwrap() = script.into();
        self
    }

    pub fn with_transactions(
        self,
        script: Vec<Result<Option<TransactionRecord>, ExternalError>>,
    ) -> Self {
        *self.transactions.lock().unwrap() = script.into();
        self
    }

    pub fn with_receipts(self, script: Vec<Result<ReceiptRecord, ExternalError>>) -> Self {
        *self.receipts.lock().unwrap() = script.into();
        self
    }

    pub fn balance_calls(&self) -> u32 {
        self.balance_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> u32 {
        self.balance_calls.load(Ordering::SeqCst)
            + self.estimate_calls.load(Ordering::SeqCst)
            + self.gas_price_calls.load(Ordering::SeqCst)
            + self.transaction_calls.load(Ordering::SeqCst)
            + self.receipt_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for FakeChainClient {
    async fn get_balance(&self, _address: &str) -> Result<U256, ExternalError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.balances)
    }

    async fn estimate_gas(&self, _from: &str, _to: &str, _value: U256) -> Result<U256, ExternalError> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.gas)
    }

    async fn get_gas_price(&self) -> Result<U256, ExternalError> {
        self.gas_price_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.gas_price)
    }

    async fn get_transaction(&self, _hash: &str) -> Result<Option<TransactionRecord>, ExternalError> {
        self.transaction_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.transactions)
    }

    async fn wait_for_transaction_receipt(
        &self,
        _hash: &str,
        _timeout: Duration,
    ) -> Result<ReceiptRecord, ExternalError> {
        self.receipt_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.receipts)
    }

    async fn get_block_number(&self) -> Result<u64, ExternalError> {
        Ok(1)
    }
}

pub fn sample_transaction(hash: &str) -> TransactionRecord {
    TransactionRecord {
        hash: hash.to_string(),
        from: ALICE.to_string(),
        to: Some(BOB.to_string()),
        value: ether(1).to_string(),
        nonce: 0,
        block_number: Some(100),
        gas: "21000".to_string(),
        gas_price: Some("1000000000".to_string()),
    }
}

pub fn sample_receipt(hash: &str) -> ReceiptRecord {
    ReceiptRecord {
        transaction_hash: hash.to_string(),
        block_number: Some(100),
        status: Some(1),
        gas_used: Some("21000".to_string()),
    }
}

pub struct FakeSender {
    pub calls: AtomicU32,
    pub requests: Mutex<Vec<SendTransactionRequest>>,
    response: Result<SendTransactionResponse, ExternalError>,
}

impl FakeSender {
    pub fn resolving(hash: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
            response: Ok(SendTransactionResponse {
                hash: hash.to_string(),
            }),
        })
    }

    pub fn rejecting(error: ExternalError) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
            response: Err(error),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSender for FakeSender {
    async fn send_transaction(
        &self,
        request: SendTransactionRequest,
    ) -> Result<SendTransactionResponse, ExternalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.response.clone()
    }
}

pub struct FakeEip1193 {
    pub requests: Mutex<Vec<(String, serde_json::Value)>>,
    response: Result<serde_json::Value, ExternalError>,
}

impl FakeEip1193 {
    pub fn returning(response: Result<serde_json::Value, ExternalError>) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            response,
        })
    }
}

#[async_trait]
impl Eip1193Provider for FakeEip1193 {
    async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ExternalError> {
        self.requests.lock().unwrap().push((method.to_string(), params));
        self.response.clone()
    }
}

pub struct FakeWallet {
    address: String,
    provider: Result<Arc<FakeEip1193>, ExternalError>,
}

impl FakeWallet {
    pub fn new(address: &str, provider: Arc<FakeEip1193>) -> Arc<Self> {
        Arc::new(Self {
            address: address.to_string(),
            provider: Ok(provider),
        })
    }

    /// Wallet whose provider handle cannot be obtained.
    pub fn unavailable(address: &str, error: ExternalError) -> Arc<Self> {
        Arc::new(Self {
            address: address.to_string(),
            provider: Err(error),
        })
    }
}

#[async_trait]
impl ConnectedWallet for FakeWallet {
    fn address(&self) -> &str {
        &self.address
    }

    async fn provider(&self) -> Result<Arc<dyn Eip1193Provider>, ExternalError> {
        match &self.provider {
            Ok(provider) => Ok(provider.clone()),
            Err(error) => Err(error.clone()),
        }
    }
}

pub struct FakeIdentity {
    state: Mutex<AuthState>,
    sender: Mutex<Option<Arc<dyn TransactionSender>>>,
    wallets: Mutex<Vec<Arc<dyn ConnectedWallet>>>,
}

impl FakeIdentity {
    pub fn signed_in(address: &str) -> Arc<Self> {
        let identity = Self::signed_out();
        identity.set_state(authenticated_state(address));
        identity
    }

    pub fn signed_out() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(AuthState {
                ready: true,
                authenticated: false,
                user: None,
            }),
            sender: Mutex::new(None),
            wallets: Mutex::new(Vec::new()),
        })
    }

    pub fn set_state(&self, state: AuthState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn set_sender(&self, sender: Arc<dyn TransactionSender>) {
        *self.sender.lock().unwrap() = Some(sender);
    }

    pub fn set_wallets(&self, wallets: Vec<Arc<dyn ConnectedWallet>>) {
        *self.wallets.lock().unwrap() = wallets;
    }
}

pub fn authenticated_state(address: &str) -> AuthState {
    AuthState {
        ready: true,
        authenticated: true,
        user: Some(AuthUser {
            id: "did:example:alice".to_string(),
            wallet: Some(LinkedWallet {
                address: address.to_string(),
            }),
        }),
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    fn state(&self) -> AuthState {
        self.state.lock().unwrap().clone()
    }

    async fn login(&self) -> Result<(), ExternalError> {
        let mut state = self.state.lock().unwrap();
        state.authenticated = true;
        Ok(())
    }

    async fn logout(&self) -> Result<(), ExternalError> {
        let mut state = self.state.lock().unwrap();
        state.authenticated = false;
        state.user = None;
        Ok(())
    }

    fn transaction_sender(&self) -> Option<Arc<dyn TransactionSender>> {
        self.sender.lock().unwrap().clone()
    }

    fn connected_wallets(&self) -> Vec<Arc<dyn ConnectedWallet>> {
        self.wallets.lock().unwrap().clone()
    }
}
