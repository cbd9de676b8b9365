use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use crate::{
    error::{BalanceQueryError, ExternalError},
    integrations::identity::IdentityProvider,
    models::{AuthState, AuthUser, WalletAddress},
    query::QueryStatus,
    services::balance_query::{BalanceQuery, BalanceSnapshot},
};

/// The three axes the session reacts to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthView {
    pub ready: bool,
    pub authenticated: bool,
    pub address: Option<String>,
}

impl AuthView {
    pub fn from_state(state: &AuthState) -> Self {
        Self {
            ready: state.ready,
            authenticated: state.authenticated,
            address: derive_address(state.user.as_ref()),
        }
    }

    /// Balance lookups run only for a ready, authenticated session with a wallet.
    pub fn balance_enabled(&self) -> bool {
        self.ready && self.authenticated && self.address.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    InvalidateWalletNamespace,
    PrefetchBalance(String),
}

/// Effects of moving from `prev` to `next`.
pub fn session_effects(prev: &AuthView, next: &AuthView) -> Vec<SessionEffect> {
    let mut effects = Vec::new();
    if prev.authenticated && !next.authenticated {
        effects.push(SessionEffect::InvalidateWalletNamespace);
    }
    if next.balance_enabled() && (!prev.balance_enabled() || prev.address != next.address) {
        if let Some(address) = &next.address {
            effects.push(SessionEffect::PrefetchBalance(address.clone()));
        }
    }
    effects
}

// Internal helper that accepts only a well-formed linked wallet address.
fn derive_address(user: Option<&AuthUser>) -> Option<String> {
    user.and_then(AuthUser::wallet_address)
        .and_then(WalletAddress::parse_strict)
        .map(WalletAddress::into_string)
}

/// What display code consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WalletSession {
    pub is_ready: bool,
    pub is_authenticated: bool,
    pub user: Option<AuthUser>,
    pub address: Option<String>,
    pub has_wallet: bool,
    pub balance: Option<String>,
    pub is_loading_balance: bool,
    #[serde(skip)]
    pub balance_error: Option<BalanceQueryError>,
}

impl WalletSession {
    pub fn derive(state: &AuthState, balance: &BalanceSnapshot) -> Self {
        let view = AuthView::from_state(state);
        let enabled = view.balance_enabled();
        Self {
            is_ready: state.ready,
            is_authenticated: state.ready && state.authenticated,
            user: state.user.clone(),
            has_wallet: view.address.is_some(),
            address: view.address,
            balance: if enabled { balance.data.clone() } else { None },
            // An enabled query with no entry yet is about to fetch.
            is_loading_balance: enabled
                && (balance.is_loading() || balance.status == QueryStatus::Idle),
            balance_error: if enabled { balance.error.clone() } else { None },
        }
    }
}

/// Ties the identity provider to the balance query and publishes session snapshots.
pub struct WalletSessionFacade {
    identity: Arc<dyn IdentityProvider>,
    balances: Arc<BalanceQuery>,
    view: Mutex<AuthView>,
    sender: watch::Sender<WalletSession>,
}

impl WalletSessionFacade {
    pub fn new(identity: Arc<dyn IdentityProvider>, balances: Arc<BalanceQuery>) -> Arc<Self> {
        let (sender, _) = watch::channel(WalletSession::default());
        Arc::new(Self {
            identity,
            balances,
            view: Mutex::new(AuthView::default()),
            sender,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<WalletSession> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> WalletSession {
        self.sender.borrow().clone()
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    /// Reads the provider, applies transition effects and publishes the new session.
    ///
    /// A changed address is prefetched in the background; the published session
    /// keeps whatever the cache already holds until that fetch lands.
    pub async fn sync(self: &Arc<Self>) -> WalletSession {
        let state = self.identity.state();
        let next = AuthView::from_state(&state);
        let effects = {
            let mut view = self.view.lock().await;
            let effects = session_effects(&view, &next);
            if *view != next {
                tracing::info!(
                    "wallet session ready={} authenticated={} address={:?}",
                    next.ready,
                    next.authenticated,
                    next.address
                );
            }
            *view = next;
            effects
        };

        for effect in effects {
            match effect {
                SessionEffect::InvalidateWalletNamespace => {
                    let count = self.balances.invalidate_all().await;
                    tracing::info!("session ended, invalidated {} cached balances", count);
                }
                SessionEffect::PrefetchBalance(address) => {
                    let facade = self.clone();
                    let handle = self.balances.prefetch(&address);
                    tokio::spawn(async move {
                        if handle.await.is_ok() {
                            facade.publish().await;
                        }
                    });
                }
            }
        }

        self.publish().await
    }

    /// Awaits a balance fetch for the current session, then publishes.
    pub async fn refresh_balance(self: &Arc<Self>) -> WalletSession {
        let view = self.view.lock().await.clone();
        if let (true, Some(address)) = (view.balance_enabled(), view.address.as_deref()) {
            let _ = self.balances.refetch(address).await;
        }
        self.publish().await
    }

    pub async fn login(self: &Arc<Self>) -> Result<WalletSession, ExternalError> {
        self.identity.login().await?;
        Ok(self.sync().await)
    }

    pub async fn logout(self: &Arc<Self>) -> Result<WalletSession, ExternalError> {
        self.identity.logout().await?;
        Ok(self.sync().await)
    }

    async fn publish(&self) -> WalletSession {
        let state = self.identity.state();
        let view = AuthView::from_state(&state);
        let snapshot = if view.balance_enabled() {
            self.balances.snapshot(view.address.as_deref()).await
        } else {
            BalanceSnapshot::idle()
        };
        let session = WalletSession::derive(&state, &snapshot);
        self.sender.send_replace(session.clone());
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Backoff;
    use crate::services::balance_fetcher::BalanceFetcher;
    use crate::services::balance_query::{BalanceCache, BalanceRetryPolicy};
    use crate::testing::{authenticated_state, ether, FakeChainClient, FakeIdentity, ALICE, BOB};

    fn view(ready: bool, authenticated: bool, address: Option<&str>) -> AuthView {
        AuthView {
            ready,
            authenticated,
            address: address.map(str::to_string),
        }
    }

    fn balances(client: &Arc<FakeChainClient>) -> Arc<BalanceQuery> {
        Arc::new(
            BalanceQuery::new(
                Arc::new(BalanceFetcher::new(client.clone())),
                Arc::new(BalanceCache::new()),
            )
            .with_policy(BalanceRetryPolicy::with_backoff(Backoff::immediate())),
        )
    }

    #[test]
    fn logout_invalidates_wallet_namespace() {
        let effects = session_effects(&view(true, true, Some(ALICE)), &view(true, false, None));
        assert_eq!(effects, vec![SessionEffect::InvalidateWalletNamespace]);
    }

    #[test]
    fn address_change_prefetches_new_address() {
        let effects = session_effects(&view(true, true, Some(ALICE)), &view(true, true, Some(BOB)));
        assert_eq!(effects, vec![SessionEffect::PrefetchBalance(BOB.to_string())]);
    }

    #[test]
    fn nothing_runs_until_ready_authenticated_with_wallet() {
        assert!(session_effects(&AuthView::default(), &view(false, true, Some(ALICE))).is_empty());
        assert!(session_effects(&AuthView::default(), &view(true, false, Some(ALICE))).is_empty());
        assert!(session_effects(&AuthView::default(), &view(true, true, None)).is_empty());
        assert_eq!(
            session_effects(&view(false, true, Some(ALICE)), &view(true, true, Some(ALICE))),
            vec![SessionEffect::PrefetchBalance(ALICE.to_string())]
        );
    }

    #[test]
    fn unchanged_session_has_no_effects() {
        let same = view(true, true, Some(ALICE));
        assert!(session_effects(&same, &same).is_empty());
    }

    #[test]
    fn malformed_linked_wallet_means_no_wallet() {
        let mut state = authenticated_state("0xnot-an-address");
        let session = WalletSession::derive(&state, &BalanceSnapshot::idle());
        assert!(!session.has_wallet);
        assert_eq!(session.address, None);

        state = authenticated_state(ALICE);
        let session = WalletSession::derive(&state, &BalanceSnapshot::idle());
        assert!(session.has_wallet);
    }

    #[test]
    fn session_counts_as_authenticated_only_once_ready() {
        let mut state = authenticated_state(ALICE);
        state.ready = false;
        let session = WalletSession::derive(&state, &BalanceSnapshot::idle());
        assert!(!session.is_authenticated);
        assert!(!session.is_loading_balance);

        state.ready = true;
        let session = WalletSession::derive(&state, &BalanceSnapshot::idle());
        assert!(session.is_authenticated);
    }

    #[test]
    fn enabled_balance_without_entry_reads_as_loading() {
        let state = authenticated_state(ALICE);
        let session = WalletSession::derive(&state, &BalanceSnapshot::idle());
        assert!(session.is_loading_balance);
        assert_eq!(session.balance, None);

        let mut settled = BalanceSnapshot::idle();
        settled.status = QueryStatus::Success;
        settled.data = Some("2".to_string());
        let session = WalletSession::derive(&state, &settled);
        assert!(!session.is_loading_balance);
        assert_eq!(session.balance.as_deref(), Some("2"));

        let signed_out = WalletSession::derive(&AuthState::default(), &BalanceSnapshot::idle());
        assert!(!signed_out.is_loading_balance);
    }

    #[tokio::test]
    async fn sign_in_publishes_balance_and_sign_out_clears_it() {
        let client = Arc::new(FakeChainClient::new().with_balance(ether(2)));
        let identity = FakeIdentity::signed_in(ALICE);
        let balances = balances(&client);
        let facade = WalletSessionFacade::new(identity.clone(), balances.clone());
        let mut updates = facade.subscribe();

        facade.sync().await;
        for _ in 0..100 {
            if facade.current().balance.is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(facade.current().balance.as_deref(), Some("2"));
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().address.as_deref(), Some(ALICE));
        assert_eq!(client.balance_calls(), 1);

        let session = facade.refresh_balance().await;
        assert_eq!(session.balance.as_deref(), Some("2"));
        assert_eq!(client.balance_calls(), 2);

        facade.logout().await.unwrap();
        let session = facade.current();
        assert!(!session.is_authenticated);
        assert_eq!(session.balance, None);
        assert!(balances.snapshot(Some(ALICE)).await.invalidated);
    }

    #[tokio::test]
    async fn signed_out_session_never_queries_balance() {
        let client = Arc::new(FakeChainClient::new());
        let facade = WalletSessionFacade::new(FakeIdentity::signed_out(), balances(&client));
        let session = facade.sync().await;
        assert!(!session.is_authenticated);
        assert!(!session.is_loading_balance);
        let _ = facade.refresh_balance().await;
        assert_eq!(client.balance_calls(), 0);
    }
}
