use crate::core::asset::{Asset, AssetBalance, BalanceSnapshot, WalletId};
use crate::core::error::FetchError;
use crate::core::ledger::LedgerProvider;
use crate::core::retry::{RetryPolicy, fetch_with_retry};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

const UPDATES_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct BalanceConfig {
    pub assets: Vec<Asset>,
    pub gold_mint: String,
    pub token_program: String,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshState {
    pub in_progress: bool,
    pub last_updated_at: Option<DateTime<Utc>>,
}

struct StoreState {
    identity: Option<WalletId>,
    // Bumped on every attach/detach so results read for an older identity are dropped
    generation: u64,
    snapshot: Arc<BalanceSnapshot>,
    last_updated_at: Option<DateTime<Utc>>,
    active: usize,
    // Generation whose refresh_all cycle is in flight
    cycle_generation: Option<u64>,
}

/// Best-known balances of the attached wallet for every tracked asset.
///
/// Reads go through the ledger with a bounded retry per asset. An asset whose
/// reads are exhausted falls back to zero instead of keeping stale data.
/// Completed `refresh_all` cycles are broadcast to subscribers.
pub struct BalanceStore {
    ledger: Arc<dyn LedgerProvider>,
    config: BalanceConfig,
    state: Mutex<StoreState>,
    updates: broadcast::Sender<Arc<BalanceSnapshot>>,
}

/// Releases the store's in-progress markers when a refresh ends, even if the
/// refreshing future is dropped.
struct ActiveGuard<'a> {
    store: &'a BalanceStore,
    cycle: Option<u64>,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.store.lock();
        state.active = state.active.saturating_sub(1);
        if self.cycle.is_some() && state.cycle_generation == self.cycle {
            state.cycle_generation = None;
        }
    }
}

impl BalanceStore {
    pub fn new(ledger: Arc<dyn LedgerProvider>, config: BalanceConfig) -> Self {
        let (updates, _) = broadcast::channel(UPDATES_CAPACITY);
        let snapshot = Arc::new(BalanceSnapshot::empty(None, &config.assets));
        Self {
            ledger,
            config,
            state: Mutex::new(StoreState {
                identity: None,
                generation: 0,
                snapshot,
                last_updated_at: None,
                active: 0,
                cycle_generation: None,
            }),
            updates,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn attach(&self, identity: WalletId) {
        let mut state = self.lock();
        info!(%identity, "Attaching wallet");
        state.generation += 1;
        state.snapshot = Arc::new(BalanceSnapshot::empty(
            Some(identity.clone()),
            &self.config.assets,
        ));
        state.identity = Some(identity);
        state.last_updated_at = None;
    }

    pub fn detach(&self) {
        let mut state = self.lock();
        if let Some(identity) = state.identity.take() {
            info!(%identity, "Detaching wallet");
        }
        state.generation += 1;
        state.snapshot = Arc::new(BalanceSnapshot::empty(None, &self.config.assets));
        state.last_updated_at = None;
    }

    pub fn current_identity(&self) -> Option<WalletId> {
        self.lock().identity.clone()
    }

    pub fn snapshot(&self) -> Arc<BalanceSnapshot> {
        Arc::clone(&self.lock().snapshot)
    }

    pub fn refresh_state(&self) -> RefreshState {
        let state = self.lock();
        RefreshState {
            in_progress: state.active > 0,
            last_updated_at: state.last_updated_at,
        }
    }

    /// Receives every snapshot published by [`BalanceStore::refresh_all`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<BalanceSnapshot>> {
        self.updates.subscribe()
    }

    /// Refreshes a single asset and updates only its entry.
    ///
    /// Returns `None` if `identity` is not attached or changed during the read.
    pub async fn refresh_one(&self, identity: &WalletId, asset: Asset) -> Option<AssetBalance> {
        let generation = {
            let mut state = self.lock();
            if state.identity.as_ref() != Some(identity) {
                debug!(%identity, "Ignoring refresh for a wallet that is not attached");
                return None;
            }
            state.active += 1;
            state.generation
        };
        let _guard = ActiveGuard {
            store: self,
            cycle: None,
        };

        let balance = self.fetch_balance(identity, asset).await;

        let mut state = self.lock();
        if state.generation != generation {
            info!(%identity, %asset, "Wallet changed during refresh, discarding result");
            return None;
        }
        let mut next = BalanceSnapshot::clone(&state.snapshot);
        next.balances.insert(asset, balance);
        state.snapshot = Arc::new(next);
        Some(balance)
    }

    /// Refreshes every tracked asset and publishes the result as one snapshot.
    ///
    /// Returns `None` when another cycle is already running for the attached
    /// wallet, or when the wallet was detached or replaced before the reads
    /// finished. A cycle still running for a replaced wallet does not block.
    #[instrument(name = "RefreshAll", skip(self), fields(identity = %identity))]
    pub async fn refresh_all(&self, identity: &WalletId) -> Option<Arc<BalanceSnapshot>> {
        let generation = {
            let mut state = self.lock();
            if state.identity.as_ref() != Some(identity) {
                debug!("Ignoring refresh for a wallet that is not attached");
                return None;
            }
            if state.cycle_generation == Some(state.generation) {
                debug!("Refresh cycle already running, dropping request");
                return None;
            }
            state.cycle_generation = Some(state.generation);
            state.active += 1;
            state.generation
        };
        let _guard = ActiveGuard {
            store: self,
            cycle: Some(generation),
        };

        let reads = self
            .config
            .assets
            .iter()
            .map(|asset| self.fetch_balance(identity, *asset));
        let balances = join_all(reads).await;

        let snapshot = {
            let mut state = self.lock();
            if state.generation != generation {
                info!("Wallet changed during refresh, discarding result");
                return None;
            }
            let now = Utc::now();
            let snapshot = Arc::new(BalanceSnapshot {
                identity: Some(identity.clone()),
                balances: balances.into_iter().map(|b| (b.asset, b)).collect(),
                taken_at: Some(now),
            });
            state.snapshot = Arc::clone(&snapshot);
            state.last_updated_at = Some(now);
            snapshot
        };

        // No subscribers is fine
        let receivers = self.updates.send(Arc::clone(&snapshot)).unwrap_or(0);
        debug!(receivers, "Published balances-updated");
        Some(snapshot)
    }

    async fn fetch_balance(&self, identity: &WalletId, asset: Asset) -> AssetBalance {
        let policy = self.config.retry;
        let fetched = match self.mint_for(asset) {
            None => {
                fetch_with_retry(
                    policy,
                    || async {
                        self.ledger
                            .get_native_balance(identity)
                            .await
                            .map_err(FetchError::from_provider)
                    },
                    0,
                )
                .await
            }
            Some(mint) => {
                fetch_with_retry(policy, || self.read_token_balance(identity, mint), 0).await
            }
        };

        if fetched.exhausted {
            warn!(%asset, attempts = fetched.attempts, "Balance unavailable, falling back to zero");
        } else {
            debug!(%asset, raw = fetched.value, "Fetched balance");
        }
        AssetBalance::new(asset, fetched.value)
    }

    fn mint_for(&self, asset: Asset) -> Option<&str> {
        (!asset.is_native()).then_some(self.config.gold_mint.as_str())
    }

    async fn read_token_balance(&self, identity: &WalletId, mint: &str) -> Result<u64, FetchError> {
        match self.read_token_account(identity, mint).await {
            Err(err) if err.resolves_to_zero() => {
                debug!(error = %err, "Token balance reads as zero");
                Ok(0)
            }
            other => other,
        }
    }

    async fn read_token_account(&self, identity: &WalletId, mint: &str) -> Result<u64, FetchError> {
        let account = self
            .ledger
            .get_token_account(identity, mint)
            .await
            .map_err(FetchError::from_provider)?
            .ok_or_else(|| {
                FetchError::AccountNotFound(format!("no account for mint {mint} in {identity}"))
            })?;

        if account.data_len == 0 {
            return Err(FetchError::AccountNotFound(format!(
                "account {} has no data",
                account.address
            )));
        }
        if account.program_owner != self.config.token_program {
            return Err(FetchError::OwnershipMismatch {
                account: account.address,
                expected: self.config.token_program.clone(),
                actual: account.program_owner,
            });
        }

        let data = self
            .ledger
            .get_token_account_data(&account.address)
            .await
            .map_err(FetchError::from_provider)?;
        if data.owner != identity.as_str() {
            return Err(FetchError::OwnershipMismatch {
                account: account.address,
                expected: identity.to_string(),
                actual: data.owner,
            });
        }
        Ok(data.amount)
    }
}
