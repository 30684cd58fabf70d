//! Periodic and on-demand refresh of balances and prices.

use crate::core::asset::{BalanceSnapshot, PriceSnapshot, WalletId};
use crate::core::config::RefreshConfig;
use crate::store::balance::BalanceStore;
use crate::store::price::PriceCache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

const CYCLES_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No wallet attached.
    Idle,
    /// Wallet attached, waiting for the next trigger.
    Scheduled,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Completed,
    /// A cycle was already running.
    Dropped,
    Detached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub interval: Duration,
    /// Extra refreshes after attach, newly created token accounts take a while to show up.
    pub startup_delays: Vec<Duration>,
    /// Follow-up refresh after a manual trigger, for the same reason.
    pub manual_followup: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig::from(&RefreshConfig::default())
    }
}

impl From<&RefreshConfig> for ScheduleConfig {
    fn from(config: &RefreshConfig) -> Self {
        ScheduleConfig {
            interval: Duration::from_millis(config.interval_ms),
            startup_delays: config
                .startup_delays_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            manual_followup: Duration::from_millis(config.manual_followup_ms),
        }
    }
}

/// Balances and prices of one completed cycle, published together.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleUpdate {
    pub balances: Arc<BalanceSnapshot>,
    pub prices: Arc<PriceSnapshot>,
}

/// Timers that live as long as one attached wallet.
struct Session {
    id: u64,
    identity: WalletId,
    tasks: JoinSet<()>,
}

struct Inner {
    balances: Arc<BalanceStore>,
    prices: Arc<PriceCache>,
    config: ScheduleConfig,
    session_ids: AtomicU64,
    // Session whose cycle is in flight
    running: Mutex<Option<u64>>,
    session: Mutex<Option<Session>>,
    cycles: broadcast::Sender<CycleUpdate>,
}

struct RunningGuard<'a> {
    running: &'a Mutex<Option<u64>>,
    session: u64,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        let mut running = lock(self.running);
        if *running == Some(self.session) {
            *running = None;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drives refresh cycles of a [`BalanceStore`] and a [`PriceCache`].
///
/// At most one cycle runs per attached wallet. Triggers that arrive while that
/// cycle is running are dropped, not queued. A cycle left over from a replaced
/// wallet never blocks the new one.
#[derive(Clone)]
pub struct RefreshScheduler {
    inner: Arc<Inner>,
}

impl RefreshScheduler {
    pub fn new(balances: Arc<BalanceStore>, prices: Arc<PriceCache>, config: ScheduleConfig) -> Self {
        let (cycles, _) = broadcast::channel(CYCLES_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                balances,
                prices,
                config,
                session_ids: AtomicU64::new(0),
                running: Mutex::new(None),
                session: Mutex::new(None),
                cycles,
            }),
        }
    }

    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        lock(&self.inner.session)
    }

    pub fn balances(&self) -> &Arc<BalanceStore> {
        &self.inner.balances
    }

    pub fn prices(&self) -> &Arc<PriceCache> {
        &self.inner.prices
    }

    /// Receives balances and prices once both halves of a cycle are done.
    ///
    /// Cycles whose balances were discarded are not sent.
    pub fn subscribe(&self) -> broadcast::Receiver<CycleUpdate> {
        self.inner.cycles.subscribe()
    }

    pub fn state(&self) -> SchedulerState {
        if lock(&self.inner.running).is_some() {
            SchedulerState::Running
        } else if self.session().is_some() {
            SchedulerState::Scheduled
        } else {
            SchedulerState::Idle
        }
    }

    pub fn current_identity(&self) -> Option<WalletId> {
        self.session().as_ref().map(|s| s.identity.clone())
    }

    /// Attaches a wallet: refreshes now, again after each startup delay, then
    /// every interval until [`RefreshScheduler::detach`].
    pub fn attach(&self, identity: WalletId) {
        self.detach();
        self.inner.balances.attach(identity.clone());

        let config = &self.inner.config;
        info!(
            %identity,
            interval_ms = config.interval.as_millis() as u64,
            "Scheduling balance refresh"
        );

        // Installed before spawning, the timers read the identity from it
        let mut guard = self.session();
        let session = guard.insert(Session {
            id: self.inner.session_ids.fetch_add(1, Ordering::SeqCst) + 1,
            identity,
            tasks: JoinSet::new(),
        });
        session
            .tasks
            .spawn(self.clone().fire_after(Duration::ZERO, "attach"));
        for delay in &config.startup_delays {
            session
                .tasks
                .spawn(self.clone().fire_after(*delay, "startup"));
        }
        session.tasks.spawn(self.clone().run_periodic());
    }

    /// Cancels every pending timer and detaches the wallet from the store.
    ///
    /// A cycle already in flight finishes, but the store discards its result.
    pub fn detach(&self) {
        let session = self.session().take();
        if let Some(mut session) = session {
            session.tasks.abort_all();
            info!(identity = %session.identity, "Cancelled scheduled refreshes");
        }
        self.inner.balances.detach();
    }

    /// Refreshes now and once more after the manual follow-up delay.
    pub async fn trigger(&self) -> TriggerOutcome {
        {
            let mut session = self.session();
            let Some(session) = session.as_mut() else {
                debug!("Manual refresh ignored, no wallet attached");
                return TriggerOutcome::Detached;
            };
            while session.tasks.try_join_next().is_some() {}
            session.tasks.spawn(
                self.clone()
                    .fire_after(self.inner.config.manual_followup, "manual-followup"),
            );
        }
        self.run_cycle("manual").await
    }

    async fn fire_after(self, delay: Duration, reason: &'static str) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        // Detached so that cancelling the timer never aborts a running cycle
        tokio::spawn(async move {
            self.run_cycle(reason).await;
        });
    }

    async fn run_periodic(self) {
        let interval = self.inner.config.interval;
        if interval.is_zero() {
            debug!("Periodic refresh disabled");
            return;
        }
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let scheduler = self.clone();
            tokio::spawn(async move {
                scheduler.run_cycle("periodic").await;
            });
        }
    }

    async fn run_cycle(&self, reason: &'static str) -> TriggerOutcome {
        let Some((session, identity)) = self
            .session()
            .as_ref()
            .map(|s| (s.id, s.identity.clone()))
        else {
            return TriggerOutcome::Detached;
        };
        {
            let mut running = lock(&self.inner.running);
            if *running == Some(session) {
                debug!(reason, "Refresh cycle already running, dropping trigger");
                return TriggerOutcome::Dropped;
            }
            *running = Some(session);
        }
        let _running = RunningGuard {
            running: &self.inner.running,
            session,
        };

        debug!(reason, %identity, "Starting refresh cycle");
        let (balances, prices) = tokio::join!(
            self.inner.balances.refresh_all(&identity),
            self.inner.prices.refresh()
        );
        debug!(
            reason,
            published = balances.is_some(),
            prices_at = ?prices.fetched_at,
            "Refresh cycle finished"
        );
        if let Some(balances) = balances {
            // No subscribers is fine
            let _ = self.inner.cycles.send(CycleUpdate { balances, prices });
        }
        TriggerOutcome::Completed
    }
}
