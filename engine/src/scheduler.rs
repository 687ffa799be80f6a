use alloy_primitives::Address;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::models::DerivedPayoutState;
use crate::payout::derive;
use crate::store::{KvStore, PayoutRepository};
use crate::utils::now_ms;

/// Interval-driven countdown recompute, decoupled from any rendering. The
/// ticker owns the timer; consumers either poll `recompute_now` themselves
/// or receive states through `run`'s callback.
pub struct PayoutTicker<K: KvStore> {
    repo: PayoutRepository<K>,
    interval: Duration,
}

impl<K: KvStore> PayoutTicker<K> {
    pub fn new(repo: PayoutRepository<K>, interval_ms: u64) -> Self {
        Self {
            repo,
            interval: Duration::from_millis(interval_ms.max(1)),
        }
    }

    /// Single recompute against an explicit `now`. Returns `None` when the
    /// wallet has no schedule yet.
    pub fn recompute_now(
        &self,
        wallet: Address,
        now: i64,
    ) -> StoreResult<Option<DerivedPayoutState>> {
        let Some(schedule) = self.repo.schedule(wallet)? else {
            return Ok(None);
        };
        let control = self.repo.control(wallet)?;
        Ok(Some(derive(
            schedule.last_approved_at,
            schedule.next_payout_at,
            control.as_ref(),
            now,
            true,
        )))
    }

    /// Recomputes on every tick until `on_tick` returns `false`. Store
    /// failures are logged and the ticking continues.
    pub async fn run<F>(&self, wallet: Address, mut on_tick: F)
    where
        F: FnMut(DerivedPayoutState) -> bool,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match self.recompute_now(wallet, now_ms()) {
                Ok(Some(state)) => {
                    if !on_tick(state) {
                        break;
                    }
                }
                Ok(None) => {
                    debug!(wallet = %wallet, "no payout schedule yet");
                }
                Err(e) => {
                    warn!(wallet = %wallet, error = %e, "countdown recompute failed");
                }
            }
        }
    }
}
