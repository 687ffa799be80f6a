//! Admin control editor.
//!
//! Each operator action is a pure producer from the previous control record
//! (plus the base schedule and an explicit `now`) to the next one. Producers
//! are idempotent against re-application with unchanged inputs; `commit`
//! compares by value before writing so an unchanged record never touches the
//! store.

use alloy_primitives::Address;
use tracing::debug;

use crate::config::DEFAULT_CYCLE_MS;
use crate::error::{AdminError, AdminResult};
use crate::models::PayoutControl;
use crate::payout::derive;
use crate::store::{KvStore, PayoutRepository};

/// Fine-grained retiming step: 5 minutes.
pub const SHIFT_STEP_SMALL_MS: i64 = 5 * 60 * 1000;
/// Coarse retiming step: 30 minutes.
pub const SHIFT_STEP_LARGE_MS: i64 = 30 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct ControlEditor {
    pub default_cycle_ms: i64,
}

impl Default for ControlEditor {
    fn default() -> Self {
        Self {
            default_cycle_ms: DEFAULT_CYCLE_MS,
        }
    }
}

impl ControlEditor {
    pub fn new(default_cycle_ms: i64) -> Self {
        Self {
            default_cycle_ms: default_cycle_ms.max(1),
        }
    }

    /// Freezes the wallet's countdown. For a cycling schedule the record is
    /// anchored to the current cycle start (inferred from the live derived
    /// state when not already stored) and resumes at the next cycle
    /// boundary; otherwise it resumes at the later of the scheduled next
    /// payout or `now`. Already paused is a no-op.
    pub fn pause(
        &self,
        base_last: i64,
        base_next: i64,
        prev: Option<&PayoutControl>,
        now: i64,
    ) -> Option<PayoutControl> {
        if prev.map(|c| c.paused).unwrap_or(false) {
            return prev.cloned();
        }
        let derived = derive(base_last, base_next, prev, now, true);
        if derived.is_cycle {
            let cycle_ms = derived.cycle_ms.unwrap_or(self.default_cycle_ms);
            let cycle_start = prev
                .and_then(|c| c.cycle_start_at)
                .unwrap_or(derived.last_approved_at);
            let resume_at = derived.next_payout_at;
            Some(PayoutControl {
                cycle_start_at: Some(cycle_start),
                cycle_ms: Some(cycle_ms),
                paused: true,
                pause_remaining_ms: Some((resume_at - now).max(0)),
                resume_at: Some(resume_at),
                ..Default::default()
            })
        } else {
            let resume_at = derived.next_payout_at.max(now);
            Some(PayoutControl {
                adjusted_last_approved_at: Some(derived.last_approved_at),
                adjusted_next_payout_at: Some(resume_at),
                paused: true,
                pause_remaining_ms: Some((resume_at - now).max(0)),
                resume_at: Some(resume_at),
                ..Default::default()
            })
        }
    }

    /// Unfreezes the countdown, converting the frozen resume point into a
    /// fresh cycle start (cycling) or an adjusted next-payout (manual) so
    /// the remaining time continues exactly where the pause left it.
    pub fn resume(
        &self,
        _base_last: i64,
        _base_next: i64,
        prev: Option<&PayoutControl>,
        now: i64,
    ) -> Option<PayoutControl> {
        let Some(prev) = prev else {
            return None;
        };
        if !prev.paused {
            return Some(prev.clone());
        }
        let resume_point = prev
            .pause_remaining_ms
            .map(|r| now + r.max(0))
            .or(prev.resume_at)
            .unwrap_or(now)
            .max(now);
        if prev.is_cycle() {
            let cycle_ms = prev.cycle_ms.unwrap_or(self.default_cycle_ms);
            Some(PayoutControl {
                cycle_start_at: Some(resume_point - cycle_ms),
                cycle_ms: Some(cycle_ms),
                ..Default::default()
            })
        } else {
            Some(PayoutControl {
                adjusted_last_approved_at: prev.adjusted_last_approved_at,
                adjusted_next_payout_at: Some(resume_point),
                ..Default::default()
            })
        }
    }

    /// Moves whichever anchor is authoritative by `delta_ms` (cycle start
    /// when cycling, adjusted next-payout otherwise). A paused record keeps
    /// its pause, with the resume point shifted and the frozen remaining
    /// recomputed so the display reflects the change immediately.
    pub fn shift(
        &self,
        base_last: i64,
        base_next: i64,
        prev: Option<&PayoutControl>,
        delta_ms: i64,
        now: i64,
    ) -> Option<PayoutControl> {
        let derived = derive(base_last, base_next, prev, now, true);
        let mut next = prev.cloned().unwrap_or_default();
        if next.is_cycle() {
            let start = next.cycle_start_at.unwrap_or(derived.last_approved_at);
            next.cycle_start_at = Some(start + delta_ms);
            next.cycle_ms = Some(next.cycle_ms.unwrap_or(self.default_cycle_ms));
        } else {
            let anchor = next.adjusted_next_payout_at.unwrap_or(derived.next_payout_at);
            next.adjusted_last_approved_at = next
                .adjusted_last_approved_at
                .or(Some(derived.last_approved_at));
            next.adjusted_next_payout_at = Some(anchor + delta_ms);
        }
        if next.paused {
            let resume_at = next
                .resume_at
                .map(|r| r + delta_ms)
                .unwrap_or(derived.resume_at + delta_ms)
                .max(now);
            next.resume_at = Some(resume_at);
            next.pause_remaining_ms = Some((resume_at - now).max(0));
        }
        next.normalized()
    }

    /// Retimes the next payout to an absolute moment. The target is clamped
    /// to be no earlier than `now` and, for non-cycling schedules, no
    /// earlier than one second past the derived last approval. Pause state
    /// is preserved.
    pub fn set_absolute(
        &self,
        base_last: i64,
        base_next: i64,
        prev: Option<&PayoutControl>,
        target_ms: i64,
        now: i64,
    ) -> AdminResult<Option<PayoutControl>> {
        if target_ms <= 0 {
            return Err(AdminError::InvalidTimestamp(
                "timestamp must be positive".to_string(),
            ));
        }
        let derived = derive(base_last, base_next, prev, now, true);
        let mut next = prev.cloned().unwrap_or_default();
        let mut target = target_ms.max(now);
        if next.is_cycle() {
            let cycle_ms = next.cycle_ms.unwrap_or(self.default_cycle_ms);
            next.cycle_ms = Some(cycle_ms);
            next.cycle_start_at = Some(target - cycle_ms);
        } else {
            target = target.max(derived.last_approved_at + 1_000);
            next.adjusted_last_approved_at = next
                .adjusted_last_approved_at
                .or(Some(derived.last_approved_at));
            next.adjusted_next_payout_at = Some(target);
        }
        if next.paused {
            next.resume_at = Some(target);
            next.pause_remaining_ms = Some((target - now).max(0));
        }
        Ok(next.normalized())
    }

    /// Converts the wallet to a recurring cycle, seeded from the later of
    /// the currently scheduled next payout or `now`. Replaces any manual
    /// adjustment or pause.
    pub fn start_cycle(
        &self,
        base_last: i64,
        base_next: i64,
        prev: Option<&PayoutControl>,
        cycle_ms: Option<i64>,
        now: i64,
    ) -> Option<PayoutControl> {
        let derived = derive(base_last, base_next, prev, now, true);
        let cycle_ms = cycle_ms.unwrap_or(self.default_cycle_ms).max(1);
        Some(PayoutControl {
            cycle_start_at: Some(derived.next_payout_at.max(now)),
            cycle_ms: Some(cycle_ms),
            ..Default::default()
        })
    }

    /// Clears the control entirely, reverting to the unmodified base
    /// schedule.
    pub fn reset(&self) -> Option<PayoutControl> {
        None
    }

    /// Persists a produced control when, and only when, it differs from the
    /// previous record by value. Returns whether a write happened.
    pub fn commit<K: KvStore>(
        &self,
        repo: &PayoutRepository<K>,
        wallet: Address,
        prev: Option<&PayoutControl>,
        next: Option<PayoutControl>,
    ) -> AdminResult<bool> {
        let next = next.and_then(|c| c.normalized());
        if prev == next.as_ref() {
            debug!(wallet = %wallet, "control unchanged, skipping write");
            return Ok(false);
        }
        repo.set_control(wallet, next.as_ref())?;
        Ok(true)
    }
}
