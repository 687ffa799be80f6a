//! Payout-cycle state machine.
//!
//! `derive` is a pure function over the persisted base schedule, the
//! optional admin control record and an explicit `now`. It never reads a
//! clock, so identical inputs always produce identical output; live
//! countdowns poll it on a ticker and admin writes re-feed it the updated
//! control record.

use crate::config::{DEFAULT_CYCLE_MS, DEFAULT_PAYOUT_INTERVAL_MS};
use crate::models::{
    DerivedPayoutState, PayoutControl, PayoutSchedule, PayoutStatus, ScheduleToken,
};

/// Derives a wallet's live payout state.
///
/// `freeze_paused` controls what `remaining_ms` reports while paused: the
/// originally stored remaining value (a frozen countdown display, the
/// default) or a dynamic recomputation against `resume_at` (used when
/// computing a value to persist).
pub fn derive(
    base_last_approved_at: i64,
    base_next_payout_at: i64,
    control: Option<&PayoutControl>,
    now: i64,
    freeze_paused: bool,
) -> DerivedPayoutState {
    // An invalid stored record (none of paused/manual/cycle) acts as no
    // override.
    let control = control.filter(|c| !c.is_empty());

    let is_cycle = control.map(|c| c.is_cycle()).unwrap_or(false);
    let cycle_ms = control
        .filter(|c| c.is_cycle())
        .map(|c| c.cycle_ms.unwrap_or(DEFAULT_CYCLE_MS).max(1));

    let (mut last, mut next) = match control {
        Some(c) if c.is_cycle() => {
            let cycle = c.cycle_ms.unwrap_or(DEFAULT_CYCLE_MS).max(1);
            let start = c.cycle_start_at.unwrap_or(base_last_approved_at);
            // Whole cycles elapsed since the start; the schedule is
            // self-rolling, so no write is needed for it to keep recurring.
            let elapsed = now - start;
            let cycles = if elapsed > 0 { elapsed / cycle } else { 0 };
            let mut last = start + cycles * cycle;
            if last < base_last_approved_at {
                last = base_last_approved_at;
            }
            let mut next = last + cycle;
            if next <= now {
                last = next;
                next += cycle;
            }
            (last, next)
        }
        Some(c) if c.is_manual() => (
            c.adjusted_last_approved_at.unwrap_or(base_last_approved_at),
            c.adjusted_next_payout_at.unwrap_or(base_next_payout_at),
        ),
        _ => (base_last_approved_at, base_next_payout_at),
    };

    let mut remaining = (next - now).max(0);
    let mut status = if remaining == 0 {
        PayoutStatus::Ready
    } else {
        PayoutStatus::Running
    };
    let mut resume_at = if status == PayoutStatus::Ready { now } else { next };

    if let Some(c) = control.filter(|c| c.paused) {
        status = PayoutStatus::Paused;
        resume_at = c
            .resume_at
            .or_else(|| c.pause_remaining_ms.map(|r| now + r.max(0)))
            .unwrap_or_else(|| if is_cycle { next } else { next.max(now) });
        remaining = if freeze_paused {
            c.pause_remaining_ms
                .unwrap_or_else(|| (resume_at - now).max(0))
                .max(0)
        } else {
            (resume_at - now).max(0)
        };
        if is_cycle {
            // While paused the anchors keep rolling; report the frozen
            // window instead so the countdown does not drift.
            next = resume_at;
            last = next - cycle_ms.unwrap_or(DEFAULT_CYCLE_MS);
        }
    }

    let duration = (next - last)
        .max(cycle_ms.unwrap_or(DEFAULT_PAYOUT_INTERVAL_MS))
        .max(1);
    let progress = ((duration - remaining) as f64 / duration as f64).clamp(0.0, 1.0);

    DerivedPayoutState {
        last_approved_at: last,
        next_payout_at: next,
        remaining_ms: remaining,
        resume_at,
        status,
        progress,
        is_cycle,
        cycle_ms,
    }
}

/// Seeds a wallet's schedule on its first successful approval.
pub fn initial_schedule(
    token: ScheduleToken,
    approved_at: i64,
    interval_ms: i64,
) -> PayoutSchedule {
    PayoutSchedule {
        last_approved_at: approved_at,
        next_payout_at: approved_at + interval_ms.max(1),
        tokens: vec![token],
    }
}

/// Records a subsequent approval. When the stored base has drifted from its
/// own derived output (a cycle rolled over, an admin retimed the wallet),
/// the base is rewritten to the derived values before the token is
/// prepended, keeping persistence self-correcting.
pub fn advance_schedule(
    schedule: &mut PayoutSchedule,
    control: Option<&PayoutControl>,
    token: ScheduleToken,
    now: i64,
) {
    let derived = derive(
        schedule.last_approved_at,
        schedule.next_payout_at,
        control,
        now,
        false,
    );
    if derived.last_approved_at != schedule.last_approved_at
        || derived.next_payout_at != schedule.next_payout_at
    {
        schedule.last_approved_at = derived.last_approved_at;
        schedule.next_payout_at = derived.next_payout_at;
    }
    schedule
        .tokens
        .retain(|t| !(t.chain_id == token.chain_id && t.address == token.address));
    schedule.tokens.insert(0, token);
}
