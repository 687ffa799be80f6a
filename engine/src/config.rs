use std::env;
use std::path::PathBuf;

/// Default payout entitlement window: 24 hours.
pub const DEFAULT_PAYOUT_INTERVAL_MS: i64 = 86_400_000;

/// Default recurring cycle length, used when a cycle control carries no
/// explicit length.
pub const DEFAULT_CYCLE_MS: i64 = DEFAULT_PAYOUT_INTERVAL_MS;

/// Permit deadlines are fixed at 30 days from signing time.
pub const PERMIT_DEADLINE_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Entitlement window applied when a wallet's first approval seeds its
    /// schedule.
    pub payout_interval_ms: i64,
    /// Cycle length seeded by the admin "start cycle" action.
    pub default_cycle_ms: i64,
    /// Pause between queue items after a success or failure, keeps the
    /// surface legible while the queue drains.
    pub approval_cooldown_ms: u64,
    /// Pause before re-offering a token the user rejected.
    pub rejection_cooldown_ms: u64,
    /// Countdown recompute interval for live displays.
    pub tick_interval_ms: u64,
    /// Referral code attached to best-effort referral registrations.
    pub referral_code: Option<String>,
    /// Backing file for the file-based store adapter.
    pub store_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            payout_interval_ms: DEFAULT_PAYOUT_INTERVAL_MS,
            default_cycle_ms: DEFAULT_CYCLE_MS,
            approval_cooldown_ms: 1_500,
            rejection_cooldown_ms: 2_000,
            tick_interval_ms: 1_000,
            referral_code: None,
            store_path: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let payout_interval_ms = env::var("PAYOUT_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.payout_interval_ms);

        let default_cycle_ms = env::var("PAYOUT_CYCLE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.default_cycle_ms);

        let approval_cooldown_ms = env::var("APPROVAL_COOLDOWN_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.approval_cooldown_ms);

        let rejection_cooldown_ms = env::var("REJECTION_COOLDOWN_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rejection_cooldown_ms);

        let tick_interval_ms = env::var("TICK_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.tick_interval_ms);

        let referral_code = env::var("REFERRAL_CODE").ok().filter(|v| !v.is_empty());

        let store_path = env::var("STORE_PATH").ok().map(PathBuf::from);

        Self {
            payout_interval_ms,
            default_cycle_ms,
            approval_cooldown_ms,
            rejection_cooldown_ms,
            tick_interval_ms,
            referral_code,
            store_path,
        }
    }
}
