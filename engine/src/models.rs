use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

pub type ChainId = u64;

// ==================== Scan Models ====================

/// Queue-row lifecycle for a token moving through the approval pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenStatus {
    Pending,
    Approved,
    Signed,
    NeedsApprove,
    Error,
}

/// A token found by the scanner with a positive balance. Identity is
/// `(chain_id, address)`; the orchestrator mutates `status` in place as the
/// queue is consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibleToken {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    pub balance: U256,
    pub allowance: U256,
    pub usd_price: Option<f64>,
    pub usd_value: Option<f64>,
    pub status: TokenStatus,
}

impl EligibleToken {
    /// Eligibility invariant: positive balance and an allowance that does
    /// not yet cover it.
    pub fn is_eligible(&self) -> bool {
        self.balance > U256::ZERO && self.allowance < self.balance
    }

    pub fn key(&self) -> TokenKey {
        TokenKey {
            chain_id: self.chain_id,
            address: self.address,
        }
    }
}

/// Cross-chain token identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenKey {
    pub chain_id: ChainId,
    pub address: Address,
}

impl TokenKey {
    /// Canonical form used in the wallet-scoped approved-set cache.
    pub fn storage_key(&self) -> String {
        format!("{}:{:#x}", self.chain_id, self.address)
    }
}

/// Per-chain scan report. A chain that could not be scanned at all carries
/// `ok: false` and a reason; the overall scan still succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainScanStats {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub ok: bool,
    pub scanned: usize,
    pub eligible: usize,
    pub already_approved: usize,
    pub error: Option<String>,
}

impl ChainScanStats {
    pub fn failed(chain_id: ChainId, chain_name: &str, reason: impl Into<String>) -> Self {
        Self {
            chain_id,
            chain_name: chain_name.to_string(),
            ok: false,
            scanned: 0,
            eligible: 0,
            already_approved: 0,
            error: Some(reason.into()),
        }
    }
}

/// Result of a full multi-chain scan. An unrecoverable scan-wide condition
/// (no wallet connected) yields an empty outcome with a user-facing
/// `message` rather than an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub chains: Vec<ChainScanStats>,
    pub eligible: Vec<EligibleToken>,
    pub already_approved: Vec<EligibleToken>,
    pub message: Option<String>,
}

impl ScanOutcome {
    pub fn empty_with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }
}

// ==================== Payout Models ====================

/// A token recorded against a wallet's payout schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleToken {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub symbol: String,
    pub address: Address,
}

impl From<&EligibleToken> for ScheduleToken {
    fn from(t: &EligibleToken) -> Self {
        Self {
            chain_id: t.chain_id,
            chain_name: t.chain_name.clone(),
            symbol: t.symbol.clone(),
            address: t.address,
        }
    }
}

/// Per-wallet base schedule, created on the first successful approval and
/// persisted externally. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutSchedule {
    pub last_approved_at: i64,
    pub next_payout_at: i64,
    pub tokens: Vec<ScheduleToken>,
}

/// Optional admin override record, at most one live per wallet. Manual
/// adjustment and recurring cycle are alternatives; `paused` is orthogonal
/// and may accompany either.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutControl {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjusted_last_approved_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjusted_next_payout_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_start_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_remaining_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_at: Option<i64>,
}

impl PayoutControl {
    pub fn is_cycle(&self) -> bool {
        self.cycle_start_at.is_some()
    }

    pub fn is_manual(&self) -> bool {
        self.adjusted_last_approved_at.is_some() || self.adjusted_next_payout_at.is_some()
    }

    /// A record with none of {paused, manual adjustment, cycle} is not a
    /// valid stored record and must be treated as "no override".
    pub fn is_empty(&self) -> bool {
        !self.paused && !self.is_manual() && !self.is_cycle()
    }

    pub fn normalized(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// Live payout status for a wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Paused,
    Ready,
    Running,
}

impl std::fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutStatus::Paused => write!(f, "paused"),
            PayoutStatus::Ready => write!(f, "ready"),
            PayoutStatus::Running => write!(f, "running"),
        }
    }
}

/// Output of the payout state machine. Never persisted; recomputed on every
/// tick from the base schedule, the optional control record and `now`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedPayoutState {
    pub last_approved_at: i64,
    pub next_payout_at: i64,
    pub remaining_ms: i64,
    pub resume_at: i64,
    pub status: PayoutStatus,
    pub progress: f64,
    pub is_cycle: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_ms: Option<i64>,
}
