use alloy_primitives::Address;
use serde::Serialize;
use tracing::info;

use crate::models::ChainId;

/// Emitted once per successful approval, whichever path granted it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalEvent {
    pub wallet: Address,
    pub chain_id: ChainId,
    pub chain_name: String,
    pub token: Address,
    pub symbol: String,
    pub approved_at: i64,
    pub next_payout_at: i64,
    pub via_permit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

/// Best-effort referral registration fired alongside the approval event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferralApproval {
    pub wallet: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
    pub timestamp: i64,
}

/// External event/session persistence, consumed best-effort: failures are
/// logged by the caller and never fatal to the in-memory flow.
#[allow(async_fn_in_trait)]
pub trait EventSink: Send + Sync {
    async fn approval_granted(&self, event: &ApprovalEvent) -> anyhow::Result<()>;

    async fn referral_approval(&self, referral: &ReferralApproval) -> anyhow::Result<()>;
}

/// Sink for deployments without a backend: events land in the log stream.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    async fn approval_granted(&self, event: &ApprovalEvent) -> anyhow::Result<()> {
        info!(
            wallet = %event.wallet,
            chain = %event.chain_name,
            symbol = %event.symbol,
            via_permit = event.via_permit,
            "approval granted"
        );
        Ok(())
    }

    async fn referral_approval(&self, referral: &ReferralApproval) -> anyhow::Result<()> {
        info!(
            wallet = %referral.wallet,
            code = referral.referral_code.as_deref().unwrap_or("-"),
            "referral approval recorded"
        );
        Ok(())
    }
}
