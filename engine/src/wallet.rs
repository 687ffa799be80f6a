use alloy_primitives::{Address, B256, U256};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{ApproveError, ReadResult};
use crate::models::ChainId;

/// ERC-20 `approve(address,uint256)` selector.
pub const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// Typed, chain-scoped authorization payload for the signature-based
/// allowance path. The deadline is epoch seconds, fixed at 30 days from
/// signing time by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitPayload {
    pub chain_id: ChainId,
    pub token: Address,
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    pub nonce: U256,
    pub deadline: i64,
}

/// Canonical decomposition of a 65-byte secp256k1 signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureParts {
    pub r: B256,
    pub s: B256,
    pub v: u8,
}

impl SignatureParts {
    /// Splits a raw `r || s || v` signature. Recovery ids 0/1 are normalized
    /// to the legacy 27/28 form.
    pub fn from_raw(signature: &[u8]) -> Result<Self, ApproveError> {
        if signature.len() != 65 {
            return Err(ApproveError::MalformedSignature(format!(
                "expected 65 bytes, got {}",
                signature.len()
            )));
        }
        let r = B256::from_slice(&signature[..32]);
        let s = B256::from_slice(&signature[32..64]);
        let mut v = signature[64];
        if v < 27 {
            v += 27;
        }
        Ok(Self { r, s, v })
    }
}

/// Calldata for a standard allowance-granting transaction.
pub fn approve_calldata(spender: Address, value: U256) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32 + 32);
    data.extend_from_slice(&APPROVE_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(spender.as_slice());
    data.extend_from_slice(&value.to_be_bytes::<32>());
    data
}

/// Wallet and chain capability consumed by the scanner and orchestrator.
/// All methods may fail; read failures degrade to defaults at the call
/// site, execution failures distinguish user rejection from everything
/// else. Implementations wrap the actual wallet connection and RPC
/// transport, which are outside this crate.
#[allow(async_fn_in_trait)]
pub trait WalletGateway: Send + Sync {
    /// The currently connected account, if any.
    fn wallet(&self) -> Option<Address>;

    /// Whether a signer is available for the permit path.
    fn can_sign(&self) -> bool;

    async fn active_chain(&self) -> ReadResult<ChainId>;

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), ApproveError>;

    async fn read_balance(&self, chain_id: ChainId, token: Address, owner: Address)
        -> ReadResult<U256>;

    async fn read_allowance(
        &self,
        chain_id: ChainId,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> ReadResult<U256>;

    /// Batched balance read with per-item success/failure. The outer result
    /// covers the batch transport itself.
    async fn read_balances(
        &self,
        chain_id: ChainId,
        owner: Address,
        tokens: &[Address],
    ) -> ReadResult<Vec<ReadResult<U256>>>;

    async fn read_allowances(
        &self,
        chain_id: ChainId,
        owner: Address,
        spender: Address,
        tokens: &[Address],
    ) -> ReadResult<Vec<ReadResult<U256>>>;

    /// Capability probe: does this token support signature-based allowance
    /// grants? Must not mutate anything.
    async fn supports_permit(&self, chain_id: ChainId, token: Address) -> ReadResult<bool>;

    async fn permit_nonce(&self, chain_id: ChainId, token: Address, owner: Address)
        -> ReadResult<U256>;

    /// Requests a typed-data signature over the permit payload. Returns the
    /// raw 65-byte signature.
    async fn sign_typed_data(&self, payload: &PermitPayload) -> Result<Vec<u8>, ApproveError>;

    /// Submits a transaction and returns its hash.
    async fn send_transaction(
        &self,
        chain_id: ChainId,
        to: Address,
        data: Vec<u8>,
    ) -> Result<String, ApproveError>;
}

/// Serializes chain-switch requests. Overlapping requests queue behind the
/// in-flight switch and re-check the active chain once they acquire the
/// lock, so concurrent switches never race or issue duplicates.
#[derive(Debug, Default)]
pub struct ChainSwitcher {
    lock: Mutex<()>,
}

impl ChainSwitcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ensure<G: WalletGateway>(
        &self,
        gateway: &G,
        chain_id: ChainId,
    ) -> Result<(), ApproveError> {
        let _guard = self.lock.lock().await;
        let active = gateway
            .active_chain()
            .await
            .map_err(|e| ApproveError::ChainSwitch(e.to_string()))?;
        if active == chain_id {
            return Ok(());
        }
        debug!(from = active, to = chain_id, "switching chain");
        gateway.switch_chain(chain_id).await
    }
}
