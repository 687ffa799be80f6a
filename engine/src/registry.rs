use alloy_primitives::Address;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::models::ChainId;

/// A token the scanner will probe on a given chain.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

/// Per-chain configuration: display name, the router (the spender address
/// approvals are granted toward) and the token table.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: ChainId,
    pub name: String,
    pub router: Option<Address>,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

/// Static table of every chain the engine operates on. Chains are scanned in
/// registry order; a chain with no router or no tokens is reported as failed
/// and skipped rather than aborting the scan.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainRegistry {
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainConfig>) -> Self {
        Self { chains }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid chain registry format")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read chain registry: {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }

    pub fn router(&self, chain_id: ChainId) -> Option<Address> {
        self.chain(chain_id).and_then(|c| c.router)
    }

    pub fn chain_name(&self, chain_id: ChainId) -> String {
        self.chain(chain_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("chain-{chain_id}"))
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
