use alloy_primitives::Address;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::models::{PayoutControl, PayoutSchedule, TokenKey};

/// Wallet-scoped key-value persistence. The engine owns no implicit global
/// state; everything the original surface kept in ambient browser storage
/// (approved-set cache, schedules, control records) lives behind this
/// interface, and the backing store is a swappable adapter.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
    fn keys(&self, prefix: &str) -> StoreResult<Vec<String>>;
}

/// In-memory adapter, used in tests and as the default for ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let map = self
            .map
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut map = self
            .map
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut map = self
            .map
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        map.remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let map = self
            .map
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut keys: Vec<String> = map.keys().filter(|k| k.starts_with(prefix)).cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// JSON-file adapter for the operator CLI. The whole map is rewritten on
/// every mutation; record-level durability is out of scope here.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    map: RwLock<HashMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let map = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            map: RwLock::new(map),
        })
    }

    fn persist(&self, map: &HashMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(map)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let map = self
            .map
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut map = self
            .map
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        map.insert(key.to_string(), value.to_string());
        self.persist(&map)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut map = self
            .map
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if map.remove(key).is_some() {
            self.persist(&map)?;
        }
        Ok(())
    }

    fn keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let map = self
            .map
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut keys: Vec<String> = map.keys().filter(|k| k.starts_with(prefix)).cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

const SCHEDULE_PREFIX: &str = "payout:schedule:";
const CONTROL_PREFIX: &str = "payout:control:";
const APPROVED_PREFIX: &str = "approved:";

fn wallet_suffix(wallet: Address) -> String {
    format!("{wallet:#x}")
}

pub fn schedule_key(wallet: Address) -> String {
    format!("{SCHEDULE_PREFIX}{}", wallet_suffix(wallet))
}

pub fn control_key(wallet: Address) -> String {
    format!("{CONTROL_PREFIX}{}", wallet_suffix(wallet))
}

pub fn approved_key(wallet: Address) -> String {
    format!("{APPROVED_PREFIX}{}", wallet_suffix(wallet))
}

/// Typed access to payout schedules, control records and the approved-set
/// cache over any `KvStore` backing.
#[derive(Debug)]
pub struct PayoutRepository<K: KvStore> {
    store: Arc<K>,
}

impl<K: KvStore> Clone for PayoutRepository<K> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<K: KvStore> PayoutRepository<K> {
    pub fn new(store: Arc<K>) -> Self {
        Self { store }
    }

    pub fn schedule(&self, wallet: Address) -> StoreResult<Option<PayoutSchedule>> {
        match self.store.get(&schedule_key(wallet))? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set_schedule(&self, wallet: Address, schedule: &PayoutSchedule) -> StoreResult<()> {
        let raw = serde_json::to_string(schedule)?;
        self.store.set(&schedule_key(wallet), &raw)
    }

    /// Loads the control record for a wallet. A stored record carrying none
    /// of {paused, manual adjustment, cycle} is invalid and is treated as
    /// "no override".
    pub fn control(&self, wallet: Address) -> StoreResult<Option<PayoutControl>> {
        match self.store.get(&control_key(wallet))? {
            Some(raw) => {
                let control: PayoutControl = serde_json::from_str(&raw)?;
                Ok(control.normalized())
            }
            None => Ok(None),
        }
    }

    /// Replaces the control record; `None` clears it. An empty record is
    /// normalized to a clear.
    pub fn set_control(&self, wallet: Address, control: Option<&PayoutControl>) -> StoreResult<()> {
        match control {
            Some(c) if !c.is_empty() => {
                let raw = serde_json::to_string(c)?;
                self.store.set(&control_key(wallet), &raw)
            }
            _ => self.store.remove(&control_key(wallet)),
        }
    }

    /// Every wallet with a live control record.
    pub fn controls(&self) -> StoreResult<Vec<(Address, PayoutControl)>> {
        let mut out = Vec::new();
        for key in self.store.keys(CONTROL_PREFIX)? {
            let suffix = &key[CONTROL_PREFIX.len()..];
            let Ok(wallet) = suffix.parse::<Address>() else {
                warn!(key = %key, "skipping control record with malformed wallet key");
                continue;
            };
            if let Some(control) = self.control(wallet)? {
                out.push((wallet, control));
            }
        }
        Ok(out)
    }

    pub fn approved_set(&self, wallet: Address) -> StoreResult<HashSet<String>> {
        match self.store.get(&approved_key(wallet))? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(HashSet::new()),
        }
    }

    pub fn set_approved_set(&self, wallet: Address, set: &HashSet<String>) -> StoreResult<()> {
        if set.is_empty() {
            return self.store.remove(&approved_key(wallet));
        }
        let raw = serde_json::to_string(set)?;
        self.store.set(&approved_key(wallet), &raw)
    }

    pub fn mark_approved(&self, wallet: Address, token: &TokenKey) -> StoreResult<()> {
        let mut set = self.approved_set(wallet)?;
        if set.insert(token.storage_key()) {
            self.set_approved_set(wallet, &set)?;
        }
        Ok(())
    }
}
