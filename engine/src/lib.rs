//! Claimpilot engine: multi-chain token approval orchestration and payout
//! scheduling.
//!
//! The crate scans a connected wallet's balances and router allowances
//! across configured chains, drains the resulting approval queue one token
//! at a time (signature-based grants preferred, transactions as fallback),
//! and tracks a recurring payout entitlement window per wallet. Operators
//! retime that window through the admin control editor; the live countdown
//! is a pure derivation over the persisted schedule, the optional control
//! record and the current time.
//!
//! Wallet connectivity, RPC transport, pricing and remote persistence are
//! consumed through traits (`WalletGateway`, `PriceOracle`, `KvStore`,
//! `EventSink`) so the engine carries no implicit global state.

pub mod admin;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod payout;
pub mod pricing;
pub mod registry;
pub mod scheduler;
pub mod services;
pub mod session;
pub mod store;
pub mod utils;
pub mod wallet;


pub use admin::ControlEditor;
pub use config::EngineConfig;
pub use error::{AdminError, ApproveError, ReadError, StoreError};
pub use models::{
    ChainScanStats, DerivedPayoutState, EligibleToken, PayoutControl, PayoutSchedule,
    PayoutStatus, ScanOutcome, ScheduleToken, TokenStatus,
};
pub use registry::ChainRegistry;
pub use scheduler::PayoutTicker;
pub use services::{AllowanceScanner, ApprovalOrchestrator, ApprovalReport};
pub use session::{Session, SessionCounter};
pub use store::{FileStore, KvStore, MemoryStore, PayoutRepository};
