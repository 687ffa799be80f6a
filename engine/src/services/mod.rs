pub mod approvals;
pub mod scanner;

pub use approvals::{ApprovalOrchestrator, ApprovalReport};
pub use scanner::AllowanceScanner;
