//! Port traits. API boundaries for the hexagon.
//!
//! - Inbound: Called by UI/adapter into the application
//! - Outbound: Called by application into infrastructure

pub mod inbound;
pub mod lock;
pub mod outbound;

pub use inbound::InputPort;
pub use lock::{GroupLease, GroupLockPort};
pub use outbound::{ExpenseStore, GroupStore};
