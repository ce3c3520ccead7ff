//! Escrow buckets for yearly-payout contracts and their release.

pub mod engine;
pub mod types;

pub use engine::{EscrowError, EscrowReleaseEngine};
pub use types::{EscrowBalance, EscrowPolicy, EscrowRelease, ReleaseReason};
