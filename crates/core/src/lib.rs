//! Core business logic for Rentflow.
//!
//! This crate contains the rent payment and escrow engine with ZERO web or
//! database dependencies. Persistence, the payment processor and message
//! delivery sit behind ports ([`store::LedgerStore`], [`gateway::PaymentGateway`],
//! [`notification::NotificationSender`]) implemented by outer crates.
//!
//! # Modules
//!
//! - `contract` - Rent contracts, due-date schedule and arrears
//! - `payment` - Payment processing, checkout, withdrawals and webhooks
//! - `escrow` - Escrow accumulation and release for yearly payouts
//! - `wallet` - Landlord wallet ledger
//! - `notification` - Reminder, escalation and receipt scheduling
//! - `jobs` - Scheduled job runner with retry and metrics
//! - `store` - Ledger Store port plus an in-memory implementation
//! - `gateway` - Payment Gateway port plus a sandbox implementation

pub mod clock;
pub mod contract;
pub mod error;
pub mod escrow;
pub mod gateway;
pub mod jobs;
pub mod notification;
pub mod payment;
pub mod store;
pub mod wallet;
