//! HTTP adapter for a Paystack-compatible payment processor.
//!
//! - [`PaystackClient`] implements the core [`PaymentGateway`](rentflow_core::gateway::PaymentGateway) port
//! - [`WebhookVerifier`] checks `x-paystack-signature` headers
//! - [`generate_reference`] builds `{PREFIX}_{millis}_{random}` references

mod client;
mod reference;
mod webhook;
mod wire;

pub use client::PaystackClient;
pub use reference::generate_reference;
pub use webhook::{SIGNATURE_HEADER, WebhookVerifier};
