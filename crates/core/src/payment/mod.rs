//! Payment Processor: rent collection, payout routing and landlord withdrawals.

pub mod error;
pub mod processor;
pub mod types;
pub mod webhook;
mod withdrawal;

#[cfg(test)]
pub(crate) mod testing;

pub use error::PaymentError;
pub use processor::{PaymentProcessor, PaymentSettings};
pub use types::{
    InitializePaymentInput, InitializedPayment, PaymentMethod, PaymentRecord, PaymentResult,
    PaymentStatus, PayoutAccount, PayoutRouting, ProcessPaymentInput, RegisterPayoutAccountInput,
    StoredAuthorization, WithdrawalResult,
};
pub use webhook::{GatewayEvent, WebhookOutcome};
