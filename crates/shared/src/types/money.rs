//! Money type with decimal precision and currency.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` for arbitrary precision.
//! Payment gateways exchange amounts in minor units (kobo, pesewas, cents);
//! conversion happens here and nowhere else.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Represents a monetary amount with currency.
///
/// Uses `Decimal` internally to avoid floating-point precision errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount in major currency units (e.g., naira, not kobo).
    pub amount: Decimal,
    /// ISO 4217 currency code (e.g., "NGN", "GHS").
    pub currency: Currency,
}

/// ISO 4217 currency codes supported by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Nigerian Naira
    Ngn,
    /// Ghanaian Cedi
    Ghs,
    /// Kenyan Shilling
    Kes,
    /// South African Rand
    Zar,
    /// US Dollar
    Usd,
}

/// Errors raised when converting to or from minor units.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// The amount has more precision than the currency's minor unit.
    #[error("Amount {0} has sub-minor-unit precision")]
    FractionalMinorUnits(Decimal),
    /// The amount does not fit in a 64-bit minor-unit count.
    #[error("Amount {0} is out of range")]
    OutOfRange(Decimal),
}

impl Currency {
    /// Number of minor units per major unit.
    #[must_use]
    pub const fn minor_unit_scale(self) -> u32 {
        match self {
            Self::Ngn | Self::Ghs | Self::Kes | Self::Zar | Self::Usd => 2,
        }
    }
}

impl Money {
    /// Creates a new Money instance.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Creates a zero amount in the specified currency.
    #[must_use]
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Builds an amount from a gateway minor-unit integer.
    #[must_use]
    pub fn from_minor_units(minor: i64, currency: Currency) -> Self {
        Self {
            amount: Decimal::new(minor, currency.minor_unit_scale()),
            currency,
        }
    }

    /// Converts to a gateway minor-unit integer.
    ///
    /// # Errors
    ///
    /// Fails when the amount carries precision below one minor unit or overflows `i64`.
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        let factor = Decimal::from(10_i64.pow(self.currency.minor_unit_scale()));
        let scaled = self
            .amount
            .checked_mul(factor)
            .ok_or(MoneyError::OutOfRange(self.amount))?;
        if scaled.fract() != Decimal::ZERO {
            return Err(MoneyError::FractionalMinorUnits(self.amount));
        }
        scaled
            .to_i64()
            .ok_or(MoneyError::OutOfRange(self.amount))
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ngn => write!(f, "NGN"),
            Self::Ghs => write!(f, "GHS"),
            Self::Kes => write!(f, "KES"),
            Self::Zar => write!(f, "ZAR"),
            Self::Usd => write!(f, "USD"),
        }
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NGN" => Ok(Self::Ngn),
            "GHS" => Ok(Self::Ghs),
            "KES" => Ok(Self::Kes),
            "ZAR" => Ok(Self::Zar),
            "USD" => Ok(Self::Usd),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}
