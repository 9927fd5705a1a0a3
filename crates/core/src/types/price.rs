//! Decimal prices and their payment-provider representation.
//!
//! Catalog and checkout prices are expressed in major units (rupees,
//! dollars). Payment providers want integer minor units, so [`Price`]
//! owns the one conversion between the two.

use core::fmt;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

/// Errors produced while building or converting a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Prices cannot be negative.
    #[error("price cannot be negative")]
    Negative,
    /// The amount does not fit in `i64` minor units.
    #[error("price is too large")]
    Overflow,
    /// A floating-point input was NaN or infinite.
    #[error("price is not a finite number")]
    NotFinite,
}

/// Error returned for an unsupported currency code.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported currency code: {0}")]
pub struct CurrencyCodeError(String);

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for amounts below zero.
    pub fn new(amount: Decimal, currency_code: CurrencyCode) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self {
            amount,
            currency_code,
        })
    }

    /// Build a price from a JSON-style floating point number.
    ///
    /// # Errors
    ///
    /// Returns an error when the number is not finite, is negative, or is
    /// out of `Decimal` range.
    pub fn from_f64(amount: f64, currency_code: CurrencyCode) -> Result<Self, PriceError> {
        if !amount.is_finite() {
            return Err(PriceError::NotFinite);
        }
        let amount = Decimal::from_f64_retain(amount).ok_or(PriceError::Overflow)?;
        Self::new(amount, currency_code)
    }

    /// Amount in minor units (paise, cents), rounded half away from zero.
    ///
    /// ```
    /// use bagrit_core::{CurrencyCode, Price};
    /// use rust_decimal::Decimal;
    ///
    /// let price = Price::new(Decimal::new(1999, 2), CurrencyCode::INR).unwrap();
    /// assert_eq!(price.minor_units().unwrap(), 1999);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Overflow`] if the result exceeds `i64`.
    pub fn minor_units(&self) -> Result<i64, PriceError> {
        let scaled = self
            .amount
            .checked_mul(Decimal::from(self.currency_code.minor_unit_factor()))
            .ok_or(PriceError::Overflow)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        scaled.to_i64().ok_or(PriceError::Overflow)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency_code)
    }
}

/// ISO 4217 currency codes accepted by checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Upper-case ISO code, e.g. `INR`.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }

    /// Lower-case code as Stripe expects it in `price_data[currency]`.
    #[must_use]
    pub const fn stripe_code(&self) -> &'static str {
        match self {
            Self::INR => "inr",
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
        }
    }

    /// Number of minor units per major unit. All supported codes use two
    /// decimal places.
    #[must_use]
    pub const fn minor_unit_factor(&self) -> i64 {
        100
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Self::INR),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            _ => Err(CurrencyCodeError(s.to_owned())),
        }
    }
}
