use super::amount::Amount;
use super::ports::PaymentVerifierBox;
use super::quote::Quote;
use super::verifier::{EcashTokenVerifier, InvoicePrefixVerifier, LIGHTNING_INVOICE_PREFIX};
use crate::error::PaymentError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Payment methods offered by the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Lightning,
    Ecash,
}

impl PaymentMethod {
    /// Whether the method runs a wallet-style session with quote, countdown
    /// and tap handling.
    pub fn uses_session(self) -> bool {
        !matches!(self, Self::Card)
    }

    /// Verifier for tap payloads; `None` for card payments.
    pub fn verifier(self, amount: Amount) -> Option<PaymentVerifierBox> {
        match self {
            Self::Card => None,
            Self::Lightning => Some(Box::new(InvoicePrefixVerifier::default())),
            Self::Ecash => Some(Box::new(EcashTokenVerifier::new(amount))),
        }
    }

    /// Whether the screen shows a scannable invoice next to tap-to-pay.
    pub fn offers_scan_fallback(self) -> bool {
        matches!(self, Self::Lightning)
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Card => "Please Pay",
            Self::Lightning => "Lightning Payment",
            Self::Ecash => "eCash Payment",
        }
    }

    /// Heading shown while an expired session waits for teardown.
    pub fn expired_title(self) -> &'static str {
        match self {
            Self::Lightning => "Invoice Expired",
            _ => "Payment Request Expired",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" => Ok(Self::Card),
            "lightning" | "digital" => Ok(Self::Lightning),
            "ecash" | "cash" => Ok(Self::Ecash),
            other => Err(PaymentError::ValidationError(format!(
                "Unknown payment method '{other}'"
            ))),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Card => "card",
            Self::Lightning => "lightning",
            Self::Ecash => "ecash",
        };
        f.write_str(name)
    }
}

/// A submitted amount with its selected method.
///
/// Construction is the only place raw keypad text is validated; sessions
/// trust the amount they are given.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentRequest {
    pub amount: Amount,
    pub method: PaymentMethod,
}

impl PaymentRequest {
    pub fn new(amount: &str, method: PaymentMethod) -> Result<Self, PaymentError> {
        Ok(Self {
            amount: amount.parse()?,
            method,
        })
    }
}

/// Demo invoice shown as a QR fallback on the Lightning screen.
pub fn mock_invoice(quote: &Quote) -> String {
    format!(
        "{LIGHTNING_INVOICE_PREFIX}{}n1p3hkummpp5k6rh3uee9k9rk4znnrn4xqkf0ny8h9ue4e6qnhwjzs8yegf8hqhp5",
        quote.sats_display()
    )
}
