//! Tap payload verifiers, one per wallet-style payment method.
//!
//! Both are placeholders for real signature and amount checks: they only look
//! at the shape of the payload.

use super::amount::Amount;
use super::ports::PaymentVerifier;
use serde::Deserialize;

/// Prefix of a BOLT11 mainnet invoice.
pub const LIGHTNING_INVOICE_PREFIX: &str = "lnbc";

/// Currency code an eCash token must carry.
pub const ECASH_CURRENCY: &str = "USD";

/// Accepts any payload that starts with a fixed invoice tag.
#[derive(Debug, Clone)]
pub struct InvoicePrefixVerifier {
    prefix: String,
}

impl InvoicePrefixVerifier {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for InvoicePrefixVerifier {
    fn default() -> Self {
        Self::new(LIGHTNING_INVOICE_PREFIX)
    }
}

impl PaymentVerifier for InvoicePrefixVerifier {
    fn verify(&self, payload: &str) -> bool {
        payload.starts_with(&self.prefix)
    }
}

#[derive(Deserialize)]
struct EcashToken {
    amount: String,
    currency: String,
}

/// Accepts JSON tokens of the form `{"amount": "<amount>", "currency": "USD"}`.
///
/// The amount is compared as text against the session amount, so `"12.50"`
/// does not match a session for `12.5`, and a numeric `amount` never matches.
#[derive(Debug, Clone)]
pub struct EcashTokenVerifier {
    amount: String,
}

impl EcashTokenVerifier {
    pub fn new(amount: Amount) -> Self {
        Self {
            amount: amount.to_string(),
        }
    }
}

impl PaymentVerifier for EcashTokenVerifier {
    fn verify(&self, payload: &str) -> bool {
        match serde_json::from_str::<EcashToken>(payload) {
            Ok(token) => token.amount == self.amount && token.currency == ECASH_CURRENCY,
            Err(_) => false,
        }
    }
}
