use super::amount::group_thousands;
use crate::error::PaymentError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Number of satoshis in one bitcoin.
pub const SATS_PER_BTC: u64 = 100_000_000;

/// Decimal places shown for the BTC side of a quote.
pub const BTC_DISPLAY_SCALE: u32 = 8;

/// A converted amount: the BTC value returned by the quote source and the
/// derived satoshi count.
///
/// Quotes are immutable once built; a session that needs a new price must be
/// restarted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quote {
    btc: Decimal,
    sats: u64,
}

impl Quote {
    /// Builds a quote from a BTC value, deriving `sats = round(btc * 10^8)`
    /// with halves rounded away from zero.
    pub fn from_btc(btc: Decimal) -> Result<Self, PaymentError> {
        if btc <= Decimal::ZERO {
            return Err(PaymentError::QuoteFetch(format!(
                "Converted amount must be positive, got {btc}"
            )));
        }
        let sats = btc
            .checked_mul(Decimal::from(SATS_PER_BTC))
            .map(|v| v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|v| v.to_u64())
            .ok_or_else(|| {
                PaymentError::QuoteFetch(format!("Converted amount {btc} is out of range"))
            })?;
        Ok(Self { btc, sats })
    }

    pub fn btc(&self) -> Decimal {
        self.btc
    }

    pub fn sats(&self) -> u64 {
        self.sats
    }

    /// BTC with exactly eight decimal digits, e.g. `0.00012345`.
    pub fn btc_display(&self) -> String {
        let mut btc = self
            .btc
            .round_dp_with_strategy(BTC_DISPLAY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        btc.rescale(BTC_DISPLAY_SCALE);
        btc.to_string()
    }

    /// Satoshis grouped in thousands, e.g. `12,345`.
    pub fn sats_display(&self) -> String {
        group_thousands(self.sats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_derives_sats() {
        let quote = Quote::from_btc(dec!(0.00012345)).unwrap();
        assert_eq!(quote.sats(), 12_345);
        assert_eq!(quote.sats_display(), "12,345");
        assert_eq!(quote.btc_display(), "0.00012345");
    }

    #[test]
    fn test_quote_rounds_half_away_from_zero() {
        assert_eq!(Quote::from_btc(dec!(0.000000015)).unwrap().sats(), 2);
        assert_eq!(Quote::from_btc(dec!(0.000000014999)).unwrap().sats(), 1);
    }

    #[test]
    fn test_btc_display_pads_and_rounds() {
        assert_eq!(Quote::from_btc(dec!(1)).unwrap().btc_display(), "1.00000000");
        assert_eq!(
            Quote::from_btc(dec!(0.123456789)).unwrap().btc_display(),
            "0.12345679"
        );
    }

    #[test]
    fn test_quote_rejects_non_positive() {
        assert!(matches!(
            Quote::from_btc(dec!(0)),
            Err(PaymentError::QuoteFetch(_))
        ));
        assert!(matches!(
            Quote::from_btc(dec!(-0.1)),
            Err(PaymentError::QuoteFetch(_))
        ));
    }
}
