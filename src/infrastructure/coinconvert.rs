use crate::config::QuoteConfig;
use crate::domain::amount::Amount;
use crate::domain::ports::QuoteSource;
use crate::domain::quote::Quote;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Quote source backed by the CoinConvert HTTP API.
///
/// Issues `GET {base_url}/convert/{source}/{target}?amount={amount}` and
/// expects `{"status": "success", "<TARGET>": <number>}`. Every call goes to
/// the network; nothing is cached.
#[derive(Clone)]
pub struct CoinConvertQuoteSource {
    client: reqwest::Client,
    endpoint: String,
    target_currency: String,
}

impl CoinConvertQuoteSource {
    pub fn new(config: &QuoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/convert/{}/{}",
                config.base_url.trim_end_matches('/'),
                config.source_currency,
                config.target_currency
            ),
            target_currency: config.target_currency.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl QuoteSource for CoinConvertQuoteSource {
    async fn fetch(&self, amount: Amount) -> Result<Quote> {
        debug!(endpoint = %self.endpoint, amount = %amount, "Requesting price quote");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("amount", amount.to_string())])
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;

        parse_response(&body, &self.target_currency).inspect_err(|e| {
            warn!(error = %e, "Unexpected price quote response");
        })
    }
}

/// A converted amount read from the JSON number as written, without
/// passing through binary floating point.
#[derive(Deserialize)]
#[serde(transparent)]
struct Converted(#[serde(with = "rust_decimal::serde::float")] Decimal);

/// Extracts a quote from a conversion response body.
pub fn parse_response(body: &Value, target_currency: &str) -> Result<Quote> {
    let status = body.get("status").and_then(Value::as_str);
    if status != Some("success") {
        return Err(PaymentError::QuoteFetch(format!(
            "Conversion failed with status {}",
            status.unwrap_or("<missing>")
        )));
    }

    let key = target_currency.to_uppercase();
    let converted = body
        .get(&key)
        .filter(|value| value.is_number())
        .ok_or_else(|| {
            PaymentError::QuoteFetch(format!("Response has no numeric '{key}' value"))
        })?;
    let Converted(btc) = Converted::deserialize(converted)
        .map_err(|e| PaymentError::QuoteFetch(format!("Invalid converted amount: {e}")))?;

    Quote::from_btc(btc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_success_response() {
        let body = json!({ "status": "success", "USD": 10, "BTC": 0.00012345 });
        let quote = parse_response(&body, "btc").unwrap();
        assert_eq!(quote.btc_display(), "0.00012345");
        assert_eq!(quote.sats(), 12_345);
        assert_eq!(quote.btc(), dec!(0.00012345));
    }

    #[test]
    fn test_parse_keeps_decimal_digits_exact() {
        let body = json!({ "status": "success", "BTC": 0.1 });
        assert_eq!(parse_response(&body, "btc").unwrap().btc(), dec!(0.1));

        let body = json!({ "status": "success", "BTC": 0.000000015 });
        let quote = parse_response(&body, "btc").unwrap();
        assert_eq!(quote.btc(), dec!(0.000000015));
        assert_eq!(quote.sats(), 2);
    }

    #[test]
    fn test_parse_rejects_error_status() {
        let body = json!({ "status": "error", "message": "rate limited" });
        assert!(matches!(
            parse_response(&body, "btc"),
            Err(PaymentError::QuoteFetch(_))
        ));
    }

    #[test]
    fn test_parse_rejects_missing_status() {
        let body = json!({ "BTC": 0.1 });
        assert!(parse_response(&body, "btc").is_err());
    }

    #[test]
    fn test_parse_rejects_non_numeric_value() {
        let body = json!({ "status": "success", "BTC": "0.1" });
        assert!(parse_response(&body, "btc").is_err());

        let body = json!({ "status": "success", "BTC": 0 });
        assert!(parse_response(&body, "btc").is_err());
    }

    #[test]
    fn test_endpoint_from_config() {
        let config = QuoteConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..QuoteConfig::default()
        };
        let source = CoinConvertQuoteSource::new(&config).unwrap();
        assert_eq!(source.endpoint(), "http://localhost:8080/convert/usd/btc");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let config = QuoteConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..QuoteConfig::default()
        };
        let source = CoinConvertQuoteSource::new(&config).unwrap();
        let amount: Amount = "10".parse().unwrap();
        assert!(source.fetch(amount).await.is_err());
    }
}
