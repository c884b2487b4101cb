#![allow(dead_code)]

use smart_eftpos::application::session::{PaymentSession, SessionEvent, SessionHandle};
use smart_eftpos::config::SessionConfig;
use smart_eftpos::domain::amount::Amount;
use smart_eftpos::domain::method::PaymentMethod;
use smart_eftpos::domain::ports::{QuoteSourceRef, TapCapability};
use smart_eftpos::infrastructure::in_memory::{ChannelTapReader, FixedRateQuoteSource, TapInjector};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Duration, Instant};

/// A running session with its tap injector and teardown counter.
pub struct Harness {
    pub handle: SessionHandle,
    pub events: UnboundedReceiver<SessionEvent>,
    pub injector: TapInjector,
    pub quotes: FixedRateQuoteSource,
    teardowns: Arc<AtomicUsize>,
    start: Instant,
}

impl Harness {
    /// Starts a session for `amount` with an enabled tap reader and a fixed
    /// rate of 0.00001 BTC per USD.
    pub fn start(method: PaymentMethod, amount: &str) -> Self {
        let quotes = FixedRateQuoteSource::new(dec!(0.00001));
        Self::start_with(method, amount, Arc::new(quotes.clone()), quotes)
    }

    pub fn start_with(
        method: PaymentMethod,
        amount: &str,
        quote_source: QuoteSourceRef,
        quotes: FixedRateQuoteSource,
    ) -> Self {
        let amount: Amount = amount.parse().unwrap();
        let (reader, injector) = ChannelTapReader::new();
        let teardowns = Arc::new(AtomicUsize::new(0));
        let counter = teardowns.clone();

        let mut handle = PaymentSession::start(
            SessionConfig::default(),
            amount,
            quote_source,
            method.verifier(amount).unwrap(),
            TapCapability::Enabled(Box::new(reader)),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        let events = handle.take_events().unwrap();

        Self {
            handle,
            events,
            injector,
            quotes,
            teardowns,
            start: Instant::now(),
        }
    }

    pub fn teardowns(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Next event other than a countdown tick, with the time it arrived.
    pub async fn next_event(&mut self) -> Option<(Duration, SessionEvent)> {
        loop {
            match self.events.recv().await? {
                SessionEvent::Tick { .. } => continue,
                event => return Some((self.elapsed(), event)),
            }
        }
    }

    /// Skips events until the quote is ready.
    pub async fn wait_for_quote(&mut self) {
        while let Some((_, event)) = self.next_event().await {
            if matches!(event, SessionEvent::QuoteReady(_)) {
                return;
            }
        }
        panic!("session ended before a quote arrived");
    }

    /// Sleeps until `offset` after the session started.
    pub async fn sleep_until(&self, offset: Duration) {
        tokio::time::sleep_until(self.start + offset).await;
    }
}

pub fn ecash_token(amount: &str) -> String {
    format!(r#"{{"amount":"{amount}","currency":"USD"}}"#)
}
