use crate::domain::amount::Amount;
use crate::domain::ports::{NfcPlatform, QuoteSource, TapReader, TapReaderBox};
use crate::domain::quote::Quote;
use crate::domain::tap::{NdefMessage, NdefRecord, TapEvent};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc};

/// An offline quote source converting at a fixed BTC-per-unit rate.
///
/// Counts calls so tests can assert that a session fetches exactly once.
#[derive(Debug, Clone)]
pub struct FixedRateQuoteSource {
    btc_per_unit: Decimal,
    calls: Arc<AtomicUsize>,
}

impl FixedRateQuoteSource {
    pub fn new(btc_per_unit: Decimal) -> Self {
        Self {
            btc_per_unit,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for FixedRateQuoteSource {
    async fn fetch(&self, amount: Amount) -> Result<Quote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let btc = amount
            .value()
            .checked_mul(self.btc_per_unit)
            .ok_or_else(|| PaymentError::QuoteFetch("Conversion overflowed".to_string()))?;
        Quote::from_btc(btc)
    }
}

/// A tap reader fed through a channel.
///
/// The paired [`TapInjector`] plays the role of the NFC radio.
pub struct ChannelTapReader {
    events: mpsc::UnboundedReceiver<TapEvent>,
    released: Arc<AtomicBool>,
}

/// Sends simulated tap events to a [`ChannelTapReader`].
#[derive(Clone)]
pub struct TapInjector {
    events: mpsc::UnboundedSender<TapEvent>,
    released: Arc<AtomicBool>,
}

impl ChannelTapReader {
    pub fn new() -> (Self, TapInjector) {
        let (tx, rx) = mpsc::unbounded_channel();
        let released = Arc::new(AtomicBool::new(false));
        let reader = Self {
            events: rx,
            released: released.clone(),
        };
        let injector = TapInjector {
            events: tx,
            released,
        };
        (reader, injector)
    }
}

#[async_trait]
impl TapReader for ChannelTapReader {
    async fn next_event(&mut self) -> Option<TapEvent> {
        self.events.recv().await
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
        self.events.close();
    }
}

impl TapInjector {
    /// Delivers a message. Returns `false` once the reader is gone.
    pub fn tap(&self, message: NdefMessage) -> bool {
        self.events.send(TapEvent::Read(message)).is_ok()
    }

    /// Delivers a single text record.
    pub fn tap_text(&self, payload: &str) -> bool {
        self.tap(NdefMessage::new(vec![NdefRecord::text(payload)]))
    }

    /// Delivers a read-error event.
    pub fn fail(&self, detail: &str) -> bool {
        self.events.send(TapEvent::Error(detail.to_string())).is_ok()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// How a [`SimulatedNfcPlatform`] behaves when probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NfcMode {
    /// No reader at all.
    Unsupported,
    /// A reader exists but activation is refused.
    Disabled,
    /// Activation succeeds.
    Enabled,
}

impl FromStr for NfcMode {
    type Err = PaymentError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unsupported" => Ok(Self::Unsupported),
            "disabled" => Ok(Self::Disabled),
            "enabled" => Ok(Self::Enabled),
            other => Err(PaymentError::ValidationError(format!(
                "Unknown NFC mode '{other}'"
            ))),
        }
    }
}

/// An NFC platform whose single reader is a [`ChannelTapReader`].
///
/// Written messages are kept in order and can be read back with
/// [`SimulatedNfcPlatform::written`].
pub struct SimulatedNfcPlatform {
    mode: NfcMode,
    reader: Mutex<Option<ChannelTapReader>>,
    written: Mutex<Vec<NdefMessage>>,
}

impl SimulatedNfcPlatform {
    pub fn new(mode: NfcMode) -> (Self, TapInjector) {
        let (reader, injector) = ChannelTapReader::new();
        let platform = Self {
            mode,
            reader: Mutex::new(Some(reader)),
            written: Mutex::new(Vec::new()),
        };
        (platform, injector)
    }

    pub async fn written(&self) -> Vec<NdefMessage> {
        self.written.lock().await.clone()
    }

    fn ensure_enabled(&self) -> Result<()> {
        match self.mode {
            NfcMode::Enabled => Ok(()),
            NfcMode::Disabled => Err(PaymentError::TapUnavailable(
                "NFC permission denied".to_string(),
            )),
            NfcMode::Unsupported => Err(PaymentError::TapUnavailable(
                "No NFC hardware".to_string(),
            )),
        }
    }
}

#[async_trait]
impl NfcPlatform for SimulatedNfcPlatform {
    fn has_reader(&self) -> bool {
        self.mode != NfcMode::Unsupported
    }

    async fn scan(&self) -> Result<TapReaderBox> {
        self.ensure_enabled()?;
        let reader = self
            .reader
            .lock()
            .await
            .take()
            .ok_or_else(|| PaymentError::TapUnavailable("Reader already in use".to_string()))?;
        Ok(Box::new(reader))
    }

    async fn write(&self, message: NdefMessage) -> Result<()> {
        self.ensure_enabled()?;
        self.written.lock().await.push(message);
        Ok(())
    }
}
