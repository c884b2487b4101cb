use super::amount::Amount;
use super::quote::Quote;
use super::tap::{
    NFC_DISABLED_REASON, NFC_UNSUPPORTED_REASON, NdefMessage, TapCapabilityStatus, TapEvent,
    TapSupport,
};
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Converts a source-currency amount into a BTC quote.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch(&self, amount: Amount) -> Result<Quote>;
}

/// Decides whether a decoded tap payload settles the payment.
pub trait PaymentVerifier: Send + Sync {
    fn verify(&self, payload: &str) -> bool;
}

/// An activated tap-to-read subscription.
#[async_trait]
pub trait TapReader: Send {
    /// Next read or error event; `None` once the platform stops delivering.
    async fn next_event(&mut self) -> Option<TapEvent>;

    /// Unsubscribes from the platform. Called once, on session teardown.
    fn release(&mut self);
}

/// The hosting platform's tap-to-read facility.
#[async_trait]
pub trait NfcPlatform: Send + Sync {
    fn has_reader(&self) -> bool;

    /// Activates the reader, e.g. by asking the user for permission.
    async fn scan(&self) -> Result<TapReaderBox>;

    /// Pushes `message` to the next device held against the reader.
    async fn write(&self, message: NdefMessage) -> Result<()>;
}

pub type QuoteSourceRef = Arc<dyn QuoteSource>;
pub type PaymentVerifierBox = Box<dyn PaymentVerifier>;
pub type TapReaderBox = Box<dyn TapReader>;

/// Tap-to-pay capability, resolved once before a session starts.
pub enum TapCapability {
    Unavailable(String),
    Disabled(String),
    Enabled(TapReaderBox),
}

impl TapCapability {
    /// Probes `platform` exactly once.
    pub async fn detect(platform: &dyn NfcPlatform) -> Self {
        if !platform.has_reader() {
            info!("Tap-to-pay is not supported on this platform");
            return Self::Unavailable(NFC_UNSUPPORTED_REASON.to_string());
        }
        match platform.scan().await {
            Ok(reader) => {
                info!("Tap-to-pay reader activated");
                Self::Enabled(reader)
            }
            Err(e) => {
                warn!(error = %e, "Tap-to-pay reader could not be activated");
                Self::Disabled(NFC_DISABLED_REASON.to_string())
            }
        }
    }

    pub fn status(&self) -> TapCapabilityStatus {
        match self {
            Self::Unavailable(reason) => TapCapabilityStatus {
                support: TapSupport::Unsupported,
                reason: Some(reason.clone()),
            },
            Self::Disabled(reason) => TapCapabilityStatus {
                support: TapSupport::Disabled,
                reason: Some(reason.clone()),
            },
            Self::Enabled(_) => TapCapabilityStatus {
                support: TapSupport::Enabled,
                reason: None,
            },
        }
    }

    pub(crate) fn into_reader(self) -> Option<TapReaderBox> {
        match self {
            Self::Enabled(reader) => Some(reader),
            _ => None,
        }
    }
}

impl fmt::Debug for TapCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(reason) => f.debug_tuple("Unavailable").field(reason).finish(),
            Self::Disabled(reason) => f.debug_tuple("Disabled").field(reason).finish(),
            Self::Enabled(_) => f.write_str("Enabled(..)"),
        }
    }
}
