use super::session::{PaymentSession, SessionHandle};
use crate::config::SessionConfig;
use crate::domain::amount::Amount;
use crate::domain::method::{PaymentMethod, PaymentRequest, mock_invoice};
use crate::domain::ports::{NfcPlatform, QuoteSourceRef, TapCapability};
use crate::domain::quote::Quote;
use crate::domain::tap::{NdefMessage, NdefRecord};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// The screen shown after a payment request is submitted.
pub enum Checkout {
    /// Static card prompt; only the user can leave it.
    Card { amount: Amount },
    /// A running wallet session. `returned` resolves when the session hands
    /// control back to amount entry.
    Wallet {
        method: PaymentMethod,
        session: SessionHandle,
        returned: oneshot::Receiver<()>,
    },
}

/// Top-level terminal: turns submitted requests into payment screens.
pub struct Terminal {
    config: SessionConfig,
    quote_source: QuoteSourceRef,
    platform: Arc<dyn NfcPlatform>,
}

impl Terminal {
    pub fn new(
        config: SessionConfig,
        quote_source: QuoteSourceRef,
        platform: Arc<dyn NfcPlatform>,
    ) -> Self {
        Self {
            config,
            quote_source,
            platform,
        }
    }

    /// Opens the screen for `request`. Wallet methods probe the tap
    /// capability once and start a fresh session.
    pub async fn submit(&self, request: PaymentRequest) -> Checkout {
        let PaymentRequest { amount, method } = request;
        info!(amount = %amount, method = %method, "Payment submitted");

        let Some(verifier) = method.verifier(amount) else {
            return Checkout::Card { amount };
        };

        let capability = TapCapability::detect(self.platform.as_ref()).await;
        let (returned_tx, returned) = oneshot::channel();
        let session = PaymentSession::start(
            self.config.clone(),
            amount,
            self.quote_source.clone(),
            verifier,
            capability,
            move || {
                let _ = returned_tx.send(());
            },
        );

        Checkout::Wallet {
            method,
            session,
            returned,
        }
    }

    /// Writes the Lightning invoice for `quote` to a nearby device as a
    /// single text record. Failures are logged and reported as `false`; the
    /// session carries on either way.
    pub async fn share_invoice(&self, quote: &Quote) -> bool {
        if !self.platform.has_reader() {
            debug!("No NFC reader to share the invoice with");
            return false;
        }

        let invoice = mock_invoice(quote);
        let message = NdefMessage::new(vec![NdefRecord::text(invoice)]);
        match self.platform.write(message).await {
            Ok(()) => {
                info!(sats = quote.sats(), "Invoice shared via NFC");
                true
            }
            Err(e) => {
                warn!(error = %e, "Sharing the invoice via NFC failed");
                false
            }
        }
    }
}
