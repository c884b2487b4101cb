use crate::application::session::{SessionEvent, SessionSnapshot};
use crate::domain::amount::{Amount, format_currency};
use crate::domain::method::{PaymentMethod, mock_invoice};
use crate::domain::status::{PaymentStatus, TeardownReason, format_time_left, is_low_time};
use qrcode::render::unicode;
use qrcode::{EcLevel, QrCode};
use std::io::{self, Write};

/// Renders terminal screens as plain text lines.
///
/// Works with any `Write` sink (stdout, a buffer in tests).
pub struct Console<W: Write> {
    out: W,
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn card_screen(&mut self, amount: Amount) -> io::Result<()> {
        writeln!(self.out, "{}", PaymentMethod::Card.title())?;
        writeln!(self.out, "{}", format_currency(amount))?;
        writeln!(self.out, "Tap, insert, or swipe your card")?;
        self.out.flush()
    }

    pub fn invoice_shared(&mut self, shared: bool) -> io::Result<()> {
        if shared {
            writeln!(self.out, "Invoice shared via NFC")?;
        } else {
            writeln!(self.out, "Could not share invoice via NFC")?;
        }
        self.out.flush()
    }

    /// Writes the lines an event adds to the wallet screen of `method`.
    pub fn session_event(
        &mut self,
        method: PaymentMethod,
        event: &SessionEvent,
        snapshot: &SessionSnapshot,
    ) -> io::Result<()> {
        match event {
            SessionEvent::Capability(capability) => {
                if let Some(reason) = &capability.reason {
                    writeln!(self.out, "NFC: {reason}")?;
                }
            }
            SessionEvent::QuoteReady(quote) => {
                writeln!(self.out, "{}", method.title())?;
                writeln!(self.out, "{} sats", quote.sats_display())?;
                writeln!(self.out, "≈ {} BTC", quote.btc_display())?;
                if method.offers_scan_fallback() {
                    let invoice = mock_invoice(quote);
                    write!(self.out, "{}", invoice_qr(&invoice)?)?;
                    writeln!(self.out)?;
                    writeln!(self.out, "Invoice: {invoice}")?;
                }
                writeln!(self.out, "{}", tap_prompt(method, snapshot.capability.is_enabled()))?;
                writeln!(
                    self.out,
                    "{} {}",
                    expiry_label(method),
                    format_time_left(snapshot.seconds_remaining)
                )?;
            }
            SessionEvent::QuoteFailed(message) => {
                writeln!(self.out, "{message}")?;
            }
            SessionEvent::Tick { seconds_remaining } => {
                let threshold = snapshot.low_time_threshold_secs;
                if *seconds_remaining > 0
                    && (*seconds_remaining % 30 == 0 || *seconds_remaining == threshold)
                {
                    let marker = if is_low_time(*seconds_remaining, threshold) {
                        "!"
                    } else {
                        ""
                    };
                    writeln!(
                        self.out,
                        "{} {}{marker}",
                        expiry_label(method),
                        format_time_left(*seconds_remaining)
                    )?;
                }
            }
            SessionEvent::Status(status) => {
                let line = match status {
                    PaymentStatus::Waiting => "Waiting for payment...",
                    PaymentStatus::Processing => "Processing payment...",
                    PaymentStatus::Success => "Payment successful!",
                    PaymentStatus::Error => "Payment failed. Please try again.",
                };
                writeln!(self.out, "{line}")?;
            }
            SessionEvent::Expired => {
                writeln!(self.out, "{}", method.expired_title())?;
                writeln!(self.out, "Redirecting to payment selection...")?;
            }
            SessionEvent::TornDown(reason) => {
                let line = match reason {
                    TeardownReason::Paid => "Payment complete",
                    TeardownReason::Expired => "Payment request expired",
                    TeardownReason::Cancelled => "Payment cancelled",
                    TeardownReason::Abandoned => "Payment abandoned",
                };
                writeln!(self.out, "{line}")?;
            }
        }
        self.out.flush()
    }
}

/// Scannable rendering of `invoice`, two modules per character row.
fn invoice_qr(invoice: &str) -> io::Result<String> {
    let code = QrCode::with_error_correction_level(invoice, EcLevel::H)
        .map_err(|e| io::Error::other(format!("Invoice QR code: {e}")))?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .quiet_zone(true)
        .build())
}

fn tap_prompt(method: PaymentMethod, tap_enabled: bool) -> &'static str {
    match (method, tap_enabled) {
        (PaymentMethod::Lightning, true) => "Scan QR code or tap device to share",
        (PaymentMethod::Lightning, false) => "Scan with your Lightning wallet",
        (_, true) => "Tap your eCash wallet to pay",
        (_, false) => "Hold your device near the payment terminal",
    }
}

fn expiry_label(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Lightning => "Invoice expires in",
        _ => "Payment request expires in",
    }
}
