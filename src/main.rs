use clap::Parser;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use smart_eftpos::application::session::SessionEvent;
use smart_eftpos::application::terminal::{Checkout, Terminal};
use smart_eftpos::config::AppConfig;
use smart_eftpos::domain::method::{PaymentMethod, PaymentRequest};
use smart_eftpos::domain::ports::QuoteSourceRef;
use smart_eftpos::infrastructure::coinconvert::CoinConvertQuoteSource;
use smart_eftpos::infrastructure::in_memory::{
    FixedRateQuoteSource, NfcMode, SimulatedNfcPlatform, TapInjector,
};
use smart_eftpos::interfaces::console::Console;
use smart_eftpos::logging;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Amount due in USD, e.g. 12.50
    amount: String,

    /// Payment method: card, lightning (digital) or ecash (cash)
    #[arg(long, short)]
    method: PaymentMethod,

    /// Convert at a fixed BTC-per-USD rate instead of fetching a live quote
    #[arg(long)]
    rate: Option<Decimal>,

    /// Simulated NFC reader: enabled, disabled or unsupported
    #[arg(long, default_value = "enabled")]
    nfc: NfcMode,

    /// Text payload to tap once the quote is shown (repeatable)
    #[arg(long = "tap")]
    taps: Vec<String>,

    /// Share the Lightning invoice over NFC once it is shown
    #[arg(long)]
    share: bool,

    /// Delay before each simulated tap, in milliseconds
    #[arg(long, default_value_t = 2500)]
    tap_delay_ms: u64,

    /// Configuration file (defaults to Eftpos.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).into_diagnostic()?;
    logging::init(&config.logging.level).into_diagnostic()?;

    let request = PaymentRequest::new(&cli.amount, cli.method).into_diagnostic()?;

    let quote_source: QuoteSourceRef = match cli.rate {
        Some(rate) => Arc::new(FixedRateQuoteSource::new(rate)),
        None => Arc::new(CoinConvertQuoteSource::new(&config.quote).into_diagnostic()?),
    };
    let (platform, injector) = SimulatedNfcPlatform::new(cli.nfc);
    let terminal = Terminal::new(config.session.clone(), quote_source, Arc::new(platform));

    let mut console = Console::new(io::stdout());

    match terminal.submit(request).await {
        Checkout::Card { amount } => {
            console.card_screen(amount).into_diagnostic()?;
        }
        Checkout::Wallet {
            method,
            mut session,
            returned,
        } => {
            let Some(mut events) = session.take_events() else {
                return Ok(());
            };
            let mut taps = Some(cli.taps);

            loop {
                tokio::select! {
                    event = events.recv() => {
                        let Some(event) = event else { break };
                        console
                            .session_event(method, &event, &session.snapshot())
                            .into_diagnostic()?;
                        match event {
                            SessionEvent::QuoteReady(quote) => {
                                if cli.share && method.offers_scan_fallback() {
                                    let shared = terminal.share_invoice(&quote).await;
                                    console.invoice_shared(shared).into_diagnostic()?;
                                }
                                if let Some(payloads) = taps.take() {
                                    spawn_taps(injector.clone(), payloads, cli.tap_delay_ms);
                                }
                            }
                            // Retry means starting over from amount entry.
                            SessionEvent::QuoteFailed(_) => session.cancel(),
                            _ => {}
                        }
                    }
                    _ = tokio::signal::ctrl_c() => session.cancel(),
                }
            }

            session.join().await.into_diagnostic()?;
            if returned.await.is_ok() {
                println!("Back to amount entry");
            }
        }
    }

    Ok(())
}

fn spawn_taps(injector: TapInjector, payloads: Vec<String>, delay_ms: u64) {
    tokio::spawn(async move {
        for payload in payloads {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            if !injector.tap_text(&payload) {
                break;
            }
        }
    });
}
