use super::timer::{SessionTimers, TimerEvent, TimerKind};
use crate::config::SessionConfig;
use crate::domain::amount::Amount;
use crate::domain::ports::{PaymentVerifierBox, QuoteSourceRef, TapCapability, TapReaderBox};
use crate::domain::quote::Quote;
use crate::domain::status::{PaymentStatus, TeardownReason, format_time_left, is_low_time};
use crate::domain::tap::{
    NFC_READ_ERROR_REASON, NdefMessage, NdefRecord, TapCapabilityStatus, TapEvent,
};
use crate::error::Result;
use serde::Serialize;
use std::future::{Future, pending};
use std::pin::Pin;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// Message shown when the price quote cannot be obtained.
pub const QUOTE_FAILED_MESSAGE: &str = "Failed to fetch Bitcoin price. Please try again.";

const TICK_PERIOD: Duration = Duration::from_secs(1);

type QuoteFuture = Pin<Box<dyn Future<Output = Result<Quote>> + Send>>;
type TeardownCallback = Box<dyn FnOnce() + Send>;

/// Which screen a session currently calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionView {
    Loading,
    QuoteFailed,
    Active,
    Expired,
    Ended,
}

/// Point-in-time copy of a session's observable state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub amount: Amount,
    pub quote: Option<Quote>,
    pub quote_error: Option<String>,
    pub seconds_remaining: u32,
    pub low_time_threshold_secs: u32,
    pub expired: bool,
    pub status: PaymentStatus,
    pub capability: TapCapabilityStatus,
    pub ended: Option<TeardownReason>,
}

impl SessionSnapshot {
    pub fn view(&self) -> SessionView {
        if self.ended.is_some() {
            SessionView::Ended
        } else if self.quote_error.is_some() {
            SessionView::QuoteFailed
        } else if self.expired {
            SessionView::Expired
        } else if self.quote.is_none() {
            SessionView::Loading
        } else {
            SessionView::Active
        }
    }

    /// Remaining time as `m:ss`.
    pub fn time_left(&self) -> String {
        format_time_left(self.seconds_remaining)
    }

    /// Whether the remaining time should be emphasised.
    pub fn is_low_time(&self) -> bool {
        is_low_time(self.seconds_remaining, self.low_time_threshold_secs)
    }
}

/// Everything a session reports, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Capability(TapCapabilityStatus),
    QuoteReady(Quote),
    QuoteFailed(String),
    Tick { seconds_remaining: u32 },
    Status(PaymentStatus),
    Expired,
    TornDown(TeardownReason),
}

#[derive(Debug)]
enum Command {
    Cancel,
}

enum Input {
    Command(Option<Command>),
    Timer(TimerEvent),
    Tap(Option<TapEvent>),
    Quote(Result<Quote>),
}

/// Caller side of a running [`PaymentSession`].
///
/// Dropping every handle abandons the session: it releases its timers and
/// reader without invoking the teardown callback.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
    events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    task: JoinHandle<TeardownReason>,
}

impl SessionHandle {
    /// Asks the session to end now. Safe to call any number of times; the
    /// teardown callback still runs at most once.
    pub fn cancel(&self) {
        if self.commands.send(Command::Cancel).is_err() {
            debug!("Cancel ignored, session already ended");
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Takes the event stream. Only the first call returns it.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.events.take()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the session to end and returns why it did.
    pub async fn join(self) -> Result<TeardownReason> {
        let Self { commands, task, .. } = self;
        let reason = task.await?;
        drop(commands);
        Ok(reason)
    }
}

/// One payment attempt: quote, countdown, tap handling and teardown.
///
/// Runs as a single task. Each input (command, timer, tap event, quote
/// result) is handled to completion before the next is polled, so status and
/// countdown are never mutated concurrently.
pub struct PaymentSession {
    config: SessionConfig,
    amount: Amount,
    quote: Option<Quote>,
    quote_error: Option<String>,
    quote_fetch: Option<QuoteFuture>,
    seconds_remaining: u32,
    expired: bool,
    status: PaymentStatus,
    capability: TapCapabilityStatus,
    reader: Option<TapReaderBox>,
    verifier: PaymentVerifierBox,
    timers: SessionTimers,
    on_teardown: Option<TeardownCallback>,
    torn_down: bool,
    ended: Option<TeardownReason>,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<SessionEvent>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl PaymentSession {
    /// Spawns a session on the current tokio runtime.
    ///
    /// `amount` must already be validated. `on_cancel` runs exactly once when
    /// the session ends by payment, expiry or user cancel.
    pub fn start<F>(
        config: SessionConfig,
        amount: Amount,
        quote_source: QuoteSourceRef,
        verifier: PaymentVerifierBox,
        capability: TapCapability,
        on_cancel: F,
    ) -> SessionHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let capability_status = capability.status();

        let quote_fetch: QuoteFuture = Box::pin(async move { quote_source.fetch(amount).await });

        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot {
            amount,
            quote: None,
            quote_error: None,
            seconds_remaining: config.lifetime_secs,
            low_time_threshold_secs: config.low_time_threshold_secs,
            expired: false,
            status: PaymentStatus::Waiting,
            capability: capability_status.clone(),
            ended: None,
        });

        let session = Self {
            seconds_remaining: config.lifetime_secs,
            config,
            amount,
            quote: None,
            quote_error: None,
            quote_fetch: Some(quote_fetch),
            expired: false,
            status: PaymentStatus::Waiting,
            capability: capability_status,
            reader: capability.into_reader(),
            verifier,
            timers: SessionTimers::new(),
            on_teardown: Some(Box::new(on_cancel)),
            torn_down: false,
            ended: None,
            commands: command_rx,
            events: event_tx,
            snapshot: snapshot_tx,
        };

        let task = tokio::spawn(session.run());

        SessionHandle {
            commands: command_tx,
            snapshot: snapshot_rx,
            events: Some(event_rx),
            task,
        }
    }

    async fn run(mut self) -> TeardownReason {
        info!(
            amount = %self.amount,
            capability = ?self.capability.support,
            "Payment session started"
        );
        self.publish(SessionEvent::Capability(self.capability.clone()));

        let reason = loop {
            let input = tokio::select! {
                biased;
                command = self.commands.recv() => Input::Command(command),
                timer = self.timers.next() => Input::Timer(timer),
                tap = next_tap(&mut self.reader) => Input::Tap(tap),
                quote = resolve_quote(&mut self.quote_fetch) => Input::Quote(quote),
            };

            let outcome = self.handle(input);
            self.sync_snapshot();
            if let Some(reason) = outcome {
                break reason;
            }
        };

        self.teardown(reason);
        reason
    }

    fn handle(&mut self, input: Input) -> Option<TeardownReason> {
        match input {
            Input::Command(Some(Command::Cancel)) => {
                info!("Payment cancelled by user");
                Some(TeardownReason::Cancelled)
            }
            Input::Command(None) => {
                debug!("All session handles dropped");
                Some(TeardownReason::Abandoned)
            }
            Input::Timer(TimerEvent::Tick) => {
                self.on_tick();
                None
            }
            Input::Timer(TimerEvent::Fired(kind)) => self.on_timer(kind),
            Input::Tap(Some(TapEvent::Read(message))) => {
                self.on_read(&message);
                None
            }
            Input::Tap(Some(TapEvent::Error(detail))) => {
                warn!(detail = %detail, "Tap reader reported an error");
                self.capability.reason = Some(NFC_READ_ERROR_REASON.to_string());
                self.publish(SessionEvent::Capability(self.capability.clone()));
                None
            }
            Input::Tap(None) => {
                debug!("Tap reader stopped delivering events");
                if let Some(mut reader) = self.reader.take() {
                    reader.release();
                }
                None
            }
            Input::Quote(result) => {
                self.on_quote(result);
                None
            }
        }
    }

    fn on_quote(&mut self, result: Result<Quote>) {
        match result {
            Ok(quote) => {
                info!(
                    btc = %quote.btc_display(),
                    sats = quote.sats(),
                    "Price quote received"
                );
                self.quote = Some(quote);
                self.timers.start_countdown(TICK_PERIOD);
                self.publish(SessionEvent::QuoteReady(quote));
            }
            Err(e) => {
                warn!(error = %e, "Price quote failed");
                self.quote_error = Some(QUOTE_FAILED_MESSAGE.to_string());
                self.publish(SessionEvent::QuoteFailed(QUOTE_FAILED_MESSAGE.to_string()));
            }
        }
    }

    fn on_tick(&mut self) {
        if self.expired {
            return;
        }
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        self.publish(SessionEvent::Tick {
            seconds_remaining: self.seconds_remaining,
        });
        if self.seconds_remaining == 0 {
            self.expire();
        }
    }

    /// Expiry replaces any pending error reset with the grace teardown.
    fn expire(&mut self) {
        self.expired = true;
        self.timers.stop_countdown();
        self.timers
            .schedule(TimerKind::ExpiryGrace, self.config.expiry_grace());
        info!(status = ?self.status, "Payment request expired");
        self.publish(SessionEvent::Expired);
    }

    fn on_timer(&mut self, kind: TimerKind) -> Option<TeardownReason> {
        match kind {
            TimerKind::ErrorReset => {
                self.set_status(PaymentStatus::Waiting);
                None
            }
            TimerKind::SuccessGrace => Some(TeardownReason::Paid),
            TimerKind::ExpiryGrace => Some(TeardownReason::Expired),
        }
    }

    /// Handles a tapped message while the session is waiting for payment.
    ///
    /// Taps are only accepted once the quote is ready, and never after
    /// expiry or while an attempt is processing, succeeded or failed.
    /// Anything arriving earlier is dropped rather than queued.
    fn on_read(&mut self, message: &NdefMessage) {
        if self.expired || self.quote.is_none() || !self.status.accepts_tap() {
            debug!(
                status = ?self.status,
                expired = self.expired,
                quoted = self.quote.is_some(),
                "Ignoring tap event"
            );
            return;
        }

        self.set_status(PaymentStatus::Processing);
        if self.verify(message) {
            info!("Tap payment verified");
            self.timers.stop_countdown();
            self.set_status(PaymentStatus::Success);
            self.timers
                .schedule(TimerKind::SuccessGrace, self.config.success_grace());
        } else {
            warn!(records = message.records.len(), "Tap payload did not verify");
            self.fail_attempt();
        }
    }

    /// True when some text record verifies.
    fn verify(&self, message: &NdefMessage) -> bool {
        message
            .records
            .iter()
            .filter_map(NdefRecord::decode_text)
            .any(|payload| self.verifier.verify(&payload))
    }

    fn fail_attempt(&mut self) {
        self.set_status(PaymentStatus::Error);
        self.timers
            .schedule(TimerKind::ErrorReset, self.config.error_reset());
    }

    fn set_status(&mut self, status: PaymentStatus) {
        debug!(from = ?self.status, to = ?status, "Payment status changed");
        self.status = status;
        self.publish(SessionEvent::Status(status));
    }

    fn teardown(&mut self, reason: TeardownReason) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.release_resources();
        self.ended = Some(reason);
        self.sync_snapshot();
        info!(reason = ?reason, "Payment session ended");

        if reason.notifies_caller() {
            if let Some(callback) = self.on_teardown.take() {
                callback();
            }
        }
        self.publish(SessionEvent::TornDown(reason));
    }

    fn release_resources(&mut self) {
        self.timers.clear();
        self.quote_fetch = None;
        self.commands.close();
        if let Some(mut reader) = self.reader.take() {
            reader.release();
        }
    }

    fn publish(&self, event: SessionEvent) {
        // The caller may not be listening.
        let _ = self.events.send(event);
    }

    fn sync_snapshot(&self) {
        self.snapshot.send_replace(SessionSnapshot {
            amount: self.amount,
            quote: self.quote,
            quote_error: self.quote_error.clone(),
            seconds_remaining: self.seconds_remaining,
            low_time_threshold_secs: self.config.low_time_threshold_secs,
            expired: self.expired,
            status: self.status,
            capability: self.capability.clone(),
            ended: self.ended,
        });
    }
}

impl Drop for PaymentSession {
    fn drop(&mut self) {
        if !self.torn_down {
            self.release_resources();
        }
    }
}

async fn next_tap(reader: &mut Option<TapReaderBox>) -> Option<TapEvent> {
    match reader.as_mut() {
        Some(reader) => reader.next_event().await,
        None => pending().await,
    }
}

async fn resolve_quote(fetch: &mut Option<QuoteFuture>) -> Result<Quote> {
    match fetch.as_mut() {
        Some(future) => {
            let result = future.as_mut().await;
            *fetch = None;
            result
        }
        None => pending().await,
    }
}
