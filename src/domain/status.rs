use serde::Serialize;

/// Seconds a payment request stays valid once its quote is shown.
pub const DEFAULT_LIFETIME_SECS: u32 = 120;

/// At or below this many seconds the remaining time is shown as urgent.
pub const LOW_TIME_THRESHOLD_SECS: u32 = 30;

/// Progress of the current tap attempt.
///
/// `Waiting -> Processing -> {Success | Error}`; `Error` falls back to
/// `Waiting` after a delay, `Success` ends the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Waiting,
    Processing,
    Success,
    Error,
}

impl PaymentStatus {
    /// Only an idle session starts a new tap attempt.
    pub fn accepts_tap(self) -> bool {
        self == Self::Waiting
    }
}

/// Why a session was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TeardownReason {
    /// A tap payload verified and the success grace period elapsed.
    Paid,
    /// The countdown reached zero and the expiry grace period elapsed.
    Expired,
    /// The user cancelled (or asked to retry after a quote failure).
    Cancelled,
    /// Every handle was dropped; resources are released without notifying
    /// the caller.
    Abandoned,
}

impl TeardownReason {
    /// Whether this path notifies the caller through its teardown callback.
    pub fn notifies_caller(self) -> bool {
        self != Self::Abandoned
    }
}

/// Formats remaining seconds as `m:ss`.
pub fn format_time_left(seconds_remaining: u32) -> String {
    format!("{}:{:02}", seconds_remaining / 60, seconds_remaining % 60)
}

/// Whether the remaining time should be rendered with urgent emphasis.
pub fn is_low_time(seconds_remaining: u32, threshold_secs: u32) -> bool {
    seconds_remaining <= threshold_secs
}
