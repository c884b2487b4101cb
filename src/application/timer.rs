use std::future::pending;
use std::pin::Pin;
use tokio::time::{Duration, Instant, Interval, MissedTickBehavior, Sleep, interval_at, sleep};

/// Purpose of a single-shot delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Return a failed tap attempt to `Waiting`.
    ErrorReset,
    /// Tear down after a verified payment.
    SuccessGrace,
    /// Tear down after expiry.
    ExpiryGrace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick,
    Fired(TimerKind),
}

/// Every timer a session owns: the countdown interval and at most one
/// pending single-shot delay.
///
/// Timers are plain values; dropping or clearing them is cancellation, so
/// nothing can fire after [`SessionTimers::clear`].
#[derive(Debug, Default)]
pub struct SessionTimers {
    countdown: Option<Interval>,
    single_shot: Option<(TimerKind, Pin<Box<Sleep>>)>,
}

impl SessionTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts ticking every `period`, first tick one period from now.
    pub fn start_countdown(&mut self, period: Duration) {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.countdown = Some(interval);
    }

    pub fn stop_countdown(&mut self) {
        self.countdown = None;
    }

    pub fn countdown_running(&self) -> bool {
        self.countdown.is_some()
    }

    /// Schedules a single-shot delay, replacing whatever was pending.
    pub fn schedule(&mut self, kind: TimerKind, delay: Duration) {
        self.single_shot = Some((kind, Box::pin(sleep(delay))));
    }

    pub fn pending(&self) -> Option<TimerKind> {
        self.single_shot.as_ref().map(|(kind, _)| *kind)
    }

    /// Releases every timer.
    pub fn clear(&mut self) {
        self.countdown = None;
        self.single_shot = None;
    }

    /// Waits for the next timer event. Never resolves while nothing is armed.
    ///
    /// Cancel safe: dropping the future leaves the armed timers untouched.
    pub async fn next(&mut self) -> TimerEvent {
        let Self {
            countdown,
            single_shot,
        } = self;

        tokio::select! {
            biased;
            kind = fire(single_shot) => TimerEvent::Fired(kind),
            () = tick(countdown) => TimerEvent::Tick,
        }
    }
}

async fn fire(single_shot: &mut Option<(TimerKind, Pin<Box<Sleep>>)>) -> TimerKind {
    match single_shot.as_mut() {
        Some((kind, delay)) => {
            let kind = *kind;
            delay.as_mut().await;
            *single_shot = None;
            kind
        }
        None => pending().await,
    }
}

async fn tick(countdown: &mut Option<Interval>) {
    match countdown.as_mut() {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ticks_once_per_period() {
        let mut timers = SessionTimers::new();
        timers.start_countdown(Duration::from_secs(1));
        let start = Instant::now();

        for expected in 1..=3 {
            assert_eq!(timers.next().await, TimerEvent::Tick);
            assert_eq!(start.elapsed(), Duration::from_secs(expected));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_shot_fires_once() {
        let mut timers = SessionTimers::new();
        timers.schedule(TimerKind::ErrorReset, Duration::from_secs(2));
        assert_eq!(timers.pending(), Some(TimerKind::ErrorReset));

        let start = Instant::now();
        assert_eq!(
            timers.next().await,
            TimerEvent::Fired(TimerKind::ErrorReset)
        );
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(timers.pending(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_replaces_pending() {
        let mut timers = SessionTimers::new();
        timers.schedule(TimerKind::ErrorReset, Duration::from_secs(2));
        timers.schedule(TimerKind::ExpiryGrace, Duration::from_secs(3));

        let start = Instant::now();
        assert_eq!(
            timers.next().await,
            TimerEvent::Fired(TimerKind::ExpiryGrace)
        );
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleared_timers_never_fire() {
        let mut timers = SessionTimers::new();
        timers.start_countdown(Duration::from_secs(1));
        timers.schedule(TimerKind::SuccessGrace, Duration::from_secs(2));
        timers.clear();
        assert!(!timers.countdown_running());

        let fired = tokio::time::timeout(Duration::from_secs(60), timers.next()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_wait_keeps_timer_armed() {
        let mut timers = SessionTimers::new();
        timers.schedule(TimerKind::ErrorReset, Duration::from_secs(2));

        let early = tokio::time::timeout(Duration::from_secs(1), timers.next()).await;
        assert!(early.is_err());
        assert_eq!(timers.pending(), Some(TimerKind::ErrorReset));

        let start = Instant::now();
        assert_eq!(
            timers.next().await,
            TimerEvent::Fired(TimerKind::ErrorReset)
        );
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }
}
