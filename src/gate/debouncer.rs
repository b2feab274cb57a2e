use std::time::Duration;

use tokio::time::Instant;

/// Sleep used while nothing is pending.
const IDLE: Duration = Duration::from_secs(86400);

/// Pure debouncer: timing and coalescing only, no async, no callbacks.
///
/// Keeps the most recent payload. It becomes ready once `interval` has
/// passed since the last push and `cooldown` since the last fire.
pub(super) struct Debouncer<T> {
    pending: Option<T>,
    last_push: Option<Instant>,
    last_fire: Option<Instant>,
    interval: Duration,
    cooldown: Duration,
}

impl<T> Debouncer<T> {
    pub(super) fn new(interval: Duration, cooldown: Duration) -> Self {
        Self {
            pending: None,
            last_push: None,
            last_fire: None,
            interval,
            cooldown,
        }
    }

    /// Record a trigger. A newer payload replaces an older pending one.
    pub(super) fn push(&mut self, payload: T) {
        if self.pending.replace(payload).is_some() {
            crate::debug!("gate"; "coalesced trigger");
        }
        self.last_push = Some(Instant::now());
    }

    pub(super) fn is_ready(&self) -> bool {
        let Some(last_push) = self.last_push else {
            return false;
        };

        if last_push.elapsed() < self.interval {
            return false;
        }

        if let Some(last_fire) = self.last_fire
            && last_fire.elapsed() < self.cooldown
        {
            return false;
        }

        self.pending.is_some()
    }

    /// Take the pending payload if quiet period and cooldown elapsed.
    pub(super) fn take_if_ready(&mut self) -> Option<T> {
        if !self.is_ready() {
            return None;
        }
        self.fire()
    }

    /// Take the pending payload regardless of timing.
    pub(super) fn flush(&mut self) -> Option<T> {
        self.fire()
    }

    fn fire(&mut self) -> Option<T> {
        let payload = self.pending.take()?;
        self.last_push = None;
        self.last_fire = Some(Instant::now());
        Some(payload)
    }

    /// Precise sleep duration until the next possible ready time.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(last_push) = self.last_push else {
            return IDLE;
        };

        let quiet_remaining = self.interval.saturating_sub(last_push.elapsed());
        let cooldown_remaining = self
            .last_fire
            .map(|t| self.cooldown.saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        quiet_remaining
            .max(cooldown_remaining)
            .max(Duration::from_millis(1))
    }
}
