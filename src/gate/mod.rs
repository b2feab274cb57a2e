//! Debounce/throttle gate in front of the compile cycle.
//!
//! ```text
//! trigger() → channel → Debouncer (pure timing) → on_fire(payload)
//! ```
//!
//! Bursts are coalesced and the trailing payload is delivered. The gate only
//! delays: it never fails and never drops the last payload of a burst. It
//! does not serialize work either. Cycles fired by the callback may still
//! overlap, which the orchestrator resolves with sequence tickets.

mod debouncer;

use std::time::Duration;

use tokio::sync::mpsc;

use debouncer::Debouncer;

/// Timing of a [`Gate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Quiet period after the last trigger before firing
    pub interval: Duration,
    /// Minimum gap between two fires
    pub cooldown: Duration,
}

impl GateConfig {
    pub const fn new(interval: Duration, cooldown: Duration) -> Self {
        Self { interval, cooldown }
    }
}

/// Trigger handle. Cheap to clone.
#[derive(Debug)]
pub struct Gate<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for Gate<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> Gate<T> {
    /// Create a gate and the loop that drives it.
    ///
    /// The loop must be spawned (or awaited) for triggers to fire.
    pub fn new(config: GateConfig) -> (Self, GateLoop<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let gate_loop = GateLoop {
            rx,
            debouncer: Debouncer::new(config.interval, config.cooldown),
        };
        (Self { tx }, gate_loop)
    }

    /// Submit a trigger. Returns `false` once the loop has stopped.
    pub fn trigger(&self, payload: T) -> bool {
        self.tx.send(payload).is_ok()
    }
}

/// Event loop of a [`Gate`].
pub struct GateLoop<T> {
    rx: mpsc::UnboundedReceiver<T>,
    debouncer: Debouncer<T>,
}

impl<T> GateLoop<T> {
    /// Run until every [`Gate`] handle is dropped.
    ///
    /// `on_fire` runs synchronously inside the loop; long work should be
    /// spawned from it. A payload still pending at shutdown is delivered
    /// immediately.
    pub async fn run(mut self, mut on_fire: impl FnMut(T)) {
        loop {
            tokio::select! {
                biased;
                msg = self.rx.recv() => match msg {
                    Some(payload) => self.debouncer.push(payload),
                    None => {
                        if let Some(payload) = self.debouncer.flush() {
                            on_fire(payload);
                        }
                        break;
                    }
                },
                _ = tokio::time::sleep(self.debouncer.sleep_duration()) => {
                    if let Some(payload) = self.debouncer.take_if_ready() {
                        crate::debug!("gate"; "fire");
                        on_fire(payload);
                    }
                }
            }
        }
    }
}
