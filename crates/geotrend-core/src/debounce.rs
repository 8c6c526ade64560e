//! Quiet-period debounce with change suppression
//!
//! A value is emitted only after no newer value has arrived for the whole
//! quiet period, and only if it differs from the last value emitted.
//! "No hover" (`None`) is a value like any other, so clearing the hover is
//! emitted once and repeated clears are dropped.
//!
//! The debouncer holds no timer. The owner asks for [`Debouncer::deadline`],
//! sleeps until then and calls [`Debouncer::poll`].

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
    last_emitted: Option<T>,
}

impl<T: Clone + PartialEq> Debouncer<T> {
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
            last_emitted: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Record a raw value; restarts the quiet period
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.quiet));
    }

    /// When the pending value becomes due
    #[inline]
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    /// Emit the pending value if its quiet period has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.pending {
            Some((_, due)) if due <= now => self.flush(),
            _ => None,
        }
    }

    /// Emit the pending value immediately (input ended)
    pub fn flush(&mut self) -> Option<T> {
        let (value, _) = self.pending.take()?;
        if self.last_emitted.as_ref() == Some(&value) {
            return None;
        }
        self.last_emitted = Some(value.clone());
        Some(value)
    }

    #[inline]
    #[must_use]
    pub fn last_emitted(&self) -> Option<&T> {
        self.last_emitted.as_ref()
    }
}
