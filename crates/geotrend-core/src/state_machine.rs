//! Chart phase state machine
//!
//! ```text
//!            hover(id)              result
//!   Idle ──────────────▶ Loading ──────────▶ Loaded
//!    ▲                    │  ▲                 │
//!    │ hover cleared      │  └─ new request ───┘
//!    │ or no data         ▼
//!    └──────────────── Settled  (failed, or no variable selected)
//! ```
//!
//! `Idle` is reachable from every phase. `Loading` is reentrant: a newer
//! request replaces the one in flight.

use crate::error::StateError;
use serde::{Deserialize, Serialize};

/// What the chart panel is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartPhase {
    /// Hidden, nothing in flight
    #[default]
    Idle,
    /// Visible, a load is in flight
    Loading,
    /// Visible, the latest load has been drawn
    Loaded,
    /// Visible, nothing in flight, nothing new drawn
    Settled,
}

impl ChartPhase {
    /// Every phase, in declaration order
    pub const ALL: [ChartPhase; 4] = [Self::Idle, Self::Loading, Self::Loaded, Self::Settled];

    /// Whether the panel is shown in this phase
    #[inline]
    #[must_use]
    pub fn is_visible(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Validates a phase transition.
///
/// Returns an error instead of panicking; enable the `strict-phases`
/// feature to panic on illegal transitions.
pub fn validate_transition(from: ChartPhase, to: ChartPhase) -> Result<(), StateError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        if cfg!(feature = "strict-phases") {
            panic!("Illegal phase transition attempted: {from:?} -> {to:?}");
        }
        Err(StateError::IllegalTransition { from, to })
    }
}

#[must_use]
pub fn allowed_transitions(from: ChartPhase) -> Vec<ChartPhase> {
    use ChartPhase::{Idle, Loaded, Loading, Settled};
    match from {
        Idle => vec![Idle, Loading, Settled],
        Loading => vec![Loading, Loaded, Settled, Idle],
        Loaded => vec![Loading, Settled, Idle],
        Settled => vec![Loading, Settled, Idle],
    }
}
