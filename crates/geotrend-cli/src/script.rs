//! Timed hover/variable scripts for `geotrend replay`
//!
//! ```toml
//! end_ms = 2000
//!
//! [[event]]
//! at_ms = 0
//! action = { select = "pct_poverty" }
//!
//! [[event]]
//! at_ms = 50
//! action = { hover = "37119001100" }
//!
//! [[event]]
//! at_ms = 900
//! action = "unhover"
//! ```
//!
//! Offsets are milliseconds from the start of the replay and must not
//! decrease. Both input streams stay open until `end_ms` (default: the last
//! event), so a final hover gets its full quiet period.

use futures::Stream;
use geotrend_core::PipelineConfig;
use geotrend_series::{EntityId, Variable};
use serde::Deserialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("script parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("event {index} at {at_ms}ms comes before the previous event at {previous_ms}ms")]
    OutOfOrder { index: usize, at_ms: u64, previous_ms: u64 },

    #[error("end_ms {end_ms} is before the last event at {last_ms}ms")]
    EndsEarly { end_ms: u64, last_ms: u64 },

    #[error("unknown variable `{0}`")]
    UnknownVariable(String),
}

/// What the user does at one instant
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Pointer enters an entity
    Hover(String),
    /// Pointer leaves every entity
    Unhover,
    /// Variable chosen by field name
    Select(String),
    /// Variable cleared
    Deselect,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptEvent {
    pub at_ms: u64,
    pub action: Action,
}

/// A parsed replay script
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ReplayScript {
    #[serde(default)]
    pub end_ms: Option<u64>,
    #[serde(default, rename = "event")]
    pub events: Vec<ScriptEvent>,
}

/// Script events split into the two pipeline inputs
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub hovers: Vec<(u64, Option<EntityId>)>,
    pub variables: Vec<(u64, Option<Variable>)>,
    pub end_ms: u64,
}

impl ReplayScript {
    /// Parse and check ordering
    ///
    /// # Errors
    /// `ScriptError::Parse` on malformed TOML, `OutOfOrder` or `EndsEarly`
    /// on bad offsets.
    pub fn from_toml_str(text: &str) -> Result<Self, ScriptError> {
        let script: Self = toml::from_str(text)?;
        script.validate()?;
        Ok(script)
    }

    fn validate(&self) -> Result<(), ScriptError> {
        let mut previous_ms = 0;
        for (index, event) in self.events.iter().enumerate() {
            if event.at_ms < previous_ms {
                return Err(ScriptError::OutOfOrder {
                    index,
                    at_ms: event.at_ms,
                    previous_ms,
                });
            }
            previous_ms = event.at_ms;
        }
        match self.end_ms {
            Some(end_ms) if end_ms < previous_ms => Err(ScriptError::EndsEarly {
                end_ms,
                last_ms: previous_ms,
            }),
            _ => Ok(()),
        }
    }

    /// Offset of the last event
    #[must_use]
    pub fn last_ms(&self) -> u64 {
        self.events.last().map_or(0, |e| e.at_ms)
    }

    /// Resolve variable names against `config` and split by input
    ///
    /// # Errors
    /// `ScriptError::UnknownVariable` for a selection not in the catalog.
    pub fn schedule(&self, config: &PipelineConfig) -> Result<Schedule, ScriptError> {
        let mut hovers = Vec::new();
        let mut variables = Vec::new();

        for event in &self.events {
            match &event.action {
                Action::Hover(id) => hovers.push((event.at_ms, Some(EntityId::new(id.as_str())))),
                Action::Unhover => hovers.push((event.at_ms, None)),
                Action::Select(field) => {
                    let variable = config
                        .variable(field)
                        .ok_or_else(|| ScriptError::UnknownVariable(field.clone()))?;
                    variables.push((event.at_ms, Some(variable.clone())));
                }
                Action::Deselect => variables.push((event.at_ms, None)),
            }
        }

        Ok(Schedule {
            hovers,
            variables,
            end_ms: self.end_ms.unwrap_or_else(|| self.last_ms()),
        })
    }
}

/// Stream yielding each value at its offset from `start`, then ending at
/// `end_ms`
pub fn scheduled<T: Send + 'static>(
    events: Vec<(u64, T)>,
    start: Instant,
    end_ms: u64,
) -> impl Stream<Item = T> + Send {
    futures::stream::unfold(VecDeque::from(events), move |mut queue| async move {
        match queue.pop_front() {
            Some((at_ms, value)) => {
                tokio::time::sleep_until(start + Duration::from_millis(at_ms)).await;
                Some((value, queue))
            }
            None => {
                tokio::time::sleep_until(start + Duration::from_millis(end_ms)).await;
                None
            }
        }
    })
}
