//! Error types for the pipeline
//!
//! - [`ConfigError`]: configuration could not be read or is inconsistent
//! - [`StateError`]: an illegal chart phase transition was attempted
//! - [`RenderError`]: a chart could not be built or drawn
//!
//! Load failures ([`LoadError`], [`QueryError`]) come from the query layer
//! and are re-exported here.

use crate::render::SeriesRole;
use crate::state_machine::ChartPhase;
use std::path::PathBuf;

pub use geotrend_query::{LoadError, QueryError};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed, but the values do not make sense together
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    #[inline]
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Phase state machine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("illegal phase transition {from:?} -> {to:?}")]
    IllegalTransition { from: ChartPhase, to: ChartPhase },
}

/// Chart construction errors
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A series does not line up with the years axis
    #[error("{role} series has {actual} points on a {expected}-year axis")]
    Misaligned {
        role: SeriesRole,
        expected: usize,
        actual: usize,
    },

    /// The drawing backend refused the chart
    #[error("chart backend failed: {0}")]
    Backend(String),
}
