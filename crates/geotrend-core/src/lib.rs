//! geotrend core
//!
//! Turns a noisy stream of hovered entity ids into one chart at a time:
//!
//! - [`Debouncer`]: quiet-period debounce with change suppression
//! - [`ChartController`]: single writer of visible state, newest load wins
//! - [`ChartRenderer`]: owns the one live chart instance
//! - [`ChartPipeline`]: async driver over hover and variable streams
//! - [`PipelineConfig`]: TOML configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use geotrend_core::prelude::*;
//! use std::sync::Arc;
//!
//! let config = PipelineConfig::load("geotrend.toml")?;
//! let loader = build_loader(&config, Arc::new(HttpFeatureService::new()));
//! let pipeline = ChartPipeline::from_config(&config, loader, my_backend);
//! let mut view = pipeline.subscribe();
//!
//! let controller = pipeline.run(hover_stream, variable_stream).await;
//! println!("last chart: {}", view.borrow_and_update().entity_label);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod state_machine;

pub use config::{PipelineConfig, DEFAULT_DEBOUNCE_MS};
pub use controller::{ChartController, ChartView, LoadGeneration, LoadOutcome, LoadRequest};
pub use debounce::Debouncer;
pub use error::{ConfigError, LoadError, QueryError, RenderError, StateError};
pub use pipeline::{build_loader, ChartPipeline};
pub use render::{ChartBackend, ChartDataset, ChartOptions, ChartRenderer, ChartSpec, SeriesRole, SeriesStyle};
pub use state_machine::{allowed_transitions, validate_transition, ChartPhase};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for wiring a chart pipeline
    pub use crate::{
        build_loader, ChartBackend, ChartController, ChartPhase, ChartPipeline, ChartSpec, ChartView,
        PipelineConfig, RenderError,
    };
    pub use geotrend_query::{FeatureSource, HttpFeatureService, InMemoryFeatureService, SeriesLoader};
    pub use geotrend_series::{EntityId, ValueType, Variable};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
