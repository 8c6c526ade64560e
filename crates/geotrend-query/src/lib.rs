//! geotrend query layer
//!
//! Talks to a remote tabular feature service and turns its records into the
//! three year-aligned series a chart needs:
//!
//! - [`Filter`] / [`FeatureQuery`]: server-side predicates and field lists
//! - [`FeatureQueryService`]: the port every backend implements
//! - [`HttpFeatureService`]: REST backend (`{url}/query?...&f=json`)
//! - [`InMemoryFeatureService`]: fixture-backed backend for replay and tests
//! - [`SeriesLoader`]: entity query first, then group and region concurrently
//!
//! # Example
//!
//! ```rust,ignore
//! use geotrend_query::{FeatureSource, HttpFeatureService, SeriesLoader};
//! use std::sync::Arc;
//!
//! let source = FeatureSource::new("https://example.org/arcgis/rest/services/tracts/FeatureServer/0");
//! let loader = SeriesLoader::new(Arc::new(HttpFeatureService::new()), source);
//! let series = loader.load(&"37119001100".into(), &variable).await?;
//! println!("{} vs {}", series.entity_label, series.group_label());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod filter;
pub mod http;
pub mod loader;
pub mod memory;
pub mod service;
pub mod source;

pub use error::{LoadError, QueryError};
pub use filter::{FeatureQuery, Filter};
pub use http::HttpFeatureService;
pub use loader::{ChartSeries, LoadStage, SeriesLoader};
pub use memory::InMemoryFeatureService;
pub use service::FeatureQueryService;
pub use source::{FeatureSource, SchemaFields, SourceLocation};
