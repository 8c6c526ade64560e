//! geotrend series primitives
//!
//! The pure leaf of the chart pipeline:
//!
//! - [`Variable`], [`Observation`], [`SeriesPoint`]: the data model shared by
//!   every other crate
//! - [`format`]: normalizing raw attribute scalars and rendering display strings
//! - [`aggregate`]: reducing observations to one point per requested year
//!
//! # Example
//!
//! ```rust
//! use geotrend_series::{aggregate::group_mean, Observation};
//!
//! let observations = vec![
//!     Observation::new(2018, Some(10.0)),
//!     Observation::new(2018, Some(20.0)),
//!     Observation::new(2020, None),
//! ];
//!
//! let series = group_mean(&observations, &[2018, 2020]);
//! assert_eq!(series[0].value, Some(15.0));
//! assert_eq!(series[1].value, None);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod aggregate;
pub mod format;
mod model;

pub use aggregate::{group_mean, null_series, point_series};
pub use format::{format_display, normalize_value, ValueType};
pub use model::{Attributes, EntityId, Observation, SeriesPoint, Variable};
