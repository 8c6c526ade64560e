//! geotrend command line
//!
//! - `geotrend load`: fetch one entity's entity/group/region series and
//!   print the chart
//! - `geotrend replay`: drive the hover pipeline from a timed script and
//!   print every chart it draws
//!
//! Records come from the configured feature service, or from a JSON
//! fixture when `--fixture` is given. Charts go to stdout; logs go to
//! stderr.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod backend;
pub mod commands;
pub mod script;

pub use backend::{render_table, ConsoleBackend, OutputFormat};
pub use commands::{describe_view, load, replay, CommonArgs, LoadArgs, ReplayArgs, DEFAULT_CONFIG_PATH};
pub use script::{Action, ReplayScript, Schedule, ScriptError, ScriptEvent};
