//! Chart renderer
//!
//! [`ChartSpec`] is a backend-neutral description of one line chart: the
//! years axis, three datasets and the options that govern tooltips and
//! ticks. A [`ChartBackend`] turns a spec into a live instance;
//! [`ChartRenderer`] owns at most one such instance at a time.

use crate::error::RenderError;
use geotrend_query::ChartSeries;
use geotrend_series::{format_display, SeriesPoint, ValueType, Variable};
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Which comparison a dataset shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesRole {
    Entity,
    Group,
    Region,
}

impl SeriesRole {
    /// Draw order, most prominent first
    pub const ALL: [SeriesRole; 3] = [Self::Entity, Self::Group, Self::Region];

    /// Stroke and point styling; emphasis decreases entity → group → region
    #[must_use]
    pub fn style(self) -> SeriesStyle {
        match self {
            Self::Entity => SeriesStyle {
                border_color: "#90caf9",
                background_color: "rgba(144,202,249,0.12)",
                border_width: 2.5,
                border_dash: &[],
                point_radius: 3,
                point_hover_radius: 5,
                tension: LINE_TENSION,
                fill: false,
            },
            Self::Group => SeriesStyle {
                border_color: "#77791e",
                background_color: "rgba(119,121,30,0.1)",
                border_width: 2.0,
                border_dash: &[5, 3],
                point_radius: 2,
                point_hover_radius: 4,
                tension: LINE_TENSION,
                fill: false,
            },
            Self::Region => SeriesStyle {
                border_color: "#888",
                background_color: "rgba(136,136,136,0.08)",
                border_width: 1.5,
                border_dash: &[3, 3],
                point_radius: 2,
                point_hover_radius: 4,
                tension: LINE_TENSION,
                fill: false,
            },
        }
    }
}

impl Display for SeriesRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Entity => "entity",
            Self::Group => "group",
            Self::Region => "region",
        })
    }
}

const LINE_TENSION: f32 = 0.3;

/// Visual attributes of one dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesStyle {
    pub border_color: &'static str,
    pub background_color: &'static str,
    pub border_width: f32,
    /// Dash pattern; empty means solid
    #[serde(skip_serializing_if = "<[u8]>::is_empty")]
    pub border_dash: &'static [u8],
    pub point_radius: u8,
    pub point_hover_radius: u8,
    pub tension: f32,
    pub fill: bool,
}

impl SeriesStyle {
    #[inline]
    #[must_use]
    pub fn is_dashed(&self) -> bool {
        !self.border_dash.is_empty()
    }
}

/// One line on the chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDataset {
    pub label: String,
    pub role: SeriesRole,
    /// One entry per axis year; `None` is drawn as a gap
    pub data: Vec<Option<f64>>,
    #[serde(flatten)]
    pub style: SeriesStyle,
}

/// Hover interaction settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interaction {
    pub mode: &'static str,
    pub intersect: bool,
}

/// Chart-wide options
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub responsive: bool,
    pub maintain_aspect_ratio: bool,
    pub interaction: Interaction,
    pub legend_position: &'static str,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            responsive: true,
            maintain_aspect_ratio: false,
            interaction: Interaction {
                mode: "index",
                intersect: false,
            },
            legend_position: "bottom",
        }
    }
}

/// Everything a backend needs to draw one chart
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    /// Entity display name
    pub title: String,
    pub variable_name: String,
    pub value_type: ValueType,
    /// Year labels of the x-axis
    pub labels: Vec<String>,
    /// Entity, group and region, in that order
    pub datasets: Vec<ChartDataset>,
    pub options: ChartOptions,
}

impl ChartSpec {
    /// Build a spec from loaded series
    ///
    /// # Errors
    /// `RenderError::Misaligned` if any series does not have exactly one
    /// point per axis year in axis order.
    pub fn from_series(series: &ChartSeries, variable: &Variable) -> Result<Self, RenderError> {
        let datasets = SeriesRole::ALL
            .into_iter()
            .map(|role| {
                let (label, points) = match role {
                    SeriesRole::Entity => (series.entity_label.clone(), &series.entity),
                    SeriesRole::Group => (series.group_label(), &series.group),
                    SeriesRole::Region => (series.region_label().to_string(), &series.region),
                };
                Ok(ChartDataset {
                    label,
                    role,
                    data: aligned_values(role, points, &series.years)?,
                    style: role.style(),
                })
            })
            .collect::<Result<Vec<_>, RenderError>>()?;

        Ok(Self {
            title: series.entity_label.clone(),
            variable_name: variable.name.clone(),
            value_type: variable.value_type,
            labels: series.years.iter().map(ToString::to_string).collect(),
            datasets,
            options: ChartOptions::default(),
        })
    }

    #[must_use]
    pub fn dataset(&self, role: SeriesRole) -> Option<&ChartDataset> {
        self.datasets.iter().find(|d| d.role == role)
    }

    /// Tooltip line for one point: `"{label}: {value}"`, or `N/A` for a gap
    #[must_use]
    pub fn tooltip_label(&self, role: SeriesRole, index: usize) -> Option<String> {
        let dataset = self.dataset(role)?;
        let value = *dataset.data.get(index)?;
        Some(match value {
            Some(v) => format!("{}: {}", dataset.label, format_display(v, self.value_type)),
            None => format!("{}: N/A", dataset.label),
        })
    }

    /// Y-axis tick text
    #[inline]
    #[must_use]
    pub fn format_tick(&self, value: f64) -> String {
        format_display(value, self.value_type)
    }
}

fn aligned_values(role: SeriesRole, points: &[SeriesPoint], years: &[i32]) -> Result<Vec<Option<f64>>, RenderError> {
    let misaligned = || RenderError::Misaligned {
        role,
        expected: years.len(),
        actual: points.len(),
    };
    if points.len() != years.len() {
        return Err(misaligned());
    }
    points
        .iter()
        .zip(years)
        .map(|(p, &year)| if p.year == year { Ok(p.value) } else { Err(misaligned()) })
        .collect()
}

/// A drawing surface that can hold chart instances
pub trait ChartBackend: Send {
    /// Handle to one drawn chart
    type Instance: Send;

    /// Draw a new chart
    ///
    /// # Errors
    /// `RenderError::Backend` when the surface is unavailable.
    fn create(&mut self, spec: &ChartSpec) -> Result<Self::Instance, RenderError>;

    /// Release a chart; the instance is gone afterwards
    fn destroy(&mut self, instance: Self::Instance);
}

/// Owner of the single live chart instance
pub struct ChartRenderer<B: ChartBackend> {
    backend: B,
    live: Option<B::Instance>,
    rendered: u64,
}

impl<B: ChartBackend> ChartRenderer<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            live: None,
            rendered: 0,
        }
    }

    /// Replace the live chart with one drawn from `spec`
    ///
    /// The previous instance is destroyed before the new one is created.
    ///
    /// # Errors
    /// Propagates backend failures; no chart is live afterwards.
    pub fn render(&mut self, spec: &ChartSpec) -> Result<(), RenderError> {
        self.teardown();
        let instance = self.backend.create(spec)?;
        self.live = Some(instance);
        self.rendered += 1;
        Ok(())
    }

    /// Destroy the live chart, if any
    pub fn teardown(&mut self) {
        if let Some(instance) = self.live.take() {
            self.backend.destroy(instance);
        }
    }

    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    /// Charts successfully drawn so far
    #[inline]
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.rendered
    }

    #[inline]
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: ChartBackend> Drop for ChartRenderer<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<B: ChartBackend + fmt::Debug> fmt::Debug for ChartRenderer<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartRenderer")
            .field("backend", &self.backend)
            .field("live", &self.live.is_some())
            .field("rendered", &self.rendered)
            .finish()
    }
}
