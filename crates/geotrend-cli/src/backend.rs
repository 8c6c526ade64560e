//! Chart backend that writes each drawn chart to a text stream

use geotrend_core::{ChartBackend, ChartSpec, RenderError};
use std::io::Write;

/// How charts are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned text table, one row per year
    #[default]
    Table,
    /// One JSON chart spec per line
    Json,
}

impl OutputFormat {
    #[inline]
    #[must_use]
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Table
        }
    }
}

/// Backend drawing charts onto a writer
///
/// Instances are sequence numbers; destroying one only logs, since the
/// text is already out.
#[derive(Debug)]
pub struct ConsoleBackend<W> {
    out: W,
    format: OutputFormat,
    drawn: u64,
}

impl<W: Write + Send> ConsoleBackend<W> {
    #[must_use]
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format, drawn: 0 }
    }

    #[inline]
    #[must_use]
    pub fn writer(&self) -> &W {
        &self.out
    }

    #[inline]
    #[must_use]
    pub fn drawn(&self) -> u64 {
        self.drawn
    }
}

impl<W: Write + Send> ChartBackend for ConsoleBackend<W> {
    type Instance = u64;

    fn create(&mut self, spec: &ChartSpec) -> Result<u64, RenderError> {
        let text = match self.format {
            OutputFormat::Table => render_table(spec),
            OutputFormat::Json => serde_json::to_string(spec).map_err(|e| RenderError::Backend(e.to_string()))?,
        };
        writeln!(self.out, "{text}")
            .and_then(|()| self.out.flush())
            .map_err(|e| RenderError::Backend(e.to_string()))?;

        self.drawn += 1;
        tracing::debug!(chart = self.drawn, title = %spec.title, "chart written");
        Ok(self.drawn)
    }

    fn destroy(&mut self, instance: u64) {
        tracing::debug!(chart = instance, "chart released");
    }
}

/// Text table of a chart: a title line, a header row, then one row per year
///
/// Values use the chart's tick formatting; gaps print as `N/A`.
#[must_use]
pub fn render_table(spec: &ChartSpec) -> String {
    let mut header = vec!["year".to_string()];
    header.extend(spec.datasets.iter().map(|d| d.label.clone()));

    let mut rows = vec![header];
    for (i, year) in spec.labels.iter().enumerate() {
        let mut row = vec![year.clone()];
        row.extend(spec.datasets.iter().map(|d| match d.data.get(i).copied().flatten() {
            Some(v) => spec.format_tick(v),
            None => "N/A".to_string(),
        }));
        rows.push(row);
    }

    let columns = spec.datasets.len() + 1;
    let widths: Vec<usize> = (0..columns)
        .map(|c| rows.iter().filter_map(|r| r.get(c)).map(|cell| cell.chars().count()).max().unwrap_or(0))
        .collect();

    let mut text = format!("{} | {}\n", spec.title, spec.variable_name);
    for row in &rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        text.push_str(line.trim_end());
        text.push('\n');
    }
    text
}
