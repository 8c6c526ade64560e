//! Hover reaction controller
//!
//! The single writer of visible chart state. It receives already debounced
//! hover values and variable changes, decides when a load starts, and
//! applies load results only if they belong to the most recent request.
//!
//! Every request carries a [`LoadGeneration`]. Starting a request, clearing
//! the hover or deselecting the variable advances the generation, so any
//! result tagged with an older generation is dropped on arrival no matter
//! when or in which order it completes.

use crate::error::LoadError;
use crate::render::{ChartBackend, ChartRenderer, ChartSpec};
use crate::state_machine::{validate_transition, ChartPhase};
use geotrend_query::{ChartSeries, LoadStage};
use geotrend_series::{EntityId, Variable};
use serde::Serialize;
use std::fmt;

/// Monotonic request counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct LoadGeneration(u64);

impl LoadGeneration {
    #[inline]
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for LoadGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One unit of load work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub generation: LoadGeneration,
    pub entity_id: EntityId,
    pub variable: Variable,
}

/// What the chart panel currently shows
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ChartView {
    pub visible: bool,
    pub loading: bool,
    pub phase: ChartPhase,
    pub active_entity: Option<EntityId>,
    /// Entity display name of the drawn chart
    pub entity_label: String,
    /// Variable display name of the drawn chart
    pub variable_name: String,
    pub group_label: String,
    /// Generation of the most recent request
    pub generation: LoadGeneration,
}

/// How a finished load was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Drawn
    Rendered,
    /// Entity had no records; chart hidden
    NoData,
    /// Query or render failure
    ///
    /// The previous chart stays up unless the backend refused the new one,
    /// in which case the old instance is already gone and the panel hides.
    Failed,
    /// Superseded by a newer request; ignored
    Discarded,
}

/// Hover/variable state machine in front of a [`ChartRenderer`]
pub struct ChartController<B: ChartBackend> {
    renderer: ChartRenderer<B>,
    variable: Option<Variable>,
    generation: LoadGeneration,
    view: ChartView,
}

impl<B: ChartBackend> ChartController<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            renderer: ChartRenderer::new(backend),
            variable: None,
            generation: LoadGeneration::default(),
            view: ChartView::default(),
        }
    }

    /// Apply a debounced hover value
    ///
    /// Returns the load to start, if any.
    pub fn on_hover(&mut self, hover: Option<EntityId>) -> Option<LoadRequest> {
        match hover {
            None => {
                tracing::info!("hover cleared");
                self.generation = self.generation.next();
                self.view.active_entity = None;
                self.view.visible = false;
                self.view.loading = false;
                self.view.generation = self.generation;
                self.enter(ChartPhase::Idle);
                None
            }
            Some(entity_id) => {
                tracing::info!(entity = %entity_id, "hover accepted");
                self.view.active_entity = Some(entity_id);
                self.start_load()
            }
        }
    }

    /// Apply a variable selection change
    ///
    /// Reloads immediately when an entity is active.
    pub fn on_variable(&mut self, variable: Option<Variable>) -> Option<LoadRequest> {
        tracing::info!(
            field = variable.as_ref().map_or("-", |v| v.field_name.as_str()),
            "variable changed"
        );
        self.variable = variable;
        if self.view.active_entity.is_some() {
            self.start_load()
        } else {
            None
        }
    }

    fn start_load(&mut self) -> Option<LoadRequest> {
        self.generation = self.generation.next();
        self.view.generation = self.generation;

        let entity_id = self.view.active_entity.clone()?;
        self.view.visible = true;
        let Some(variable) = self.variable.clone() else {
            tracing::debug!(entity = %entity_id, "no variable selected; nothing to load");
            self.view.loading = false;
            self.enter(ChartPhase::Settled);
            return None;
        };

        self.view.loading = true;
        self.enter(ChartPhase::Loading);
        tracing::debug!(
            entity = %entity_id,
            field = %variable.field_name,
            generation = %self.generation,
            "load requested"
        );
        Some(LoadRequest {
            generation: self.generation,
            entity_id,
            variable,
        })
    }

    /// Apply the result of a load started by [`on_hover`](Self::on_hover)
    /// or [`on_variable`](Self::on_variable)
    pub fn on_load_finished(
        &mut self,
        request: &LoadRequest,
        result: Result<ChartSeries, LoadError>,
    ) -> LoadOutcome {
        // a request completes at most once
        if request.generation != self.generation || !self.view.loading {
            tracing::debug!(
                entity = %request.entity_id,
                generation = %request.generation,
                current = %self.generation,
                "discarding stale load result"
            );
            return LoadOutcome::Discarded;
        }

        self.view.loading = false;
        match result {
            Ok(series) => self.draw(&series, &request.variable),
            Err(LoadError::NoData { entity_id }) => {
                tracing::debug!(entity = %entity_id, "entity has no records; hiding chart");
                self.view.visible = false;
                self.enter(ChartPhase::Idle);
                LoadOutcome::NoData
            }
            Err(err) => {
                tracing::warn!(
                    entity = %request.entity_id,
                    error = %err,
                    retryable = err.is_retryable(),
                    "chart load failed; keeping previous chart"
                );
                self.enter(ChartPhase::Settled);
                LoadOutcome::Failed
            }
        }
    }

    fn draw(&mut self, series: &ChartSeries, variable: &Variable) -> LoadOutcome {
        let drawn = ChartSpec::from_series(series, variable).and_then(|spec| self.renderer.render(&spec));
        if let Err(err) = drawn {
            tracing::warn!(entity = %series.entity_id, error = %err, "chart render failed");
            if self.renderer.is_live() {
                self.enter(ChartPhase::Settled);
            } else {
                // the old chart was torn down before the failed create
                self.view.visible = false;
                self.view.entity_label.clear();
                self.view.variable_name.clear();
                self.view.group_label.clear();
                self.enter(ChartPhase::Idle);
            }
            return LoadOutcome::Failed;
        }

        self.view.entity_label.clone_from(&series.entity_label);
        self.view.variable_name.clone_from(&variable.name);
        self.view.group_label = series.group_label();
        self.enter(ChartPhase::Loaded);
        tracing::info!(
            entity = %series.entity_id,
            field = %variable.field_name,
            years = series.years.len(),
            stage = ?LoadStage::Rendered,
            "chart rendered"
        );
        LoadOutcome::Rendered
    }

    /// Supersede in-flight work and destroy the live chart
    pub fn shutdown(&mut self) {
        self.generation = self.generation.next();
        self.renderer.teardown();
        self.view = ChartView {
            generation: self.generation,
            ..ChartView::default()
        };
        tracing::debug!(generation = %self.generation, "chart controller shut down");
    }

    fn enter(&mut self, to: ChartPhase) {
        if let Err(err) = validate_transition(self.view.phase, to) {
            tracing::warn!(error = %err, "forcing phase change");
        }
        self.view.phase = to;
    }

    #[inline]
    #[must_use]
    pub fn view(&self) -> &ChartView {
        &self.view
    }

    #[inline]
    #[must_use]
    pub fn current_generation(&self) -> LoadGeneration {
        self.generation
    }

    #[inline]
    #[must_use]
    pub fn variable(&self) -> Option<&Variable> {
        self.variable.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn renderer(&self) -> &ChartRenderer<B> {
        &self.renderer
    }
}

impl<B: ChartBackend + fmt::Debug> fmt::Debug for ChartController<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartController")
            .field("renderer", &self.renderer)
            .field("variable", &self.variable)
            .field("generation", &self.generation)
            .field("view", &self.view)
            .finish()
    }
}
