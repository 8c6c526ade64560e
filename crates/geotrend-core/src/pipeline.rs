//! Async driver wiring hover and variable streams to the controller
//!
//! One task owns the [`ChartController`] and runs a `select!` loop over:
//!
//! - finished loads (applied first, so a result is never starved by input)
//! - raw hover values, fed into the [`Debouncer`]
//! - variable changes, applied immediately
//! - the debounce deadline
//! - an optional shutdown signal
//!
//! Each load runs in its own spawned task and reports back over a channel
//! together with its request. Starting a newer load aborts the previous
//! task; a result that still slips through is discarded by generation.

use crate::config::PipelineConfig;
use crate::controller::{ChartController, ChartView, LoadGeneration, LoadRequest};
use crate::debounce::Debouncer;
use crate::error::LoadError;
use crate::render::ChartBackend;
use futures::{Stream, StreamExt};
use geotrend_query::{ChartSeries, FeatureQueryService, SeriesLoader};
use geotrend_series::{EntityId, Variable};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

type Finished = (LoadRequest, Result<ChartSeries, LoadError>);

/// Hover-driven chart pipeline
pub struct ChartPipeline<B: ChartBackend> {
    controller: ChartController<B>,
    loader: Arc<SeriesLoader>,
    debouncer: Debouncer<Option<EntityId>>,
    in_flight: Option<(LoadGeneration, JoinHandle<()>)>,
    view_tx: watch::Sender<ChartView>,
}

impl<B: ChartBackend> ChartPipeline<B> {
    /// Pipeline with the default quiet period
    #[must_use]
    pub fn new(loader: SeriesLoader, backend: B) -> Self {
        let (view_tx, _) = watch::channel(ChartView::default());
        Self {
            controller: ChartController::new(backend),
            loader: Arc::new(loader),
            debouncer: Debouncer::new(Duration::from_millis(crate::config::DEFAULT_DEBOUNCE_MS)),
            in_flight: None,
            view_tx,
        }
    }

    /// Pipeline configured from `config`
    ///
    /// The loader should already carry the configured source and timeout;
    /// see [`build_loader`].
    #[must_use]
    pub fn from_config(config: &PipelineConfig, loader: SeriesLoader, backend: B) -> Self {
        Self::new(loader, backend).with_debounce(config.debounce())
    }

    /// With hover quiet period
    #[inline]
    #[must_use]
    pub fn with_debounce(mut self, quiet: Duration) -> Self {
        self.debouncer = Debouncer::new(quiet);
        self
    }

    /// Watch the visible state
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ChartView> {
        self.view_tx.subscribe()
    }

    #[inline]
    #[must_use]
    pub fn controller(&self) -> &ChartController<B> {
        &self.controller
    }

    /// Run until both input streams end and the last load has finished
    ///
    /// The chart drawn last stays live; call
    /// [`ChartController::shutdown`] on the returned controller to destroy it.
    pub async fn run<H, V>(self, hovers: H, variables: V) -> ChartController<B>
    where
        H: Stream<Item = Option<EntityId>> + Send,
        V: Stream<Item = Option<Variable>> + Send,
    {
        self.run_until(hovers, variables, futures::future::pending::<()>()).await
    }

    /// Like [`run`](Self::run), but tears everything down once `shutdown`
    /// resolves
    ///
    /// Teardown aborts the in-flight load and destroys the live chart.
    pub async fn run_until<H, V, S>(mut self, hovers: H, variables: V, shutdown: S) -> ChartController<B>
    where
        H: Stream<Item = Option<EntityId>> + Send,
        V: Stream<Item = Option<Variable>> + Send,
        S: Future<Output = ()> + Send,
    {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Finished>();
        futures::pin_mut!(hovers, variables, shutdown);
        let mut hovers_open = true;
        let mut variables_open = true;

        tracing::debug!(quiet = ?self.debouncer.quiet_period(), "chart pipeline started");

        loop {
            let deadline = self.debouncer.deadline();
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    self.teardown();
                    break;
                }

                Some((request, result)) = done_rx.recv() => {
                    if self.in_flight.as_ref().is_some_and(|(g, _)| *g == request.generation) {
                        self.in_flight = None;
                    }
                    self.controller.on_load_finished(&request, result);
                }

                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(hover) = self.debouncer.poll(Instant::now()) {
                        let request = self.controller.on_hover(hover);
                        self.dispatch(request, &done_tx);
                    }
                }

                hover = hovers.next(), if hovers_open => match hover {
                    Some(hover) => self.debouncer.push(hover, Instant::now()),
                    None => {
                        hovers_open = false;
                        if let Some(hover) = self.debouncer.flush() {
                            let request = self.controller.on_hover(hover);
                            self.dispatch(request, &done_tx);
                        }
                    }
                },

                variable = variables.next(), if variables_open => match variable {
                    Some(variable) => {
                        let request = self.controller.on_variable(variable);
                        self.dispatch(request, &done_tx);
                    }
                    None => variables_open = false,
                },
            }

            self.view_tx.send_replace(self.controller.view().clone());

            if !hovers_open && !variables_open && self.in_flight.is_none() {
                break;
            }
        }

        self.view_tx.send_replace(self.controller.view().clone());
        tracing::debug!(generation = %self.controller.current_generation(), "chart pipeline stopped");
        self.controller
    }

    /// Abort superseded work and start `request`, if any
    fn dispatch(&mut self, request: Option<LoadRequest>, done_tx: &mpsc::UnboundedSender<Finished>) {
        let current = self.controller.current_generation();
        if let Some((generation, handle)) = self.in_flight.take() {
            if generation == current {
                self.in_flight = Some((generation, handle));
            } else {
                tracing::debug!(superseded = %generation, current = %current, "aborting superseded load");
                handle.abort();
            }
        }

        let Some(request) = request else { return };
        let loader = Arc::clone(&self.loader);
        let done_tx = done_tx.clone();
        let generation = request.generation;
        let handle = tokio::spawn(async move {
            let result = loader.load(&request.entity_id, &request.variable).await;
            // receiver gone means the pipeline stopped
            let _ = done_tx.send((request, result));
        });
        self.in_flight = Some((generation, handle));
    }

    fn teardown(&mut self) {
        if let Some((generation, handle)) = self.in_flight.take() {
            tracing::debug!(%generation, "aborting in-flight load on shutdown");
            handle.abort();
        }
        self.controller.shutdown();
    }
}

/// Loader for the configured source and time limit
#[must_use]
pub fn build_loader(config: &PipelineConfig, service: Arc<dyn FeatureQueryService>) -> SeriesLoader {
    let loader = SeriesLoader::new(service, config.source.clone());
    match config.query_timeout() {
        Some(limit) => loader.with_timeout(limit),
        None => loader,
    }
}
