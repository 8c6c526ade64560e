//! Testing utilities for the geotrend workspace
//!
//! Shared fixtures, a query-recording service wrapper with latency and
//! failure injection, a recording chart backend and timed input streams.

#![allow(missing_docs)]

use async_trait::async_trait;
use futures::Stream;
use geotrend_core::{ChartBackend, ChartSpec, RenderError};
use geotrend_query::{
    FeatureQuery, FeatureQueryService, FeatureSource, Filter, InMemoryFeatureService, QueryError, SourceLocation,
};
use geotrend_series::{Attributes, ValueType, Variable};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const SOURCE_URL: &str = "memory://tracts";
pub const FIELD: &str = "pct_poverty";

/// Tracts T1, T2 (Mecklenburg), T3 (Gaston) and T4 (no county), 2018-2020
pub fn sample_records() -> Vec<Attributes> {
    let rows = json!([
        {"crdt_unique_id": "T1", "name": "Tract 1", "county_name": "Mecklenburg", "year": 2018, "pct_poverty": 10.0},
        {"crdt_unique_id": "T1", "name": "Tract 1", "county_name": "Mecklenburg", "year": 2019, "pct_poverty": 12.0},
        {"crdt_unique_id": "T1", "name": "Tract 1", "county_name": "Mecklenburg", "year": 2020, "pct_poverty": 14.0},
        {"crdt_unique_id": "T2", "name": "Tract 2", "county_name": "Mecklenburg", "year": 2018, "pct_poverty": 20.0},
        {"crdt_unique_id": "T2", "name": "Tract 2", "county_name": "Mecklenburg", "year": 2019, "pct_poverty": null},
        {"crdt_unique_id": "T2", "name": "Tract 2", "county_name": "Mecklenburg", "year": 2020, "pct_poverty": 24.0},
        {"crdt_unique_id": "T3", "name": "Tract 3", "county_name": "Gaston", "year": 2018, "pct_poverty": 30.0},
        {"crdt_unique_id": "T3", "name": "Tract 3", "county_name": "Gaston", "year": 2020, "pct_poverty": 33.0},
        {"crdt_unique_id": "T4", "year": 2019, "pct_poverty": 40.0}
    ]);
    match rows {
        Value::Array(items) => items.into_iter().filter_map(|v| v.as_object().cloned()).collect(),
        _ => Vec::new(),
    }
}

pub fn sample_variable() -> Variable {
    Variable::new(FIELD, "Poverty Rate", ValueType::Percentage, vec![2018, 2019, 2020])
}

pub fn income_variable() -> Variable {
    Variable::new("median_income", "Median Income", ValueType::Money, vec![2019, 2020])
}

pub fn sample_source() -> FeatureSource {
    FeatureSource::new(SOURCE_URL)
}

pub fn sample_service() -> InMemoryFeatureService {
    InMemoryFeatureService::new().with_table(SourceLocation::new(SOURCE_URL), sample_records())
}

/// Which queries an injected behavior applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryMatch {
    /// Queries whose filter compares some field against this value
    Value(String),
    /// The unfiltered whole-dataset query
    WholeDataset,
    Any,
}

impl QueryMatch {
    pub fn value(value: impl Into<String>) -> Self {
        Self::Value(value.into())
    }

    pub fn matches(&self, query: &FeatureQuery) -> bool {
        match self {
            Self::Any => true,
            Self::WholeDataset => matches!(query.filter, Filter::All),
            Self::Value(v) => compares_value(&query.filter, v),
        }
    }
}

fn compares_value(filter: &Filter, expected: &str) -> bool {
    match filter {
        Filter::Equals { value, .. } => value == expected,
        Filter::And(parts) => parts.iter().any(|p| compares_value(p, expected)),
        Filter::All => false,
    }
}

/// Service wrapper recording every query, with optional latency and failures
///
/// Clones share the query log.
pub struct RecordingService<S> {
    inner: Arc<S>,
    log: Arc<Mutex<Vec<FeatureQuery>>>,
    delays: Vec<(QueryMatch, Duration)>,
    failures: Vec<(QueryMatch, String)>,
}

impl<S: FeatureQueryService> RecordingService<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner: Arc::new(inner),
            log: Arc::new(Mutex::new(Vec::new())),
            delays: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Delay matching queries; the first matching rule applies
    #[must_use]
    pub fn with_delay(mut self, matcher: QueryMatch, delay: Duration) -> Self {
        self.delays.push((matcher, delay));
        self
    }

    /// Fail matching queries with a transport error
    #[must_use]
    pub fn with_failure(mut self, matcher: QueryMatch, message: impl Into<String>) -> Self {
        self.failures.push((matcher, message.into()));
        self
    }

    pub fn queries(&self) -> Vec<FeatureQuery> {
        self.log.lock().clone()
    }

    pub fn query_count(&self) -> usize {
        self.log.lock().len()
    }

    /// Number of recorded queries that compare against `value`
    pub fn queries_for(&self, value: &str) -> usize {
        self.log.lock().iter().filter(|q| compares_value(&q.filter, value)).count()
    }
}

impl<S> Clone for RecordingService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            log: Arc::clone(&self.log),
            delays: self.delays.clone(),
            failures: self.failures.clone(),
        }
    }
}

impl<S> std::fmt::Debug for RecordingService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingService")
            .field("queries", &self.log.lock().len())
            .field("delays", &self.delays)
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S: FeatureQueryService + 'static> FeatureQueryService for RecordingService<S> {
    async fn query(&self, source: &SourceLocation, query: &FeatureQuery) -> Result<Vec<Attributes>, QueryError> {
        self.log.lock().push(query.clone());

        if let Some((_, delay)) = self.delays.iter().find(|(m, _)| m.matches(query)) {
            tokio::time::sleep(*delay).await;
        }
        if let Some((_, message)) = self.failures.iter().find(|(m, _)| m.matches(query)) {
            return Err(QueryError::Transport(message.clone()));
        }
        self.inner.query(source, query).await
    }
}

/// What a [`RecordingBackend`] was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Created { id: u64, spec: ChartSpec },
    Destroyed { id: u64 },
}

/// Chart backend that records creations and destructions
///
/// Clones share the event log, so a test can keep one clone while the
/// pipeline owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    events: Arc<Mutex<Vec<BackendEvent>>>,
    next_id: u64,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BackendEvent> {
        self.events.lock().clone()
    }

    /// Titles of every chart created, in order
    pub fn titles(&self) -> Vec<String> {
        self.created().into_iter().map(|spec| spec.title).collect()
    }

    pub fn created(&self) -> Vec<ChartSpec> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                BackendEvent::Created { spec, .. } => Some(spec.clone()),
                BackendEvent::Destroyed { .. } => None,
            })
            .collect()
    }

    pub fn last_spec(&self) -> Option<ChartSpec> {
        self.created().pop()
    }

    /// Charts created and not yet destroyed
    pub fn live_count(&self) -> usize {
        self.events.lock().iter().fold(0usize, |live, e| match e {
            BackendEvent::Created { .. } => live + 1,
            BackendEvent::Destroyed { .. } => live.saturating_sub(1),
        })
    }
}

impl ChartBackend for RecordingBackend {
    type Instance = u64;

    fn create(&mut self, spec: &ChartSpec) -> Result<u64, RenderError> {
        self.next_id += 1;
        self.events.lock().push(BackendEvent::Created {
            id: self.next_id,
            spec: spec.clone(),
        });
        Ok(self.next_id)
    }

    fn destroy(&mut self, instance: u64) {
        self.events.lock().push(BackendEvent::Destroyed { id: instance });
    }
}

/// Stream yielding each value at `at_ms` after creation
///
/// Offsets must be non-decreasing. Works with a paused tokio clock.
pub fn timed<T: Send + 'static>(events: Vec<(u64, T)>) -> impl Stream<Item = T> + Send {
    let start = Instant::now();
    futures::stream::unfold(VecDeque::from(events), move |mut queue| async move {
        let (at_ms, value) = queue.pop_front()?;
        tokio::time::sleep_until(start + Duration::from_millis(at_ms)).await;
        Some((value, queue))
    })
}

/// Stream that yields `value` immediately and then stays open for `open_ms`
pub fn held<T: Send + 'static>(value: T, open_ms: u64) -> impl Stream<Item = T> + Send {
    let start = Instant::now();
    futures::stream::unfold(Some(value), move |state| async move {
        match state {
            Some(value) => Some((value, None)),
            None => {
                tokio::time::sleep_until(start + Duration::from_millis(open_ms)).await;
                None
            }
        }
    })
}
