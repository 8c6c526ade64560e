use futures::stream;
use geotrend_core::{build_loader, ChartPhase, ChartPipeline, PipelineConfig, SeriesRole};
use geotrend_query::{FeatureQueryService, InMemoryFeatureService};
use geotrend_series::{EntityId, Variable};
use geotrend_test_utils::{
    held, income_variable, sample_service, sample_source, sample_variable, timed, QueryMatch, RecordingBackend,
    RecordingService,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn hover(id: &str) -> Option<EntityId> {
    Some(EntityId::new(id))
}

fn pipeline(
    service: RecordingService<InMemoryFeatureService>,
    backend: RecordingBackend,
) -> ChartPipeline<RecordingBackend> {
    let config = PipelineConfig::new(sample_source());
    let service: Arc<dyn FeatureQueryService> = Arc::new(service);
    ChartPipeline::from_config(&config, build_loader(&config, service), backend)
}

fn poverty_selected(open_ms: u64) -> impl futures::Stream<Item = Option<Variable>> + Send {
    held(Some(sample_variable()), open_ms)
}

#[tokio::test(start_paused = true)]
async fn test_same_id_within_window_loads_once() {
    let service = RecordingService::new(sample_service());
    let backend = RecordingBackend::new();

    let hovers = timed(vec![(0, hover("T1")), (100, hover("T1")), (250, hover("T1"))]);
    let controller = pipeline(service.clone(), backend.clone())
        .run(hovers, poverty_selected(2_000))
        .await;

    assert_eq!(service.queries_for("T1"), 1);
    assert_eq!(backend.titles(), vec!["Tract 1"]);
    assert_eq!(controller.view().phase, ChartPhase::Loaded);
}

#[tokio::test(start_paused = true)]
async fn test_repeat_after_settling_is_suppressed() {
    let service = RecordingService::new(sample_service());
    let backend = RecordingBackend::new();

    // T1 settles at 300; T2 never survives the window; T1 again is a repeat
    let hovers = timed(vec![(0, hover("T1")), (1_000, hover("T2")), (1_100, hover("T1")), (2_000, hover("T1"))]);
    pipeline(service.clone(), backend.clone())
        .run(hovers, poverty_selected(3_000))
        .await;

    assert_eq!(service.queries_for("T1"), 1);
    assert_eq!(service.queries_for("T2"), 0);
    assert_eq!(backend.titles(), vec!["Tract 1"]);
}

#[tokio::test(start_paused = true)]
async fn test_hover_held_long_enough_loads_last_id() {
    let service = RecordingService::new(sample_service());
    let backend = RecordingBackend::new();

    let hovers = timed(vec![(0, None), (100, hover("T1")), (200, hover("T2")), (600, None)]);
    let controller = pipeline(service.clone(), backend.clone())
        .run(hovers, poverty_selected(1_000))
        .await;

    assert_eq!(service.queries_for("T1"), 0);
    assert_eq!(service.queries_for("T2"), 1);
    assert_eq!(backend.titles(), vec!["Tract 2"]);
    assert!(!controller.view().visible);
    assert_eq!(controller.view().phase, ChartPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_hover_cleared_early_loads_nothing() {
    let service = RecordingService::new(sample_service());
    let backend = RecordingBackend::new();

    let hovers = timed(vec![(0, None), (100, hover("T1")), (200, hover("T2")), (300, None)]);
    let controller = pipeline(service.clone(), backend.clone())
        .run(hovers, poverty_selected(1_000))
        .await;

    assert_eq!(service.query_count(), 0);
    assert!(backend.events().is_empty());
    assert!(!controller.view().visible);
}

#[tokio::test(start_paused = true)]
async fn test_slow_superseded_load_never_renders() {
    let service = RecordingService::new(sample_service()).with_delay(QueryMatch::value("T1"), Duration::from_secs(1));
    let backend = RecordingBackend::new();

    // T1 settles at 300 and stalls; T2 settles at 700 and answers at once
    let hovers = timed(vec![(0, hover("T1")), (400, hover("T2")), (5_000, hover("T2"))]);
    let controller = pipeline(service.clone(), backend.clone())
        .run(hovers, poverty_selected(6_000))
        .await;

    assert_eq!(service.queries_for("T1"), 1);
    assert_eq!(backend.titles(), vec!["Tract 2"]);
    assert_eq!(controller.view().entity_label, "Tract 2");
    assert_eq!(controller.view().group_label, "Mecklenburg Avg");
}

#[tokio::test(start_paused = true)]
async fn test_slow_region_query_of_superseded_load_is_dropped() {
    // every load is slow on the whole-dataset query, so loads overlap
    let service =
        RecordingService::new(sample_service()).with_delay(QueryMatch::WholeDataset, Duration::from_millis(500));
    let backend = RecordingBackend::new();

    let hovers = timed(vec![(0, hover("T1")), (400, hover("T3")), (3_000, hover("T3"))]);
    let controller = pipeline(service.clone(), backend.clone())
        .run(hovers, poverty_selected(4_000))
        .await;

    // T1 started at 300 and was superseded at 700, before its region answer at 800
    assert_eq!(service.queries_for("T1"), 1);
    assert_eq!(backend.titles(), vec!["Tract 3"]);
    assert_eq!(controller.view().group_label, "Gaston Avg");
}

#[tokio::test(start_paused = true)]
async fn test_variable_change_reloads_without_debounce() {
    let service = RecordingService::new(sample_service());
    let backend = RecordingBackend::new();
    let start = Instant::now();

    let variables = timed(vec![(0, Some(sample_variable())), (1_000, Some(income_variable()))]);
    let pipeline = pipeline(service.clone(), backend.clone());
    let mut view = pipeline.subscribe();

    let run = tokio::spawn(pipeline.run(held(hover("T1"), 3_000), variables));

    tokio::time::sleep_until(start + Duration::from_millis(1_001)).await;
    assert_eq!(view.borrow_and_update().variable_name, "Median Income");
    assert_eq!(service.queries_for("T1"), 2);

    let controller = run.await.unwrap();
    let specs = backend.created();
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].variable_name, "Poverty Rate");
    assert_eq!(specs[1].variable_name, "Median Income");
    assert_eq!(specs[1].labels, vec!["2019", "2020"]);
    assert_eq!(controller.view().phase, ChartPhase::Loaded);
    // one chart live at a time
    assert_eq!(backend.live_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_entity_without_group_draws_null_group_series() {
    let service = RecordingService::new(sample_service());
    let backend = RecordingBackend::new();

    pipeline(service.clone(), backend.clone())
        .run(held(hover("T4"), 1_000), poverty_selected(1_000))
        .await;

    let spec = backend.last_spec().unwrap();
    let group = spec.dataset(SeriesRole::Group).unwrap();
    assert_eq!(group.label, "County Avg");
    assert_eq!(group.data, vec![None, None, None]);
    assert_eq!(spec.dataset(SeriesRole::Region).unwrap().data, vec![Some(20.0), Some(26.0), Some(23.7)]);
    assert_eq!(spec.dataset(SeriesRole::Entity).unwrap().data, vec![None, Some(40.0), None]);
    assert_eq!(spec.tooltip_label(SeriesRole::Group, 0).unwrap(), "County Avg: N/A");
    // no group query was issued
    assert_eq!(service.query_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_load_keeps_previous_chart() {
    let service = RecordingService::new(sample_service()).with_failure(QueryMatch::value("Gaston"), "connection reset");
    let backend = RecordingBackend::new();

    let hovers = timed(vec![(0, hover("T1")), (1_000, hover("T3")), (2_000, hover("T3"))]);
    let controller = pipeline(service.clone(), backend.clone())
        .run(hovers, poverty_selected(3_000))
        .await;

    assert_eq!(backend.titles(), vec!["Tract 1"]);
    assert_eq!(backend.live_count(), 1);
    let view = controller.view();
    assert_eq!(view.phase, ChartPhase::Settled);
    assert!(view.visible && !view.loading);
    assert_eq!(view.entity_label, "Tract 1");
    assert_eq!(view.active_entity, hover("T3"));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_entity_hides_chart() {
    let service = RecordingService::new(sample_service());
    let backend = RecordingBackend::new();

    let controller = pipeline(service.clone(), backend.clone())
        .run(held(hover("T404"), 1_000), poverty_selected(1_000))
        .await;

    assert!(backend.events().is_empty());
    assert!(!controller.view().visible);
    // only the entity query ran
    assert_eq!(service.query_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hover_without_variable_loads_nothing() {
    let service = RecordingService::new(sample_service());
    let backend = RecordingBackend::new();

    let controller = pipeline(service.clone(), backend.clone())
        .run(held(hover("T1"), 1_000), stream::empty())
        .await;

    assert_eq!(service.query_count(), 0);
    assert!(controller.view().visible);
    assert_eq!(controller.view().phase, ChartPhase::Settled);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_aborts_in_flight_and_destroys_chart() {
    let service = RecordingService::new(sample_service()).with_delay(QueryMatch::value("T2"), Duration::from_secs(5));
    let backend = RecordingBackend::new();
    let start = Instant::now();

    let hovers = timed(vec![(0, hover("T1")), (1_000, hover("T2")), (9_000, hover("T2"))]);
    let controller = pipeline(service.clone(), backend.clone())
        .run_until(hovers, poverty_selected(10_000), tokio::time::sleep(Duration::from_secs(2)))
        .await;

    // returned at the shutdown signal, not when T2 would have answered
    assert!(start.elapsed() < Duration::from_secs(3));
    assert_eq!(backend.titles(), vec!["Tract 1"]);
    assert_eq!(backend.live_count(), 0);
    assert!(!controller.renderer().is_live());
    assert!(!controller.view().visible);
    assert_eq!(controller.view().phase, ChartPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_remote_timeout_is_a_failed_load() {
    let service = RecordingService::new(sample_service()).with_delay(QueryMatch::WholeDataset, Duration::from_secs(60));
    let backend = RecordingBackend::new();
    let config = PipelineConfig::new(sample_source()).with_query_timeout_secs(5);
    let service: Arc<dyn FeatureQueryService> = Arc::new(service);
    let pipeline = ChartPipeline::from_config(&config, build_loader(&config, service), backend.clone());

    let controller = pipeline.run(held(hover("T1"), 1_000), poverty_selected(1_000)).await;

    assert!(backend.events().is_empty());
    assert_eq!(controller.view().phase, ChartPhase::Settled);
    assert!(!controller.view().loading);
}
