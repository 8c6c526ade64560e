//! `load` and `replay` subcommands

use crate::backend::{ConsoleBackend, OutputFormat};
use crate::script::{scheduled, ReplayScript};
use anyhow::{Context, Result};
use geotrend_core::{build_loader, ChartPipeline, ChartRenderer, ChartSpec, ChartView, PipelineConfig};
use geotrend_query::{FeatureQueryService, HttpFeatureService, InMemoryFeatureService};
use geotrend_series::EntityId;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::Instant;

/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "geotrend.toml";

/// Where records come from and how charts are written
#[derive(Debug, Clone)]
pub struct CommonArgs {
    pub config: PathBuf,
    /// JSON records served in place of the remote service
    pub fixture: Option<PathBuf>,
    pub format: OutputFormat,
}

impl Default for CommonArgs {
    fn default() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_CONFIG_PATH),
            fixture: None,
            format: OutputFormat::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadArgs {
    pub common: CommonArgs,
    pub entity: String,
    /// Variable field name from the config catalog
    pub variable: String,
}

#[derive(Debug, Clone)]
pub struct ReplayArgs {
    pub common: CommonArgs,
    pub script: PathBuf,
}

/// Read and validate the pipeline config
///
/// # Errors
/// Fails when the file is missing, malformed or invalid.
pub fn read_config(path: &Path) -> Result<PipelineConfig> {
    PipelineConfig::load(path).with_context(|| format!("reading config {}", path.display()))
}

/// Fixture-backed service when `fixture` is set, the remote service otherwise
///
/// # Errors
/// Fails when the fixture cannot be read or decoded.
pub fn feature_service(config: &PipelineConfig, fixture: Option<&Path>) -> Result<Arc<dyn FeatureQueryService>> {
    let Some(path) = fixture else {
        tracing::info!(url = %config.source.url, "querying remote feature service");
        return Ok(Arc::new(HttpFeatureService::new()));
    };

    let text = std::fs::read_to_string(path).with_context(|| format!("reading fixture {}", path.display()))?;
    let service = InMemoryFeatureService::from_json_str(config.source.url.clone(), &text)
        .with_context(|| format!("decoding fixture {}", path.display()))?;
    tracing::info!(
        fixture = %path.display(),
        records = service.record_count(&config.source.url),
        "serving records from fixture"
    );
    Ok(Arc::new(service))
}

/// Load one entity's chart and write it to `out`
///
/// # Errors
/// Fails on config or fixture problems, an unknown variable, an entity
/// without records, a remote failure or a write failure.
pub async fn load<W: Write + Send>(args: &LoadArgs, out: W) -> Result<ChartSpec> {
    let config = read_config(&args.common.config)?;
    let variable = config
        .variable(&args.variable)
        .with_context(|| format!("unknown variable `{}`", args.variable))?
        .clone();
    let loader = build_loader(&config, feature_service(&config, args.common.fixture.as_deref())?);

    let entity_id = EntityId::new(args.entity.as_str());
    let series = loader
        .load(&entity_id, &variable)
        .await
        .with_context(|| format!("loading {entity_id} / {}", variable.field_name))?;
    let spec = ChartSpec::from_series(&series, &variable)?;

    let mut renderer = ChartRenderer::new(ConsoleBackend::new(out, args.common.format));
    renderer.render(&spec)?;
    Ok(spec)
}

/// Replay a scripted session through the full pipeline
///
/// Every chart drawn is written to `out`. Returns the final view once the
/// script has run out and the last load has finished, or once `shutdown`
/// resolves.
///
/// # Errors
/// Fails on config, fixture or script problems. Load failures during the
/// replay are logged, not returned.
pub async fn replay<W, S>(args: &ReplayArgs, out: W, shutdown: S) -> Result<ChartView>
where
    W: Write + Send,
    S: Future<Output = ()> + Send,
{
    let config = read_config(&args.common.config)?;
    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("reading script {}", args.script.display()))?;
    let script = ReplayScript::from_toml_str(&text).with_context(|| format!("parsing script {}", args.script.display()))?;
    let schedule = script.schedule(&config)?;
    let loader = build_loader(&config, feature_service(&config, args.common.fixture.as_deref())?);

    tracing::info!(
        events = script.events.len(),
        end_ms = schedule.end_ms,
        debounce_ms = config.debounce_ms,
        "replaying script"
    );

    let start = Instant::now();
    let hovers = scheduled(schedule.hovers, start, schedule.end_ms);
    let variables = scheduled(schedule.variables, start, schedule.end_ms);

    let pipeline = ChartPipeline::from_config(&config, loader, ConsoleBackend::new(out, args.common.format));
    let controller = pipeline.run_until(hovers, variables, shutdown).await;

    tracing::info!(
        charts = controller.renderer().render_count(),
        elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "replay finished"
    );
    Ok(controller.view().clone())
}

/// One-line description of a view for table output
#[must_use]
pub fn describe_view(view: &ChartView) -> String {
    if !view.visible {
        return "final: hidden".to_string();
    }
    let entity = view.active_entity.as_ref().map_or("-", EntityId::as_str);
    format!(
        "final: {:?} entity={entity} chart=\"{}\" variable=\"{}\"",
        view.phase, view.entity_label, view.variable_name
    )
}
