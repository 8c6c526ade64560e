//! Entity / group / region series loader
//!
//! One load issues up to three queries against the same source:
//!
//! 1. the entity's own records (also discovers its display name and group)
//! 2. every record of that group, averaged per year
//! 3. every record of the source, averaged per year
//!
//! Steps 2 and 3 start together once step 1 has answered. The whole-source
//! query is the expensive one; it is issued on every load.

use crate::error::{LoadError, QueryError};
use crate::filter::{FeatureQuery, Filter};
use crate::service::FeatureQueryService;
use crate::source::FeatureSource;
use geotrend_series::{group_mean, null_series, point_series, Attributes, EntityId, Observation, SeriesPoint, Variable};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Label used for the group series when the entity has no group
pub const FALLBACK_GROUP_LABEL: &str = "County Avg";

/// Label of the whole-source series
pub const REGION_LABEL: &str = "Region Avg";

/// Progress of one load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadStage {
    Pending,
    EntityFetched,
    GroupFetched,
    RegionFetched,
    Rendered,
}

/// Everything a chart needs for one (entity, variable) pair
///
/// `entity`, `group` and `region` each hold exactly one point per entry of
/// `years`, in the same order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub entity_id: EntityId,
    pub entity_label: String,
    /// Group discovered from the entity's first record
    pub group_name: Option<String>,
    pub years: Vec<i32>,
    pub entity: Vec<SeriesPoint>,
    pub group: Vec<SeriesPoint>,
    pub region: Vec<SeriesPoint>,
}

impl ChartSeries {
    /// Legend label of the group series
    #[must_use]
    pub fn group_label(&self) -> String {
        self.group_name
            .as_ref()
            .map_or_else(|| FALLBACK_GROUP_LABEL.to_string(), |g| format!("{g} Avg"))
    }

    /// Legend label of the region series
    #[inline]
    #[must_use]
    pub fn region_label(&self) -> &'static str {
        REGION_LABEL
    }

    /// Whether all three series line up with `years`
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        [&self.entity, &self.group, &self.region].iter().all(|series| {
            series.len() == self.years.len()
                && series.iter().zip(&self.years).all(|(p, y)| p.year == *y)
        })
    }
}

/// Loads the three comparison series for an entity
pub struct SeriesLoader {
    service: Arc<dyn FeatureQueryService>,
    source: FeatureSource,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for SeriesLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesLoader")
            .field("source", &self.source)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SeriesLoader {
    /// Loader without a per-query time limit
    #[must_use]
    pub fn new(service: Arc<dyn FeatureQueryService>, source: FeatureSource) -> Self {
        Self {
            service,
            source,
            timeout: None,
        }
    }

    /// Fail any single query that takes longer than `limit`
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> &FeatureSource {
        &self.source
    }

    /// Load entity, group and region series for `variable`
    ///
    /// # Errors
    /// - `LoadError::NoData` if the entity query matches nothing
    /// - `LoadError::RemoteQuery` if any query fails; nothing partial is
    ///   returned
    pub async fn load(&self, entity_id: &EntityId, variable: &Variable) -> Result<ChartSeries, LoadError> {
        let years = variable.years_axis();
        let field = variable.field_name.as_str();
        let schema = &self.source.fields;

        tracing::debug!(entity = %entity_id, field, stage = ?LoadStage::Pending, "load started");

        let entity_query = FeatureQuery::new(Filter::equals(&schema.id_field, entity_id.as_str())).with_fields([
            field,
            schema.year_field.as_str(),
            schema.name_field.as_str(),
            schema.group_field.as_str(),
            schema.id_field.as_str(),
        ]);
        let records = self.run(&entity_query).await?;

        let Some(first) = records.first() else {
            return Err(LoadError::NoData {
                entity_id: entity_id.clone(),
            });
        };

        let entity_label = text_attribute(first, &schema.name_field).unwrap_or_else(|| entity_id.to_string());
        let group_name = text_attribute(first, &schema.group_field);
        let own: Vec<Observation> = self
            .observations(&records, field)
            .into_iter()
            .filter(|o| o.entity_id.as_ref().map_or(true, |id| id == entity_id))
            .collect();
        let entity = point_series(&own, &years);

        tracing::debug!(
            entity = %entity_id,
            records = records.len(),
            group = group_name.as_deref().unwrap_or("-"),
            stage = ?LoadStage::EntityFetched,
            "entity records fetched"
        );

        let group_fut = async {
            let Some(group) = group_name.as_deref() else {
                return Ok::<_, QueryError>(null_series(&years));
            };
            let query = FeatureQuery::new(Filter::equals(&schema.group_field, group))
                .with_fields([field, schema.year_field.as_str()]);
            let records = self.run(&query).await?;
            tracing::debug!(group, records = records.len(), stage = ?LoadStage::GroupFetched, "group records fetched");
            Ok(group_mean(&self.observations(&records, field), &years))
        };

        let region_fut = async {
            let query = FeatureQuery::new(Filter::all()).with_fields([field, schema.year_field.as_str()]);
            let records = self.run(&query).await?;
            tracing::debug!(records = records.len(), stage = ?LoadStage::RegionFetched, "region records fetched");
            Ok::<_, QueryError>(group_mean(&self.observations(&records, field), &years))
        };

        let (group, region) = futures::try_join!(group_fut, region_fut)?;

        Ok(ChartSeries {
            entity_id: entity_id.clone(),
            entity_label,
            group_name,
            years,
            entity,
            group,
            region,
        })
    }

    async fn run(&self, query: &FeatureQuery) -> Result<Vec<Attributes>, QueryError> {
        let pending = self.service.query(&self.source.url, query);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, pending).await.map_err(|_| QueryError::Timeout {
                duration_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            })?,
            None => pending.await,
        }
    }

    /// Observations of `field`, tagged with the record's entity and group
    /// when those attributes were fetched
    fn observations(&self, records: &[Attributes], field: &str) -> Vec<Observation> {
        let schema = &self.source.fields;
        records
            .iter()
            .filter_map(|r| {
                let mut obs = Observation::from_attributes(r, field, &schema.year_field)?;
                if let Some(id) = text_attribute(r, &schema.id_field) {
                    obs = obs.with_entity(EntityId::new(id));
                }
                if let Some(group) = text_attribute(r, &schema.group_field) {
                    obs = obs.with_group(group);
                }
                Some(obs)
            })
            .collect()
    }
}

/// Non-empty text of an attribute, numbers rendered as text
fn text_attribute(record: &Attributes, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
