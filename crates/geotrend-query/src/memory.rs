//! In-memory feature-service backend
//!
//! Holds one table of records per source location and answers queries by
//! evaluating the same [`Filter`](crate::Filter) the remote service would.

use crate::error::QueryError;
use crate::filter::FeatureQuery;
use crate::http::decode_body;
use crate::service::FeatureQueryService;
use crate::source::SourceLocation;
use async_trait::async_trait;
use geotrend_series::Attributes;
use serde_json::Value;
use std::collections::HashMap;

/// Fixture-backed feature service
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeatureService {
    tables: HashMap<SourceLocation, Vec<Attributes>>,
}

impl InMemoryFeatureService {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the records served for `source`
    #[must_use]
    pub fn with_table(mut self, source: SourceLocation, records: Vec<Attributes>) -> Self {
        self.tables.insert(source, records);
        self
    }

    /// Build from a JSON fixture
    ///
    /// Accepts either an array of attribute objects or a feature-service
    /// answer (`{"features": [{"attributes": {..}}]}`).
    ///
    /// # Errors
    /// `QueryError::Decode` when the text is neither shape.
    pub fn from_json_str(source: SourceLocation, json: &str) -> Result<Self, QueryError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| QueryError::Decode(e.to_string()))?;

        let records = match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map),
                    other => Err(QueryError::Decode(format!(
                        "expected an attribute object, found {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Value::Object(_) => decode_body(json)?,
            other => {
                return Err(QueryError::Decode(format!(
                    "expected an array or a query response, found {other}"
                )))
            }
        };

        Ok(Self::new().with_table(source, records))
    }

    /// Number of records held for `source`
    #[must_use]
    pub fn record_count(&self, source: &SourceLocation) -> usize {
        self.tables.get(source).map_or(0, Vec::len)
    }
}

#[async_trait]
impl FeatureQueryService for InMemoryFeatureService {
    async fn query(
        &self,
        source: &SourceLocation,
        query: &FeatureQuery,
    ) -> Result<Vec<Attributes>, QueryError> {
        let table = self
            .tables
            .get(source)
            .ok_or_else(|| QueryError::InvalidSource(source.to_string()))?;

        let keep_all = query.out_fields.is_empty() || query.out_fields.iter().any(|f| f == "*");

        Ok(table
            .iter()
            .filter(|record| query.filter.matches(record))
            .map(|record| {
                if keep_all {
                    record.clone()
                } else {
                    query
                        .out_fields
                        .iter()
                        .filter_map(|field| record.get(field).map(|v| (field.clone(), v.clone())))
                        .collect()
                }
            })
            .collect())
    }
}
