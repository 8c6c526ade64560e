//! The feature-service port
//!
//! Implement [`FeatureQueryService`] to plug a new backend into the loader.

use crate::error::QueryError;
use crate::filter::FeatureQuery;
use crate::source::SourceLocation;
use async_trait::async_trait;
use geotrend_series::Attributes;
use std::sync::Arc;

/// Remote tabular query service
///
/// Returns the attribute maps of every record matching `query.filter`,
/// restricted to `query.out_fields`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeatureQueryService: Send + Sync {
    /// Run one query against `source`
    async fn query(
        &self,
        source: &SourceLocation,
        query: &FeatureQuery,
    ) -> Result<Vec<Attributes>, QueryError>;
}

#[async_trait]
impl<T: FeatureQueryService + ?Sized> FeatureQueryService for Arc<T> {
    async fn query(
        &self,
        source: &SourceLocation,
        query: &FeatureQuery,
    ) -> Result<Vec<Attributes>, QueryError> {
        (**self).query(source, query).await
    }
}
