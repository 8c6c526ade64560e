//! REST feature-service backend
//!
//! Issues `GET {url}/query?where=..&outFields=..&returnGeometry=..&f=json`
//! and reads `features[].attributes` from the JSON answer.

use crate::error::QueryError;
use crate::filter::FeatureQuery;
use crate::service::FeatureQueryService;
use crate::source::SourceLocation;
use async_trait::async_trait;
use geotrend_series::Attributes;
use serde::Deserialize;

/// Feature service reached over HTTP
#[derive(Debug, Clone, Default)]
pub struct HttpFeatureService {
    client: reqwest::Client,
}

impl HttpFeatureService {
    /// Backend with a default client
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend sharing an existing client (connection pool, proxies, TLS)
    #[inline]
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeatureQueryService for HttpFeatureService {
    async fn query(
        &self,
        source: &SourceLocation,
        query: &FeatureQuery,
    ) -> Result<Vec<Attributes>, QueryError> {
        if source.as_str().trim().is_empty() {
            return Err(QueryError::InvalidSource("empty url".to_string()));
        }

        let where_clause = query.filter.to_where_clause();
        tracing::debug!(source = %source, %where_clause, "issuing feature query");

        let params = [
            ("where", where_clause),
            ("outFields", query.out_fields_param()),
            ("returnGeometry", query.return_geometry.to_string()),
            ("f", "json".to_string()),
        ];

        let response = self
            .client
            .get(source.query_url())
            .query(&params)
            .send()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Transport(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        decode_body(&body)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(default, rename = "exceededTransferLimit")]
    exceeded_transfer_limit: bool,
    error: Option<ServiceErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    attributes: Attributes,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Decode a feature-service JSON answer into attribute maps
///
/// # Errors
/// - `QueryError::Service` when the body carries an `error` object
/// - `QueryError::Decode` when the body is not a query response
pub fn decode_body(body: &str) -> Result<Vec<Attributes>, QueryError> {
    let parsed: QueryResponse =
        serde_json::from_str(body).map_err(|e| QueryError::Decode(e.to_string()))?;

    if let Some(error) = parsed.error {
        return Err(QueryError::Service {
            code: error.code,
            message: error.message,
        });
    }

    if parsed.exceeded_transfer_limit {
        // No paging: averages cover only what came back.
        tracing::warn!(
            returned = parsed.features.len(),
            "feature service truncated the result set"
        );
    }

    Ok(parsed.features.into_iter().map(|f| f.attributes).collect())
}
