//! Where records come from and which columns carry identity

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Endpoint of a feature layer (REST URL including the layer id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceLocation(String);

impl SourceLocation {
    #[inline]
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The layer's query endpoint
    #[must_use]
    pub fn query_url(&self) -> String {
        format!("{}/query", self.0.trim_end_matches('/'))
    }
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Column names used to identify entities, groups and years
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaFields {
    pub id_field: String,
    pub name_field: String,
    pub group_field: String,
    pub year_field: String,
}

impl Default for SchemaFields {
    fn default() -> Self {
        Self {
            id_field: "crdt_unique_id".to_string(),
            name_field: "name".to_string(),
            group_field: "county_name".to_string(),
            year_field: "year".to_string(),
        }
    }
}

/// A queryable feature layer plus its schema conventions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSource {
    pub url: SourceLocation,
    #[serde(flatten)]
    pub fields: SchemaFields,
}

impl FeatureSource {
    /// Source with the default schema field names
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: SourceLocation::new(url),
            fields: SchemaFields::default(),
        }
    }

    /// Override schema field names
    #[inline]
    #[must_use]
    pub fn with_fields(mut self, fields: SchemaFields) -> Self {
        self.fields = fields;
        self
    }
}
