//! Server-side filter expressions and query descriptions
//!
//! A [`Filter`] renders to the SQL-like `where` clause feature services
//! accept and can also be evaluated locally against a record, so the
//! in-memory backend answers exactly what the remote one would.

use geotrend_series::Attributes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// Boolean predicate over record fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    /// Every record (`1=1`)
    All,
    /// `field = 'value'`
    Equals { field: String, value: String },
    /// Conjunction; empty means every record
    And(Vec<Filter>),
}

impl Filter {
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::All
    }

    #[inline]
    #[must_use]
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Conjoin with another filter, flattening nested conjunctions
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        let mut parts = match self {
            Self::And(parts) => parts,
            Self::All => Vec::new(),
            single => vec![single],
        };
        match other {
            Self::And(more) => parts.extend(more),
            Self::All => {}
            single => parts.push(single),
        }
        Self::And(parts)
    }

    /// Render as a `where` clause
    #[must_use]
    pub fn to_where_clause(&self) -> String {
        self.to_string()
    }

    /// Evaluate against a record
    #[must_use]
    pub fn matches(&self, record: &Attributes) -> bool {
        match self {
            Self::All => true,
            Self::Equals { field, value } => match record.get(field) {
                Some(Value::String(s)) => s == value,
                Some(Value::Number(n)) => n.to_string() == *value,
                Some(Value::Bool(b)) => b.to_string() == *value,
                _ => false,
            },
            Self::And(parts) => parts.iter().all(|p| p.matches(record)),
        }
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("1=1"),
            Self::Equals { field, value } => {
                write!(f, "{field} = '{}'", value.replace('\'', "''"))
            }
            Self::And(parts) if parts.is_empty() => f.write_str("1=1"),
            Self::And(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" AND ")?;
                    }
                    write!(f, "({part})")?;
                }
                Ok(())
            }
        }
    }
}

/// One query against a feature source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureQuery {
    pub filter: Filter,
    /// Requested attribute fields
    pub out_fields: Vec<String>,
    pub return_geometry: bool,
}

impl FeatureQuery {
    /// Attribute-only query for `filter` with no fields yet
    #[inline]
    #[must_use]
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            out_fields: Vec::new(),
            return_geometry: false,
        }
    }

    /// Request these fields
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.out_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// `outFields` parameter value
    #[must_use]
    pub fn out_fields_param(&self) -> String {
        if self.out_fields.is_empty() {
            "*".to_string()
        } else {
            self.out_fields.join(",")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn where_clause_rendering() {
        assert_eq!(Filter::all().to_where_clause(), "1=1");
        assert_eq!(
            Filter::equals("county_name", "Mecklenburg").to_where_clause(),
            "county_name = 'Mecklenburg'"
        );
        let both = Filter::equals("county_name", "Union").and(Filter::equals("year", "2020"));
        assert_eq!(both.to_where_clause(), "(county_name = 'Union') AND (year = '2020')");
        assert_eq!(Filter::And(vec![]).to_where_clause(), "1=1");
    }

    #[test]
    fn where_clause_escapes_quotes() {
        let filter = Filter::equals("name", "O'Brien");
        assert_eq!(filter.to_where_clause(), "name = 'O''Brien'");
    }

    #[test]
    fn and_flattens_and_drops_all() {
        let f = Filter::all()
            .and(Filter::equals("a", "1"))
            .and(Filter::equals("b", "2").and(Filter::equals("c", "3")));
        match f {
            Filter::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected conjunction, got {other:?}"),
        }
    }

    #[test]
    fn matches_string_and_number_fields() {
        let r = record(json!({"county_name": "Gaston", "year": 2019, "flag": true}));
        assert!(Filter::all().matches(&r));
        assert!(Filter::equals("county_name", "Gaston").matches(&r));
        assert!(!Filter::equals("county_name", "gaston").matches(&r));
        assert!(Filter::equals("year", "2019").matches(&r));
        assert!(Filter::equals("flag", "true").matches(&r));
        assert!(!Filter::equals("missing", "x").matches(&r));
        assert!(Filter::equals("county_name", "Gaston")
            .and(Filter::equals("year", "2019"))
            .matches(&r));
    }

    #[test]
    fn query_defaults_to_no_geometry() {
        let q = FeatureQuery::new(Filter::all()).with_fields(["pct", "year"]);
        assert!(!q.return_geometry);
        assert_eq!(q.out_fields_param(), "pct,year");
        assert_eq!(FeatureQuery::new(Filter::all()).out_fields_param(), "*");
    }
}
