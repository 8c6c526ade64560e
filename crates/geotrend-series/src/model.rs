//! Data model for year-aligned series
//!
//! Records coming back from the feature service are flat attribute maps.
//! [`Observation`] is the typed view of one record: a year plus an optional
//! numeric value. [`SeriesPoint`] is what the renderer consumes, always one
//! per axis year.

use crate::format::{parse_raw, ValueType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// One feature record: field name to scalar
pub type Attributes = serde_json::Map<String, Value>;

/// Identifier of a hovered entity (e.g. a census tract)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap a raw identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A measured quantity that can be charted across years
///
/// Immutable once selected. `field_name` is the column in the remote schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    /// Column name in the remote schema
    pub field_name: String,
    /// Display label
    pub name: String,
    /// How values are rendered
    #[serde(default)]
    pub value_type: ValueType,
    /// Years with data for this variable
    pub years_available: Vec<i32>,
}

impl Variable {
    /// Create a new variable
    #[must_use]
    pub fn new(
        field_name: impl Into<String>,
        name: impl Into<String>,
        value_type: ValueType,
        years_available: impl Into<Vec<i32>>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            name: name.into(),
            value_type,
            years_available: years_available.into(),
        }
    }

    /// The shared x-axis: available years ascending, without duplicates
    #[must_use]
    pub fn years_axis(&self) -> Vec<i32> {
        let mut years = self.years_available.clone();
        years.sort_unstable();
        years.dedup();
        years
    }
}

/// A single (year, value) measurement produced by a remote query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub entity_id: Option<EntityId>,
    pub group_id: Option<String>,
    pub year: i32,
    /// `None` when the record carried no usable number
    pub raw_value: Option<f64>,
}

impl Observation {
    /// Observation without entity/group identity (group and region queries)
    #[inline]
    #[must_use]
    pub fn new(year: i32, raw_value: Option<f64>) -> Self {
        Self {
            entity_id: None,
            group_id: None,
            year,
            raw_value,
        }
    }

    /// Attach the owning entity
    #[inline]
    #[must_use]
    pub fn with_entity(mut self, entity_id: EntityId) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    /// Attach the owning group
    #[inline]
    #[must_use]
    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Read an observation out of a feature record
    ///
    /// Returns `None` when the year attribute is missing or not an integer;
    /// such a record cannot be placed on the axis. A missing or non-numeric
    /// value is kept as an observation with `raw_value = None`.
    #[must_use]
    pub fn from_attributes(attributes: &Attributes, value_field: &str, year_field: &str) -> Option<Self> {
        let year = attributes.get(year_field).and_then(parse_year)?;
        let raw_value = attributes.get(value_field).and_then(parse_raw);
        Some(Self::new(year, raw_value))
    }
}

fn parse_year(raw: &Value) -> Option<i32> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|y| y.fract() == 0.0).map(|y| y as i64))
            .and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// One point on the shared years axis
///
/// `value = None` is a gap ("no data for this year"), never the same as 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub year: i32,
    pub value: Option<f64>,
}

impl SeriesPoint {
    #[inline]
    #[must_use]
    pub fn new(year: i32, value: Option<f64>) -> Self {
        Self { year, value }
    }

    /// Gap at `year`
    #[inline]
    #[must_use]
    pub fn gap(year: i32) -> Self {
        Self { year, value: None }
    }

    #[inline]
    #[must_use]
    pub fn is_gap(&self) -> bool {
        self.value.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn years_axis_sorts_and_dedups() {
        let variable = Variable::new("pct", "Percent", ValueType::Percentage, vec![2020, 2018, 2019, 2018]);
        assert_eq!(variable.years_axis(), vec![2018, 2019, 2020]);
    }

    #[test]
    fn observation_from_numeric_record() {
        let record = attrs(json!({"year": 2019, "pct": 12.5}));
        let obs = Observation::from_attributes(&record, "pct", "year").unwrap();
        assert_eq!(obs.year, 2019);
        assert_eq!(obs.raw_value, Some(12.5));
    }

    #[test]
    fn observation_accepts_string_year_and_value() {
        let record = attrs(json!({"year": "2021", "pct": " 7.25 "}));
        let obs = Observation::from_attributes(&record, "pct", "year").unwrap();
        assert_eq!(obs.year, 2021);
        assert_eq!(obs.raw_value, Some(7.25));
    }

    #[test]
    fn observation_keeps_null_value() {
        let record = attrs(json!({"year": 2020, "pct": null}));
        let obs = Observation::from_attributes(&record, "pct", "year").unwrap();
        assert_eq!(obs.raw_value, None);
    }

    #[test]
    fn observation_without_year_is_dropped() {
        let record = attrs(json!({"pct": 3.0}));
        assert!(Observation::from_attributes(&record, "pct", "year").is_none());

        let fractional = attrs(json!({"year": 2019.5, "pct": 3.0}));
        assert!(Observation::from_attributes(&fractional, "pct", "year").is_none());
    }

    #[test]
    fn entity_id_round_trips_as_plain_string() {
        let id = EntityId::new("37119001100");
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("37119001100"));
        assert_eq!(id.to_string(), "37119001100");
    }

    #[test]
    fn series_point_gap() {
        assert!(SeriesPoint::gap(2018).is_gap());
        assert!(!SeriesPoint::new(2018, Some(0.0)).is_gap());
    }
}
