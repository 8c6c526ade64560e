use geotrend_query::{FeatureSource, InMemoryFeatureService, LoadError, SchemaFields, SeriesLoader, SourceLocation};
use geotrend_series::{EntityId, SeriesPoint, ValueType, Variable};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

const URL: &str = "memory://tracts";

fn fixture() -> String {
    json!([
        {"crdt_unique_id": "T1", "name": "Tract 1", "county_name": "Mecklenburg", "year": 2018, "pct_poverty": 10.0},
        {"crdt_unique_id": "T1", "name": "Tract 1", "county_name": "Mecklenburg", "year": 2019, "pct_poverty": 11.0},
        {"crdt_unique_id": "T1", "name": "Tract 1", "county_name": "Mecklenburg", "year": 2020, "pct_poverty": null},
        {"crdt_unique_id": "T2", "name": "Tract 2", "county_name": "Mecklenburg", "year": 2018, "pct_poverty": 20.0},
        {"crdt_unique_id": "T2", "name": "Tract 2", "county_name": "Mecklenburg", "year": 2019, "pct_poverty": 21.0},
        {"crdt_unique_id": "T3", "name": "Tract 3", "county_name": "Gaston", "year": 2018, "pct_poverty": 30.0},
        {"crdt_unique_id": "T3", "name": "Tract 3", "county_name": "Gaston", "year": 2020, "pct_poverty": "n/a"},
        {"crdt_unique_id": "T4", "year": 2019, "pct_poverty": 40.0}
    ])
    .to_string()
}

fn loader() -> SeriesLoader {
    let service = InMemoryFeatureService::from_json_str(SourceLocation::new(URL), &fixture()).unwrap();
    SeriesLoader::new(Arc::new(service), FeatureSource::new(URL))
}

fn poverty() -> Variable {
    Variable::new("pct_poverty", "Poverty Rate", ValueType::Percentage, vec![2018, 2019, 2020])
}

fn values(points: &[SeriesPoint]) -> Vec<Option<f64>> {
    points.iter().map(|p| p.value).collect()
}

#[tokio::test]
async fn test_entity_with_group() {
    let series = loader().load(&EntityId::new("T1"), &poverty()).await.unwrap();

    assert_eq!(series.entity_label, "Tract 1");
    assert_eq!(series.group_label(), "Mecklenburg Avg");
    assert_eq!(series.region_label(), "Region Avg");
    assert_eq!(values(&series.entity), vec![Some(10.0), Some(11.0), Some(0.0)]);
    // 2020: only T1 reports, and its value is null
    assert_eq!(values(&series.group), vec![Some(15.0), Some(16.0), None]);
    assert_eq!(values(&series.region), vec![Some(20.0), Some(24.0), None]);
    assert!(series.is_aligned());
}

#[tokio::test]
async fn test_entity_without_group() {
    let series = loader().load(&EntityId::new("T4"), &poverty()).await.unwrap();

    assert_eq!(series.entity_label, "T4");
    assert_eq!(series.group_name, None);
    assert_eq!(series.group_label(), "County Avg");
    assert_eq!(values(&series.entity), vec![None, Some(40.0), None]);
    assert_eq!(values(&series.group), vec![None, None, None]);
    assert_eq!(values(&series.region), vec![Some(20.0), Some(24.0), None]);
}

#[tokio::test]
async fn test_unparseable_entity_value_charts_as_zero() {
    let series = loader().load(&EntityId::new("T3"), &poverty()).await.unwrap();

    assert_eq!(values(&series.entity), vec![Some(30.0), None, Some(0.0)]);
    assert_eq!(values(&series.group), vec![Some(30.0), None, None]);
}

#[tokio::test]
async fn test_unknown_entity_is_no_data() {
    let err = loader().load(&EntityId::new("T999"), &poverty()).await.unwrap_err();
    assert!(err.is_silent());
    assert!(matches!(err, LoadError::NoData { .. }));
}

#[tokio::test]
async fn test_axis_follows_variable_years() {
    let variable = Variable::new("pct_poverty", "Poverty Rate", ValueType::Percentage, vec![2020, 2017, 2018, 2020]);
    let series = loader().load(&EntityId::new("T2"), &variable).await.unwrap();

    assert_eq!(series.years, vec![2017, 2018, 2020]);
    assert_eq!(values(&series.entity), vec![None, Some(20.0), None]);
    assert!(series.is_aligned());
}

#[tokio::test]
async fn test_custom_schema_fields() {
    let json = json!([
        {"geoid": "A", "label": "Alpha", "region": "North", "yr": "2019", "score": 3.0},
        {"geoid": "B", "label": "Beta", "region": "North", "yr": "2019", "score": 5.0}
    ])
    .to_string();
    let service = InMemoryFeatureService::from_json_str(SourceLocation::new(URL), &json).unwrap();
    let source = FeatureSource::new(URL).with_fields(SchemaFields {
        id_field: "geoid".to_string(),
        name_field: "label".to_string(),
        group_field: "region".to_string(),
        year_field: "yr".to_string(),
    });
    let loader = SeriesLoader::new(Arc::new(service), source);
    let variable = Variable::new("score", "Score", ValueType::Plain, vec![2019]);

    let series = loader.load(&EntityId::new("A"), &variable).await.unwrap();
    assert_eq!(series.entity_label, "Alpha");
    assert_eq!(series.group_label(), "North Avg");
    assert_eq!(values(&series.entity), vec![Some(3.0)]);
    assert_eq!(values(&series.group), vec![Some(4.0)]);
    assert_eq!(values(&series.region), vec![Some(4.0)]);
}
