//! Per-year reduction of observations onto a fixed years axis
//!
//! Every function here returns exactly one [`SeriesPoint`] per requested
//! year, in the requested order. That alignment is what lets the renderer
//! draw three series against one x-axis.

use crate::format::{normalize_number, round_tenth};
use crate::model::{Observation, SeriesPoint};
use std::collections::HashMap;

/// Mean of valid values per year, rounded to one decimal
///
/// Observations without a finite value count toward neither the sum nor
/// the count. A year with no valid observations is a gap. Values are summed
/// in sorted order so the result does not depend on arrival order.
#[must_use]
pub fn group_mean(observations: &[Observation], years: &[i32]) -> Vec<SeriesPoint> {
    let mut by_year: HashMap<i32, Vec<f64>> = HashMap::new();
    for obs in observations {
        if let Some(value) = obs.raw_value.filter(|v| v.is_finite()) {
            by_year.entry(obs.year).or_default().push(value);
        }
    }

    years
        .iter()
        .map(|&year| {
            let value = by_year.get_mut(&year).and_then(|values| mean(values)).map(round_tenth);
            SeriesPoint::new(year, value)
        })
        .collect()
}

/// One entity's own series: the normalized value recorded for each year
///
/// A year without a record is a gap. A record with an unusable value
/// normalizes to 0. When several records share a year the last one wins.
#[must_use]
pub fn point_series(observations: &[Observation], years: &[i32]) -> Vec<SeriesPoint> {
    let by_year: HashMap<i32, f64> = observations
        .iter()
        .map(|obs| (obs.year, normalize_number(obs.raw_value)))
        .collect();

    years
        .iter()
        .map(|&year| SeriesPoint::new(year, by_year.get(&year).copied()))
        .collect()
}

/// All-gap series for the axis
#[must_use]
pub fn null_series(years: &[i32]) -> Vec<SeriesPoint> {
    years.iter().map(|&year| SeriesPoint::gap(year)).collect()
}

fn mean(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let sum: f64 = values.iter().sum();
    Some(sum / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values(points: &[SeriesPoint]) -> Vec<Option<f64>> {
        points.iter().map(|p| p.value).collect()
    }

    #[test]
    fn group_mean_basic_alignment() {
        let obs = vec![
            Observation::new(2018, Some(10.0)),
            Observation::new(2018, Some(20.0)),
            Observation::new(2020, None),
        ];
        let series = group_mean(&obs, &[2018, 2020]);
        assert_eq!(values(&series), vec![Some(15.0), None]);
        assert_eq!(series[0].year, 2018);
        assert_eq!(series[1].year, 2020);
    }

    #[test]
    fn group_mean_excludes_invalid_from_denominator() {
        let obs = vec![
            Observation::new(2019, Some(9.0)),
            Observation::new(2019, None),
            Observation::new(2019, Some(f64::NAN)),
            Observation::new(2019, Some(3.0)),
        ];
        assert_eq!(values(&group_mean(&obs, &[2019])), vec![Some(6.0)]);
    }

    #[test]
    fn group_mean_respects_requested_order_and_ignores_unrequested_years() {
        let obs = vec![
            Observation::new(2017, Some(1.0)),
            Observation::new(2019, Some(2.0)),
            Observation::new(2018, Some(4.0)),
        ];
        let series = group_mean(&obs, &[2019, 2018, 2021]);
        assert_eq!(values(&series), vec![Some(2.0), Some(4.0), None]);
    }

    #[test]
    fn group_mean_rounds_to_one_decimal() {
        let obs = vec![
            Observation::new(2020, Some(1.0)),
            Observation::new(2020, Some(2.0)),
            Observation::new(2020, Some(2.0)),
        ];
        // 5 / 3 = 1.666..
        assert_eq!(values(&group_mean(&obs, &[2020])), vec![Some(1.7)]);
    }

    #[test]
    fn group_mean_empty_inputs() {
        assert!(group_mean(&[], &[]).is_empty());
        assert_eq!(values(&group_mean(&[], &[2018, 2019])), vec![None, None]);
    }

    #[test]
    fn point_series_last_record_wins_and_null_is_zero() {
        let obs = vec![
            Observation::new(2018, Some(5.55)),
            Observation::new(2018, Some(7.04)),
            Observation::new(2019, None),
        ];
        let series = point_series(&obs, &[2018, 2019, 2020]);
        assert_eq!(values(&series), vec![Some(7.0), Some(0.0), None]);
    }

    #[test]
    fn null_series_is_aligned() {
        let series = null_series(&[2015, 2016, 2017]);
        assert_eq!(series.len(), 3);
        assert!(series.iter().all(SeriesPoint::is_gap));
        assert_eq!(series[2].year, 2017);
    }
}
