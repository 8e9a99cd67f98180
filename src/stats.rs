use std::collections::BTreeMap;

use chrono::Datelike;

use crate::models::{StationYearStats, WeatherRecord};

/// Sum and count over the non-null values of one measurement series.
#[derive(Debug, Default)]
struct Series {
    sum: i64,
    count: u32,
}

impl Series {
    fn push(&mut self, value: Option<i32>) {
        if let Some(value) = value {
            self.sum += i64::from(value);
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / f64::from(self.count))
    }

    fn total(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64)
    }
}

#[derive(Debug, Default)]
struct GroupAccumulator {
    max_temp: Series,
    min_temp: Series,
    precipitation: Series,
}

/// Groups raw observations by (station_id, year) and computes the yearly
/// aggregates: mean max/min temperature rescaled from tenths of a degree to
/// degrees, and total precipitation rescaled from hundredths of a centimeter
/// to centimeters, each rounded to two decimal places. A series with no
/// non-null values aggregates to `None` without affecting the other series
/// of the same group. Output is ordered by (station_id, year).
pub fn yearly_stats(records: &[WeatherRecord]) -> Vec<StationYearStats> {
    let mut groups: BTreeMap<(String, i32), GroupAccumulator> = BTreeMap::new();

    for record in records {
        let key = (record.station_id.clone(), record.date.year());
        let group = groups.entry(key).or_default();
        group.max_temp.push(record.max_temp);
        group.min_temp.push(record.min_temp);
        group.precipitation.push(record.precipitation);
    }

    groups
        .into_iter()
        .map(|((station_id, year), group)| StationYearStats {
            station_id,
            year,
            avg_max_temp: group.max_temp.mean().map(|mean| round2(mean / 10.0)),
            avg_min_temp: group.min_temp.mean().map(|mean| round2(mean / 10.0)),
            total_precipitation: group.precipitation.total().map(|sum| round2(sum / 100.0)),
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(
        station_id: &str,
        date: (i32, u32, u32),
        max_temp: Option<i32>,
        min_temp: Option<i32>,
        precipitation: Option<i32>,
    ) -> WeatherRecord {
        WeatherRecord {
            station_id: station_id.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            max_temp,
            min_temp,
            precipitation,
        }
    }

    fn close(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn mean_rescales_tenths_to_degrees() {
        let records = vec![
            record("A", (1985, 1, 1), Some(100), Some(10), Some(0)),
            record("A", (1985, 6, 1), Some(200), Some(30), Some(0)),
        ];
        let stats = yearly_stats(&records);
        assert_eq!(stats.len(), 1);
        assert!(close(stats[0].avg_max_temp.unwrap(), 15.0));
        assert!(close(stats[0].avg_min_temp.unwrap(), 2.0));
    }

    #[test]
    fn precipitation_sums_and_rescales_to_centimeters() {
        let records = vec![
            record("A", (1985, 1, 1), None, None, Some(125)),
            record("A", (1985, 1, 2), None, None, Some(75)),
        ];
        let stats = yearly_stats(&records);
        assert!(close(stats[0].total_precipitation.unwrap(), 2.0));
    }

    #[test]
    fn all_null_series_stays_null_without_touching_the_others() {
        let records = vec![
            record("A", (1985, 1, 1), Some(100), None, None),
            record("A", (1985, 1, 2), Some(200), None, None),
        ];
        let stats = yearly_stats(&records);
        assert!(close(stats[0].avg_max_temp.unwrap(), 15.0));
        assert_eq!(stats[0].avg_min_temp, None);
        assert_eq!(stats[0].total_precipitation, None);
    }

    #[test]
    fn nulls_are_excluded_from_the_mean_not_counted_as_zero() {
        let records = vec![
            record("A", (1985, 1, 1), Some(100), None, None),
            record("A", (1985, 1, 2), None, None, None),
            record("A", (1985, 1, 3), Some(200), None, None),
        ];
        let stats = yearly_stats(&records);
        // Mean over the two non-null values, not over three rows.
        assert!(close(stats[0].avg_max_temp.unwrap(), 15.0));
    }

    #[test]
    fn groups_split_by_station_and_year() {
        let records = vec![
            record("A", (1985, 12, 31), Some(100), None, None),
            record("A", (1986, 1, 1), Some(300), None, None),
            record("B", (1985, 1, 1), Some(-50), None, None),
        ];
        let stats = yearly_stats(&records);
        assert_eq!(stats.len(), 3);
        // Ordered by (station_id, year).
        assert_eq!((stats[0].station_id.as_str(), stats[0].year), ("A", 1985));
        assert_eq!((stats[1].station_id.as_str(), stats[1].year), ("A", 1986));
        assert_eq!((stats[2].station_id.as_str(), stats[2].year), ("B", 1985));
        assert!(close(stats[0].avg_max_temp.unwrap(), 10.0));
        assert!(close(stats[1].avg_max_temp.unwrap(), 30.0));
        assert!(close(stats[2].avg_max_temp.unwrap(), -5.0));
    }

    #[test]
    fn aggregates_round_to_two_decimal_places() {
        let records = vec![
            record("A", (1985, 1, 1), Some(101), None, Some(333)),
            record("A", (1985, 1, 2), Some(100), None, None),
            record("A", (1985, 1, 3), Some(100), None, None),
        ];
        let stats = yearly_stats(&records);
        // 301 / 3 / 10 = 10.0333... -> 10.03
        assert!(close(stats[0].avg_max_temp.unwrap(), 10.03));
        assert!(close(stats[0].total_precipitation.unwrap(), 3.33));
    }

    #[test]
    fn empty_input_produces_no_groups() {
        assert!(yearly_stats(&[]).is_empty());
    }
}
