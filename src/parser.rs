use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use chrono::NaiveDate;

use crate::models::WeatherRecord;

/// Marker the station files use for "no measurement recorded".
pub const MISSING_SENTINEL: i32 = -9999;

/// The station id is the filename stem, e.g. `wx_data/USC00110072.txt`.
pub fn station_id_from_path(path: &Path) -> anyhow::Result<String> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("cannot derive a station id from {}", path.display()))?;
    Ok(stem.to_string())
}

pub fn parse_file(path: &Path) -> anyhow::Result<Vec<WeatherRecord>> {
    let station_id = station_id_from_path(path)?;
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    parse_records(&station_id, file).with_context(|| format!("failed to parse {}", path.display()))
}

/// Parses one station's tab-separated lines (`date max_temp min_temp
/// precipitation`, date as `YYYYMMDD`, no header). Sentinel measurements
/// become `None` and only the first line for a given date is kept. Any
/// malformed line fails the whole file.
pub fn parse_records<R: Read>(station_id: &str, input: R) -> anyhow::Result<Vec<WeatherRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut seen_dates: HashSet<NaiveDate> = HashSet::new();
    let mut records = Vec::new();

    for (index, result) in reader.records().enumerate() {
        let line = index + 1;
        let row = result.with_context(|| format!("line {line}: unreadable record"))?;
        if row.len() != 4 {
            bail!(
                "line {line}: expected 4 tab-separated fields, found {}",
                row.len()
            );
        }

        let date = NaiveDate::parse_from_str(row[0].trim(), "%Y%m%d")
            .with_context(|| format!("line {line}: invalid date {:?}", &row[0]))?;
        let max_temp =
            parse_measurement(&row[1]).with_context(|| format!("line {line}: invalid max_temp"))?;
        let min_temp =
            parse_measurement(&row[2]).with_context(|| format!("line {line}: invalid min_temp"))?;
        let precipitation = parse_measurement(&row[3])
            .with_context(|| format!("line {line}: invalid precipitation"))?;

        // First occurrence of a date wins; later duplicates in the same
        // file are dropped before they reach the writer.
        if !seen_dates.insert(date) {
            continue;
        }

        records.push(WeatherRecord {
            station_id: station_id.to_string(),
            date,
            max_temp,
            min_temp,
            precipitation,
        });
    }

    Ok(records)
}

fn parse_measurement(field: &str) -> anyhow::Result<Option<i32>> {
    let value: i32 = field
        .trim()
        .parse()
        .with_context(|| format!("not an integer: {field:?}"))?;
    Ok(if value == MISSING_SENTINEL {
        None
    } else {
        Some(value)
    })
}
