use chrono::NaiveDate;
use serde::Serialize;

/// One daily observation as stored in `weather_data`. Temperatures are in
/// tenths of a degree Celsius, precipitation in hundredths of a centimeter;
/// a measurement the station did not record is `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherRecord {
    pub station_id: String,
    pub date: NaiveDate,
    pub max_temp: Option<i32>,
    pub min_temp: Option<i32>,
    pub precipitation: Option<i32>,
}

/// Yearly aggregate for one station as stored in `weather_stats`.
/// Temperatures are in whole degrees Celsius, precipitation in centimeters,
/// both rounded to two decimal places.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationYearStats {
    pub station_id: String,
    pub year: i32,
    pub avg_max_temp: Option<f64>,
    pub avg_min_temp: Option<f64>,
    pub total_precipitation: Option<f64>,
}
