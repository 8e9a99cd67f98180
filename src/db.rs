use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};

use crate::models::{StationYearStats, WeatherRecord};
use crate::parser;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, Default)]
pub struct IngestSummary {
    pub files_ingested: usize,
    pub files_failed: usize,
    pub rows_inserted: u64,
}

/// Ingests every `*.txt` station file under `dir`, one file at a time in
/// sorted order. A file that fails to parse is logged and skipped; a store
/// error aborts the whole run.
pub async fn ingest_dir(pool: &PgPool, dir: &Path) -> anyhow::Result<IngestSummary> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    paths.sort();

    let mut summary = IngestSummary::default();

    for path in paths {
        let started = Instant::now();
        let records = match parser::parse_file(&path) {
            Ok(records) => records,
            Err(error) => {
                tracing::error!("skipping {}: {error:#}", path.display());
                summary.files_failed += 1;
                continue;
            }
        };

        let inserted = insert_records(pool, &records).await?;
        summary.files_ingested += 1;
        summary.rows_inserted += inserted;
        tracing::info!(
            "ingested {}: {} rows parsed, {} inserted in {:?}",
            path.display(),
            records.len(),
            inserted,
            started.elapsed()
        );
    }

    Ok(summary)
}

/// Inserts one file's rows inside a single transaction, so a mid-batch
/// failure leaves the store at the pre-file state. Rows whose
/// (station_id, date) key already exists are left untouched.
pub async fn insert_records(pool: &PgPool, records: &[WeatherRecord]) -> anyhow::Result<u64> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;

    for record in records {
        let result = sqlx::query(
            r#"
            INSERT INTO weather_data (station_id, date, max_temp, min_temp, precipitation)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (station_id, date) DO NOTHING
            "#,
        )
        .bind(&record.station_id)
        .bind(record.date)
        .bind(record.max_temp)
        .bind(record.min_temp)
        .bind(record.precipitation)
        .execute(&mut *tx)
        .await?;

        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// All raw rows carrying at least one measurement, the aggregator's input.
pub async fn fetch_measured_records(pool: &PgPool) -> anyhow::Result<Vec<WeatherRecord>> {
    let rows = sqlx::query(
        "SELECT station_id, date, max_temp, min_temp, precipitation \
         FROM weather_data \
         WHERE max_temp IS NOT NULL OR min_temp IS NOT NULL OR precipitation IS NOT NULL \
         ORDER BY station_id, date",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(weather_record).collect())
}

/// Writes the aggregate rows inside a single transaction. Existing
/// (station_id, year) keys are skipped, so recomputation never duplicates
/// or overwrites.
pub async fn insert_stats(pool: &PgPool, stats: &[StationYearStats]) -> anyhow::Result<u64> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;

    for stat in stats {
        let result = sqlx::query(
            r#"
            INSERT INTO weather_stats
            (station_id, year, avg_max_temp, avg_min_temp, total_precipitation)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (station_id, year) DO NOTHING
            "#,
        )
        .bind(&stat.station_id)
        .bind(stat.year)
        .bind(stat.avg_max_temp)
        .bind(stat.avg_min_temp)
        .bind(stat.total_precipitation)
        .execute(&mut *tx)
        .await?;

        inserted += result.rows_affected();
    }

    tx.commit().await?;
    tracing::info!("wrote {inserted} of {} station-year rows", stats.len());
    Ok(inserted)
}

pub async fn fetch_weather(
    pool: &PgPool,
    station_id: Option<&str>,
    date: Option<NaiveDate>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<WeatherRecord>> {
    let mut query = String::from(
        "SELECT station_id, date, max_temp, min_temp, precipitation \
         FROM weather_data WHERE 1=1",
    );

    let mut arg = 0;
    if station_id.is_some() {
        arg += 1;
        query.push_str(&format!(" AND station_id = ${arg}"));
    }
    if date.is_some() {
        arg += 1;
        query.push_str(&format!(" AND date = ${arg}"));
    }
    query.push_str(&format!(
        " ORDER BY station_id, date LIMIT ${} OFFSET ${}",
        arg + 1,
        arg + 2
    ));

    let mut rows = sqlx::query(&query);
    if let Some(value) = station_id {
        rows = rows.bind(value);
    }
    if let Some(value) = date {
        rows = rows.bind(value);
    }

    let records = rows.bind(limit).bind(offset).fetch_all(pool).await?;
    Ok(records.iter().map(weather_record).collect())
}

pub async fn fetch_stats(
    pool: &PgPool,
    station_id: Option<&str>,
    year: Option<i32>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<StationYearStats>> {
    let mut query = String::from(
        "SELECT station_id, year, avg_max_temp, avg_min_temp, total_precipitation \
         FROM weather_stats WHERE 1=1",
    );

    let mut arg = 0;
    if station_id.is_some() {
        arg += 1;
        query.push_str(&format!(" AND station_id = ${arg}"));
    }
    if year.is_some() {
        arg += 1;
        query.push_str(&format!(" AND year = ${arg}"));
    }
    query.push_str(&format!(
        " ORDER BY station_id, year LIMIT ${} OFFSET ${}",
        arg + 1,
        arg + 2
    ));

    let mut rows = sqlx::query(&query);
    if let Some(value) = station_id {
        rows = rows.bind(value);
    }
    if let Some(value) = year {
        rows = rows.bind(value);
    }

    let records = rows.bind(limit).bind(offset).fetch_all(pool).await?;
    let stats = records
        .into_iter()
        .map(|row| StationYearStats {
            station_id: row.get("station_id"),
            year: row.get("year"),
            avg_max_temp: row.get("avg_max_temp"),
            avg_min_temp: row.get("avg_min_temp"),
            total_precipitation: row.get("total_precipitation"),
        })
        .collect();

    Ok(stats)
}

fn weather_record(row: &sqlx::postgres::PgRow) -> WeatherRecord {
    WeatherRecord {
        station_id: row.get("station_id"),
        date: row.get("date"),
        max_temp: row.get("max_temp"),
        min_temp: row.get("min_temp"),
        precipitation: row.get("precipitation"),
    }
}
