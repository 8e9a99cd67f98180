use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;

use crate::db;

const DEFAULT_PER_PAGE: i64 = 10;

pub fn router(pool: PgPool) -> Router {
    Router::new()
        .route("/api/weather", get(get_weather))
        .route("/api/weather/stats", get(get_weather_stats))
        .with_state(pool)
}

pub async fn serve(pool: PgPool, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!("read API listening on {bind}");
    axum::serve(listener, router(pool)).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct WeatherQuery {
    station_id: Option<String>,
    date: Option<NaiveDate>,
    page: Option<i64>,
    per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    station_id: Option<String>,
    year: Option<i32>,
    page: Option<i64>,
    per_page: Option<i64>,
}

/// LIMIT/OFFSET window for 1-based pages; page and per_page floor at 1.
fn page_window(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).max(1);
    (per_page, (page - 1) * per_page)
}

async fn get_weather(
    State(pool): State<PgPool>,
    Query(params): Query<WeatherQuery>,
) -> impl IntoResponse {
    let (limit, offset) = page_window(params.page, params.per_page);
    match db::fetch_weather(&pool, params.station_id.as_deref(), params.date, limit, offset).await {
        Ok(records) => Json(records).into_response(),
        Err(error) => {
            tracing::error!("weather query failed: {error:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "query failed").into_response()
        }
    }
}

async fn get_weather_stats(
    State(pool): State<PgPool>,
    Query(params): Query<StatsQuery>,
) -> impl IntoResponse {
    let (limit, offset) = page_window(params.page, params.per_page);
    match db::fetch_stats(&pool, params.station_id.as_deref(), params.year, limit, offset).await {
        Ok(stats) => Json(stats).into_response(),
        Err(error) => {
            tracing::error!("stats query failed: {error:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "query failed").into_response()
        }
    }
}
