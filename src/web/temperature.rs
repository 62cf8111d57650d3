// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Temperature monitoring routes
//!
//! These routes only read the reading log and drive the collector; they never
//! talk to the PLC themselves.

use std::sync::Arc;

use chrono::NaiveDateTime;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use rocket_okapi::okapi::openapi3::OpenApi;
use rocket_okapi::{openapi, openapi_get_routes_spec};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};
use crate::analysis::{generate_report, Analysis, TemperatureAnalyzer};
use crate::modbus::PlcEndpoint;
use crate::monitoring::{Reading, ReadingLog, SqliteReadingLog, Statistics, TemperatureCollector};
use crate::utility::timestamp;

pub const DEFAULT_HISTORY_LIMIT: u32 = 100;
pub const MAX_HISTORY_LIMIT: u32 = 1000;
pub const DEFAULT_PERIOD_HOURS: u32 = 24;
pub const DEFAULT_ANALYSIS_LIMIT: u32 = 200;
/// Readings handed to the analyzer for a report
pub const REPORT_READINGS: u32 = 500;

pub type Collector = TemperatureCollector<PlcEndpoint, SqliteReadingLog>;

/// Everything the temperature routes need, managed by Rocket
#[derive(Clone)]
pub struct MonitorState {
    pub collector: Arc<Collector>,
    pub log: Arc<SqliteReadingLog>,
    pub analyzer: Arc<TemperatureAnalyzer>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct HistoryResponse {
    pub data: Vec<Reading>,
    pub count: usize,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub statistics: Statistics,
    pub period_hours: u32,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct AnalyzeRequest {
    /// Most recent readings to analyze, 200 when omitted
    #[serde(default)]
    pub limit: Option<u32>,
    /// Statistics window in hours, 24 when omitted
    #[serde(default)]
    pub hours: Option<u32>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ReportResponse {
    pub report: String,
    #[serde(with = "timestamp::local_seconds")]
    #[schemars(with = "String")]
    pub timestamp: NaiveDateTime,
    pub ai_powered: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct MonitorStatus {
    pub running: bool,
    /// Zero-based holding register of the temperature
    pub address: u16,
    pub interval_secs: f64,
    /// °C/s
    pub anomaly_threshold: f64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct MonitorControl {
    pub running: bool,
    /// Whether the request changed the collector state
    pub changed: bool,
}

/// # Latest reading
#[openapi(tag = "Temperature")]
#[get("/api/temperature/current")]
pub async fn current(state: &State<MonitorState>) -> ApiResult<Reading> {
    state
        .log
        .current()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No reading available"))
}

/// # Recent readings
///
/// Oldest first. `limit` defaults to 100 and is capped at 1000.
#[openapi(tag = "Temperature")]
#[get("/api/temperature/history?<limit>")]
pub async fn history(state: &State<MonitorState>, limit: Option<u32>) -> ApiResult<HistoryResponse> {
    let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).min(MAX_HISTORY_LIMIT);
    let data = state.log.latest(limit).await?;
    Ok(Json(HistoryResponse {
        count: data.len(),
        data,
    }))
}

/// # Statistics over a period
#[openapi(tag = "Temperature")]
#[get("/api/temperature/stats?<hours>")]
pub async fn stats(state: &State<MonitorState>, hours: Option<u32>) -> ApiResult<StatsResponse> {
    let period_hours = hours.unwrap_or(DEFAULT_PERIOD_HOURS);
    let statistics = state
        .log
        .aggregate(timestamp::hours_ago(period_hours))
        .await?
        .ok_or_else(|| ApiError::not_found("No data for this period"))?;
    Ok(Json(StatsResponse {
        statistics,
        period_hours,
    }))
}

/// # Analyze recent readings
///
/// Uses the configured language model, or the local heuristic when it is not
/// available. The body is optional.
#[openapi(tag = "Temperature")]
#[post("/api/temperature/analyze", data = "<request>")]
pub async fn analyze(
    state: &State<MonitorState>,
    request: Option<Json<AnalyzeRequest>>,
) -> ApiResult<Analysis> {
    let request = request.map(Json::into_inner).unwrap_or_default();
    let limit = request.limit.unwrap_or(DEFAULT_ANALYSIS_LIMIT);
    let hours = request.hours.unwrap_or(DEFAULT_PERIOD_HOURS);

    let readings = state.log.latest(limit).await?;
    if readings.is_empty() {
        return Err(ApiError::not_found("No data to analyze"));
    }
    let statistics = state.log.aggregate(timestamp::hours_ago(hours)).await?;
    Ok(Json(
        state.analyzer.analyze(&readings, statistics.as_ref()).await,
    ))
}

/// # Text report
#[openapi(tag = "Temperature")]
#[get("/api/temperature/report?<hours>")]
pub async fn report(state: &State<MonitorState>, hours: Option<u32>) -> ApiResult<ReportResponse> {
    let period_hours = hours.unwrap_or(DEFAULT_PERIOD_HOURS);
    let readings = state.log.latest(REPORT_READINGS).await?;
    let statistics = state
        .log
        .aggregate(timestamp::hours_ago(period_hours))
        .await?;
    let analysis = state.analyzer.analyze(&readings, statistics.as_ref()).await;
    Ok(Json(ReportResponse {
        report: generate_report(statistics.as_ref(), period_hours, &analysis),
        timestamp: analysis.timestamp,
        ai_powered: analysis.ai_powered,
    }))
}

/// # Collector state
#[openapi(tag = "Temperature")]
#[get("/api/temperature/monitor")]
pub async fn monitor(state: &State<MonitorState>) -> Json<MonitorStatus> {
    let settings = state.collector.settings();
    Json(MonitorStatus {
        running: state.collector.is_running().await,
        address: settings.address,
        interval_secs: settings.interval.as_secs_f64(),
        anomaly_threshold: settings.anomaly_threshold,
    })
}

/// # Start sampling
#[openapi(tag = "Temperature")]
#[post("/api/temperature/monitor/start")]
pub async fn start(state: &State<MonitorState>) -> Json<MonitorControl> {
    let changed = state.collector.start().await;
    Json(MonitorControl {
        running: state.collector.is_running().await,
        changed,
    })
}

/// # Stop sampling
#[openapi(tag = "Temperature")]
#[post("/api/temperature/monitor/stop")]
pub async fn stop(state: &State<MonitorState>) -> Json<MonitorControl> {
    let changed = state.collector.stop().await;
    Json(MonitorControl {
        running: state.collector.is_running().await,
        changed,
    })
}

pub fn get_temperature_routes() -> (Vec<rocket::Route>, OpenApi) {
    openapi_get_routes_spec![current, history, stats, analyze, report, monitor, start, stop]
}
