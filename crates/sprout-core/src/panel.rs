//! Read-side aggregation over the raw log files. The logs accept entries
//! from more than one writer, so everything here is tolerant of missing or
//! oddly-typed fields and computed fresh on every call.

use chrono::{Duration, Local, NaiveDateTime};
use serde_json::Value;
use sprout_store::PlantStore;

use crate::logbook::now_stamp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WateringStatus {
    Watered,
    NotWatered,
}

#[derive(Debug, Clone)]
pub struct WateringSummary {
    pub status: WateringStatus,
    pub total_ml: f64,
    pub note: String,
}

#[derive(Debug, Clone)]
pub struct HealthBadge {
    pub health_level: Option<i64>,
    pub color: String,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PanelSnapshot {
    pub watering_today: WateringSummary,
    pub health: HealthBadge,
    pub recent_watering: Vec<Value>,
    pub recent_sensors: Vec<Value>,
}

/// Badge color for a health level. Anything outside 1..=5 is the neutral
/// grey, including a missing level.
pub fn health_color(level: Option<i64>) -> &'static str {
    match level {
        Some(5) => "#4CAF50",
        Some(4) => "#8BC34A",
        Some(3) => "#FFC107",
        Some(2) => "#FF9800",
        Some(1) => "#F44336",
        _ => "#9E9E9E",
    }
}

fn entry_date(entry: &Value) -> Option<&str> {
    if let Some(date) = entry.get("date").and_then(Value::as_str) {
        return Some(date);
    }
    // Older entries carry only a timestamp; its date prefix is equivalent.
    let ts = entry.get("timestamp").and_then(Value::as_str)?;
    ts.get(..10)
}

fn lenient_ml(entry: &Value) -> f64 {
    match entry.get("water_ml") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn entry_timestamp(entry: &Value) -> &str {
    entry.get("timestamp").and_then(Value::as_str).unwrap_or("")
}

// Legacy clients wrote the level as a string or an integral float.
fn lenient_level(entry: &Value) -> Option<i64> {
    match entry.get("health_level") {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Summarise the given day's watering entries.
pub fn watering_summary_for(entries: &[Value], date: &str) -> WateringSummary {
    let mut matches: Vec<&Value> = entries
        .iter()
        .filter(|e| entry_date(e) == Some(date))
        .collect();
    if matches.is_empty() {
        return WateringSummary {
            status: WateringStatus::NotWatered,
            total_ml: 0.0,
            note: "No watering record yet today".into(),
        };
    }
    let total_ml: f64 = matches.iter().map(|e| lenient_ml(e)).sum();
    let status = if total_ml > 0.0 {
        WateringStatus::Watered
    } else {
        WateringStatus::NotWatered
    };
    matches.sort_by(|a, b| entry_timestamp(a).cmp(entry_timestamp(b)));
    let last = matches[matches.len() - 1];
    let note = last
        .get("reason")
        .or_else(|| last.get("note"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| match status {
            WateringStatus::Watered => format!("Watered {total_ml:.0} ml today"),
            WateringStatus::NotWatered => "No watering record yet today".to_string(),
        });
    WateringSummary {
        status,
        total_ml,
        note,
    }
}

pub fn today_watering_summary(entries: &[Value]) -> WateringSummary {
    watering_summary_for(entries, &now_stamp().date)
}

/// Latest health entry by timestamp, rendered as a badge. Non-array
/// `reasons` written by older clients are coerced to a one-element list.
pub fn latest_health_badge(entries: &[Value]) -> HealthBadge {
    let latest = entries
        .iter()
        .filter(|e| e.get("timestamp").and_then(Value::as_str).is_some())
        .max_by_key(|e| entry_timestamp(e));
    let Some(entry) = latest else {
        return HealthBadge {
            health_level: None,
            color: health_color(None).into(),
            reasons: Vec::new(),
        };
    };
    let health_level = lenient_level(entry);
    let reasons = match entry.get("reasons") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(Value::String(s)) => vec![s.clone()],
        Some(other) => vec![other.to_string()],
    };
    HealthBadge {
        health_level,
        color: health_color(health_level).into(),
        reasons,
    }
}

// `%.f` also accepts the microsecond suffix legacy entries carry.
fn parse_ts(ts: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// Watering entries that actually dispensed water within the last 15 days,
/// newest first.
pub fn recent_watering(entries: &[Value], now: NaiveDateTime) -> Vec<Value> {
    let cutoff = now - Duration::days(15);
    let mut recent: Vec<Value> = entries
        .iter()
        .filter(|e| lenient_ml(e) > 0.0)
        .filter(|e| parse_ts(entry_timestamp(e)).is_some_and(|ts| ts >= cutoff))
        .cloned()
        .collect();
    recent.sort_by(|a, b| entry_timestamp(b).cmp(entry_timestamp(a)));
    recent
}

/// Sensor entries from the last 24 hours, ascending by timestamp.
pub fn recent_sensor_window(entries: &[Value], now: NaiveDateTime) -> Vec<Value> {
    let cutoff = now - Duration::hours(24);
    let mut window: Vec<Value> = entries
        .iter()
        .filter(|e| parse_ts(entry_timestamp(e)).is_some_and(|ts| ts >= cutoff))
        .cloned()
        .collect();
    window.sort_by(|a, b| entry_timestamp(a).cmp(entry_timestamp(b)));
    window
}

/// One full read of every panel widget. Log read errors degrade to empty
/// sections rather than failing the panel.
pub async fn snapshot(store: &PlantStore) -> PanelSnapshot {
    let watering = store.watering_log().read_all().await.unwrap_or_default();
    let health = store.health_log().read_all().await.unwrap_or_default();
    let sensors = store.sensor_log().read_all().await.unwrap_or_default();
    let now = Local::now().naive_local();
    PanelSnapshot {
        watering_today: today_watering_summary(&watering),
        health: latest_health_badge(&health),
        recent_watering: recent_watering(&watering, now),
        recent_sensors: recent_sensor_window(&sensors, now),
    }
}
