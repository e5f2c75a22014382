//! Turning one cycle's decision into the two append-only log entries the
//! dashboard reads. Entries capture the sensor and forecast values used at
//! decision time; later edits to pot info never rewrite history.

use chrono::Local;
use sprout_schema::{AssessmentResult, HealthLogEntry, WateringLogEntry, WeatherForecast};
use sprout_store::PlantStore;

use crate::context::DecisionContext;
use crate::error::PipelineError;

/// Naive local wall-clock stamp, second precision. The timestamp format is
/// lexically sortable, which `latest_reading` and the panel rely on.
#[derive(Debug, Clone)]
pub struct LogStamp {
    pub timestamp: String,
    pub date: String,
}

pub fn now_stamp() -> LogStamp {
    let now = Local::now();
    LogStamp {
        timestamp: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
        date: now.format("%Y-%m-%d").to_string(),
    }
}

pub fn build_entries(
    stamp: &LogStamp,
    ctx: &DecisionContext,
    forecast: &WeatherForecast,
    result: &AssessmentResult,
) -> (HealthLogEntry, WateringLogEntry) {
    let health = HealthLogEntry {
        timestamp: stamp.timestamp.clone(),
        date: stamp.date.clone(),
        image_path: ctx.photo_path.display().to_string(),
        plant_name: ctx.plant_name.clone(),
        soil_temperature_c: ctx.reading.soil_temperature_c,
        soil_moisture_percent: ctx.reading.soil_moisture_percent,
        light_lux: ctx.reading.light_lux,
        air_temperature_c: ctx.reading.air_temperature_c,
        air_humidity_percent: ctx.reading.air_humidity_percent,
        health: result.health.clone(),
    };
    let watering = WateringLogEntry {
        timestamp: stamp.timestamp.clone(),
        date: stamp.date.clone(),
        plant_name: ctx.plant_name.clone(),
        pot_diameter: ctx.pot.pot_diameter,
        pot_height: ctx.pot.pot_height,
        soil_moisture_percent: ctx.reading.soil_moisture_percent,
        will_rain_next_24h: forecast.will_rain_next_24h,
        rain_mm_next_24h: forecast.rain_mm_next_24h,
        max_temp_next_24h_c: forecast.max_temp_next_24h_c,
        light_lux: ctx.reading.light_lux,
        soil_temperature_c: ctx.reading.soil_temperature_c,
        air_temperature_c: ctx.reading.air_temperature_c,
        air_humidity_percent: ctx.reading.air_humidity_percent,
        irrigation: result.irrigation.clone(),
    };
    (health, watering)
}

/// Append both halves of the decision. The two appends are not atomic as a
/// pair; a failure after the first leaves the health entry in place and the
/// cycle reports `LogWriteFailure`.
pub async fn record_assessment(
    store: &PlantStore,
    health: &HealthLogEntry,
    watering: &WateringLogEntry,
) -> Result<(), PipelineError> {
    let health_value = serde_json::to_value(health).map_err(|e| {
        PipelineError::LogWriteFailure(anyhow::anyhow!("health entry unserializable: {e}"))
    })?;
    let watering_value = serde_json::to_value(watering).map_err(|e| {
        PipelineError::LogWriteFailure(anyhow::anyhow!("watering entry unserializable: {e}"))
    })?;
    store
        .health_log()
        .append(health_value)
        .await
        .map_err(PipelineError::LogWriteFailure)?;
    store
        .watering_log()
        .append(watering_value)
        .await
        .map_err(PipelineError::LogWriteFailure)?;
    Ok(())
}
