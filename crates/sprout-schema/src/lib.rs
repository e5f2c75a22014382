use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Closed vocabulary for health assessment `reasons` tags. The model is
/// instructed to emit 1-4 tags from this list and nothing else.
pub const REASON_TAGS: &[&str] = &[
    "need more light",
    "need less light",
    "light inconsistent",
    "drainage issue",
    "temperature too high",
    "temperature too low",
    "temperature fluctuating",
    "pest suspected",
    "disease suspected",
    "fungus suspected",
    "need pruning",
    "nutrient deficiency suspected",
    "overgrowth",
    "weak growth",
    "environmental stress",
    "uncertain assessment",
    "healthy",
];

pub fn is_known_reason(tag: &str) -> bool {
    REASON_TAGS.contains(&tag)
}

/// One sample uploaded by the sensor node. Extra fields written by the
/// upload endpoint (e.g. `remote_addr`) are ignored on decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    pub timestamp: String,
    #[serde(default)]
    pub date: Option<String>,
    pub soil_moisture_percent: f64,
    pub light_lux: f64,
    pub soil_temperature_c: f64,
    pub air_temperature_c: f64,
    pub air_humidity_percent: f64,
}

/// Next-24h weather window, reduced from the first eight 3-hour forecast
/// samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherForecast {
    pub will_rain_next_24h: bool,
    pub rain_mm_next_24h: f64,
    pub max_temp_next_24h_c: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantProfile {
    pub scientific_name: String,
}

/// User-supplied pot geometry and location. The setup form historically
/// saved numbers as strings, so the dimensions decode leniently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PotInfo {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub pot_diameter: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub pot_height: Option<f64>,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

// Models emit integral floats (`4.0`, `150.0`) often enough that the
// integer fields tolerate them. A fractional value still fails the decode.
fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                    return Ok(f as i64);
                }
            }
            Err(serde::de::Error::custom(format!(
                "expected an integer, got {n}"
            )))
        }
        other => Err(serde::de::Error::custom(format!(
            "expected an integer, got {other}"
        ))),
    }
}

/// Health half of a fused assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthAssessment {
    #[serde(deserialize_with = "lenient_i64")]
    pub health_level: i64,
    pub reasons: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Irrigation half of a fused assessment.
///
/// `water_ml == 0` when `should_water` is false is a convention the model
/// usually follows but nothing here enforces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrigationDecision {
    pub should_water: bool,
    #[serde(deserialize_with = "lenient_i64")]
    pub water_ml: i64,
    #[serde(deserialize_with = "lenient_i64")]
    pub target_soil_moisture_percent_min: i64,
    #[serde(deserialize_with = "lenient_i64")]
    pub target_soil_moisture_percent_max: i64,
    pub note: String,
}

/// The fused decision produced by one cycle: both halves are always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub health: HealthAssessment,
    pub irrigation: IrrigationDecision,
}

/// Append-only record in `plant_health_log.json`. Field names are frozen:
/// the dashboard reads this file directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthLogEntry {
    pub timestamp: String,
    pub date: String,
    pub image_path: String,
    pub plant_name: String,
    pub soil_temperature_c: f64,
    pub soil_moisture_percent: f64,
    pub light_lux: f64,
    pub air_temperature_c: f64,
    pub air_humidity_percent: f64,
    #[serde(flatten)]
    pub health: HealthAssessment,
}

/// Append-only record in `watering_log.json`, same freeze rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WateringLogEntry {
    pub timestamp: String,
    pub date: String,
    pub plant_name: String,
    pub pot_diameter: f64,
    pub pot_height: f64,
    pub soil_moisture_percent: f64,
    pub will_rain_next_24h: bool,
    pub rain_mm_next_24h: f64,
    pub max_temp_next_24h_c: f64,
    pub light_lux: f64,
    pub soil_temperature_c: f64,
    pub air_temperature_c: f64,
    pub air_humidity_percent: f64,
    #[serde(flatten)]
    pub irrigation: IrrigationDecision,
}
