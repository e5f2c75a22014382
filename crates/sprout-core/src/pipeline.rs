//! One decision cycle from raw logs to appended history entries.

use std::sync::Arc;

use sprout_provider::{AssessmentModel, ForecastService, SpeciesIdentifier, VisionRequest};
use sprout_schema::AssessmentResult;
use sprout_store::PlantStore;
use uuid::Uuid;

use crate::context::gather_context;
use crate::error::PipelineError;
use crate::logbook::{build_entries, now_stamp, record_assessment};
use crate::prompt::{context_block, SYSTEM_PROMPT};
use crate::validate::validate_assessment;

/// Everything `run_cycle` needs, wired once at startup.
pub struct Pipeline {
    pub store: PlantStore,
    pub model: Arc<dyn AssessmentModel>,
    pub species: Arc<dyn SpeciesIdentifier>,
    pub forecast: Arc<dyn ForecastService>,
    pub model_id: String,
}

/// What one successful cycle decided.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub trace_id: Uuid,
    pub timestamp: String,
    pub plant_name: String,
    pub result: AssessmentResult,
}

impl Pipeline {
    /// Run one full cycle: gather context, call the model, validate its
    /// reply, append both log entries. Every error variant means "no
    /// decision this cycle"; nothing here is fatal to the caller's loop.
    pub async fn run_cycle(&self) -> Result<CycleReport, PipelineError> {
        let trace_id = Uuid::new_v4();
        tracing::debug!(%trace_id, "cycle started");

        let ctx = gather_context(&self.store, self.species.as_ref()).await?;
        tracing::debug!(
            %trace_id,
            plant_name = %ctx.plant_name,
            soil_moisture = ctx.reading.soil_moisture_percent,
            "context gathered"
        );

        let forecast = self
            .forecast
            .forecast_24h(&ctx.pot.latitude, &ctx.pot.longitude)
            .await
            .map_err(|e| PipelineError::MissingData(format!("weather forecast failed: {e}")))?;

        let image_jpeg = tokio::fs::read(&ctx.photo_path)
            .await
            .map_err(|e| PipelineError::MissingData(format!("plant photo unreadable: {e}")))?;

        let request = VisionRequest {
            model: self.model_id.clone(),
            system: SYSTEM_PROMPT.to_string(),
            text: context_block(&ctx.plant_name, &ctx.pot, &ctx.reading, &forecast),
            image_jpeg,
        };
        let reply = self
            .model
            .assess(request)
            .await
            .map_err(PipelineError::AssessmentUnavailable)?;

        let result = validate_assessment(&reply)?;
        tracing::info!(
            %trace_id,
            health_level = result.health.health_level,
            should_water = result.irrigation.should_water,
            water_ml = result.irrigation.water_ml,
            "assessment validated"
        );

        let stamp = now_stamp();
        let (health_entry, watering_entry) = build_entries(&stamp, &ctx, &forecast, &result);
        record_assessment(&self.store, &health_entry, &watering_entry).await?;

        Ok(CycleReport {
            trace_id,
            timestamp: stamp.timestamp,
            plant_name: ctx.plant_name,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sprout_provider::{StubAssessment, StubForecast, StubSpecies};
    use sprout_schema::{PotInfo, WeatherForecast};
    use sprout_store::StorePaths;
    use tempfile::TempDir;

    const GOOD_REPLY: &str = r#"```json
{
  "health": {"health_level": 4, "reasons": ["slightly_dry"], "suggestions": ["water lightly"]},
  "irrigation": {"should_water": true, "water_ml": 150,
    "target_soil_moisture_percent_min": 40, "target_soil_moisture_percent_max": 60,
    "note": "forecast is dry"}
}
```"#;

    async fn seeded_pipeline(dir: &TempDir, reply: &str) -> Pipeline {
        let store = PlantStore::open(StorePaths::new(dir.path())).unwrap();
        store
            .sensor_log()
            .append(json!({
                "timestamp": "2025-03-01T08:00:00",
                "soil_moisture_percent": 37.5,
                "light_lux": 1200.0,
                "soil_temperature_c": 17.8,
                "air_temperature_c": 21.3,
                "air_humidity_percent": 48.0
            }))
            .await
            .unwrap();
        store
            .save_pot_info(&PotInfo {
                pot_diameter: Some(18.0),
                pot_height: Some(20.0),
                latitude: Some("59.91".into()),
                longitude: Some("10.75".into()),
                updated_at: None,
            })
            .await
            .unwrap();
        store.save_plant_identity("Ficus lyrata").await.unwrap();
        std::fs::write(store.paths().setup_photo(), b"\xff\xd8jpeg").unwrap();

        Pipeline {
            store,
            model: Arc::new(StubAssessment {
                reply: reply.to_string(),
            }),
            species: Arc::new(StubSpecies {
                scientific_name: None,
            }),
            forecast: Arc::new(StubForecast {
                forecast: WeatherForecast {
                    will_rain_next_24h: false,
                    rain_mm_next_24h: 0.0,
                    max_temp_next_24h_c: 23.5,
                },
            }),
            model_id: "gpt-4o".into(),
        }
    }

    #[tokio::test]
    async fn good_cycle_appends_both_entries() {
        let dir = TempDir::new().unwrap();
        let pipeline = seeded_pipeline(&dir, GOOD_REPLY).await;

        let report = pipeline.run_cycle().await.unwrap();
        assert_eq!(report.plant_name, "Ficus lyrata");
        assert_eq!(report.result.irrigation.water_ml, 150);

        let health = pipeline.store.health_log().read_all().await.unwrap();
        let watering = pipeline.store.watering_log().read_all().await.unwrap();
        assert_eq!(health.len(), 1);
        assert_eq!(watering.len(), 1);
        assert_eq!(health[0]["timestamp"], watering[0]["timestamp"]);
        assert_eq!(health[0]["health_level"], 4);
        assert_eq!(watering[0]["will_rain_next_24h"], false);
    }

    #[tokio::test]
    async fn malformed_reply_leaves_logs_untouched() {
        let dir = TempDir::new().unwrap();
        let pipeline = seeded_pipeline(&dir, "the plant looks fine to me").await;

        let err = pipeline.run_cycle().await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidAssessment { .. }));
        assert!(pipeline.store.health_log().read_all().await.unwrap().is_empty());
        assert!(pipeline.store.watering_log().read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_sensor_log_skips_cycle() {
        let dir = TempDir::new().unwrap();
        let pipeline = seeded_pipeline(&dir, GOOD_REPLY).await;
        pipeline.store.sensor_log().clear().await.unwrap();

        let err = pipeline.run_cycle().await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingData(_)));
    }
}
