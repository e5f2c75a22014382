//! Context aggregation: everything a decision cycle needs, gathered into
//! one immutable snapshot before any external model is involved.

use std::path::PathBuf;

use serde_json::Value;
use sprout_provider::SpeciesIdentifier;
use sprout_schema::{PotInfo, SensorReading};
use sprout_store::PlantStore;

use crate::error::PipelineError;

/// Pot info with the geometry and location fields proven present.
#[derive(Debug, Clone)]
pub struct PotContext {
    pub pot_diameter: f64,
    pub pot_height: f64,
    pub latitude: String,
    pub longitude: String,
}

impl PotContext {
    fn try_from_pot(pot: PotInfo) -> Result<Self, PipelineError> {
        let pot_diameter = pot
            .pot_diameter
            .ok_or_else(|| PipelineError::MissingData("pot info lacks pot_diameter".into()))?;
        let pot_height = pot
            .pot_height
            .ok_or_else(|| PipelineError::MissingData("pot info lacks pot_height".into()))?;
        let latitude = pot
            .latitude
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| PipelineError::MissingData("pot info lacks latitude".into()))?;
        let longitude = pot
            .longitude
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| PipelineError::MissingData("pot info lacks longitude".into()))?;
        Ok(Self {
            pot_diameter,
            pot_height,
            latitude,
            longitude,
        })
    }
}

/// Immutable inputs of one cycle.
#[derive(Debug, Clone)]
pub struct DecisionContext {
    pub reading: SensorReading,
    pub pot: PotContext,
    pub plant_name: String,
    pub photo_path: PathBuf,
}

/// Latest entry by `timestamp`; on equal timestamps the later insertion
/// wins. Entries without a timestamp are never candidates.
pub(crate) fn latest_reading(entries: &[Value]) -> Option<&Value> {
    let mut best: Option<(&str, &Value)> = None;
    for entry in entries {
        let Some(ts) = entry.get("timestamp").and_then(Value::as_str) else {
            continue;
        };
        match best {
            Some((best_ts, _)) if ts < best_ts => {}
            _ => best = Some((ts, entry)),
        }
    }
    best.map(|(_, entry)| entry)
}

/// Gather the latest sensor reading, validated pot info, plant identity
/// and newest photo. Resolves the plant identity through the species
/// service at most once per generation: a successful resolution is cached
/// and re-read on every later cycle.
pub async fn gather_context(
    store: &PlantStore,
    species: &dyn SpeciesIdentifier,
) -> Result<DecisionContext, PipelineError> {
    let entries = store
        .sensor_log()
        .read_all()
        .await
        .map_err(|e| PipelineError::MissingData(format!("sensor log unreadable: {e}")))?;
    let latest = latest_reading(&entries)
        .ok_or_else(|| PipelineError::MissingData("sensor log is empty".into()))?;
    let reading: SensorReading = serde_json::from_value(latest.clone())
        .map_err(|e| PipelineError::MissingData(format!("latest sensor reading incomplete: {e}")))?;

    let pot = store
        .load_pot_info()
        .await
        .map_err(|e| PipelineError::MissingData(format!("pot info unreadable: {e}")))?
        .ok_or_else(|| PipelineError::MissingData("pot info is not configured".into()))?;
    let pot = PotContext::try_from_pot(pot)?;

    let photo_path = store
        .latest_photo()
        .await
        .map_err(|e| PipelineError::MissingData(format!("images dir unreadable: {e}")))?
        .ok_or_else(|| PipelineError::MissingData("no plant photo available".into()))?;

    let plant_name = resolve_plant_identity(store, species, &photo_path).await?;

    Ok(DecisionContext {
        reading,
        pot,
        plant_name,
        photo_path,
    })
}

async fn resolve_plant_identity(
    store: &PlantStore,
    species: &dyn SpeciesIdentifier,
    photo_path: &std::path::Path,
) -> Result<String, PipelineError> {
    if let Some(name) = store
        .load_plant_identity()
        .await
        .map_err(|e| PipelineError::MissingData(format!("plant identity unreadable: {e}")))?
    {
        return Ok(name);
    }

    let image = tokio::fs::read(photo_path)
        .await
        .map_err(|e| PipelineError::MissingData(format!("plant photo unreadable: {e}")))?;
    let name = species
        .identify(image)
        .await
        .map_err(|e| PipelineError::MissingData(format!("species identification failed: {e}")))?
        .ok_or_else(|| {
            PipelineError::MissingData("species identification returned no candidate".into())
        })?;
    store
        .save_plant_identity(&name)
        .await
        .map_err(PipelineError::LogWriteFailure)?;
    tracing::info!(scientific_name = %name, "plant identity resolved and cached");
    Ok(name)
}
