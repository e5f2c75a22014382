//! External collaborators of the decision pipeline: the multimodal
//! assessment model, the species identification service and the weather
//! forecast service. Each one sits behind a trait so the core can be driven
//! by stubs in tests.

pub mod assessment;
pub mod forecast;
pub mod species;

use anyhow::Result;
use async_trait::async_trait;

use sprout_schema::WeatherForecast;

pub use assessment::OpenAiVisionModel;
pub use forecast::OpenWeatherForecast;
pub use species::PlantNetIdentifier;

/// One fused text+image request to the assessment model.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub model: String,
    pub system: String,
    pub text: String,
    pub image_jpeg: Vec<u8>,
}

/// Multimodal model returning free-form text. No retries happen at this
/// layer; transport failures propagate to the caller.
#[async_trait]
pub trait AssessmentModel: Send + Sync {
    async fn assess(&self, request: VisionRequest) -> Result<String>;
}

/// Species identification from one photo. `None` means the service answered
/// but had no candidate.
#[async_trait]
pub trait SpeciesIdentifier: Send + Sync {
    async fn identify(&self, image_jpeg: Vec<u8>) -> Result<Option<String>>;
}

/// Next-24h weather window for a location.
#[async_trait]
pub trait ForecastService: Send + Sync {
    async fn forecast_24h(&self, latitude: &str, longitude: &str) -> Result<WeatherForecast>;
}

/// Canned assessment model for tests and offline runs.
pub struct StubAssessment {
    pub reply: String,
}

#[async_trait]
impl AssessmentModel for StubAssessment {
    async fn assess(&self, _request: VisionRequest) -> Result<String> {
        Ok(self.reply.clone())
    }
}

pub struct StubSpecies {
    pub scientific_name: Option<String>,
}

#[async_trait]
impl SpeciesIdentifier for StubSpecies {
    async fn identify(&self, _image_jpeg: Vec<u8>) -> Result<Option<String>> {
        Ok(self.scientific_name.clone())
    }
}

pub struct StubForecast {
    pub forecast: WeatherForecast,
}

#[async_trait]
impl ForecastService for StubForecast {
    async fn forecast_24h(&self, _latitude: &str, _longitude: &str) -> Result<WeatherForecast> {
        Ok(self.forecast.clone())
    }
}
