//! PlantNet-style species identification client.
//!
//! https://my-api.plantnet.org/

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::SpeciesIdentifier;

const PLANTNET_API_BASE: &str = "https://my-api.plantnet.org/v2";

#[derive(Debug, Clone)]
pub struct PlantNetIdentifier {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl PlantNetIdentifier {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base(api_key, PLANTNET_API_BASE)
    }

    pub fn with_base(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SpeciesIdentifier for PlantNetIdentifier {
    async fn identify(&self, image_jpeg: Vec<u8>) -> Result<Option<String>> {
        let url = format!("{}/identify/all", self.api_base);
        let part = reqwest::multipart::Part::bytes(image_jpeg)
            .file_name("image.jpg")
            .mime_str("image/jpeg")?;
        let form = reqwest::multipart::Form::new()
            .text("organs", "auto")
            .part("images", part);

        let resp = match self
            .client
            .post(&url)
            .query(&[
                ("api-key", self.api_key.as_str()),
                ("include-related-images", "false"),
                ("nb-results", "1"),
                ("lang", "en"),
            ])
            .multipart(form)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Err(anyhow!(
                    "plantnet api error (timeout) [retryable]: request timed out"
                ));
            }
            Err(e) if e.is_connect() => {
                return Err(anyhow!("plantnet api error (connect) [retryable]: {e}"));
            }
            Err(e) => return Err(e.into()),
        };

        let status = resp.status();
        if status != StatusCode::OK {
            let text = resp.text().await?;
            return Err(format_api_error(status, &text));
        }

        let body: ApiIdentifyResponse = resp.json().await?;
        Ok(first_scientific_name(&body))
    }
}

/// Only the top-ranked candidate is consumed; anything missing along the
/// way is "no candidate", not an error.
fn first_scientific_name(body: &ApiIdentifyResponse) -> Option<String> {
    body.results
        .first()
        .and_then(|m| m.species.scientific_name.clone())
}

fn format_api_error(status: StatusCode, text: &str) -> anyhow::Error {
    let retryable = match status.as_u16() {
        429 | 500..=599 => " [retryable]",
        _ => "",
    };
    anyhow!("plantnet api error ({status}){retryable}: {text}")
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiIdentifyResponse {
    #[serde(default)]
    pub results: Vec<ApiMatch>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiMatch {
    pub species: ApiSpecies,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiSpecies {
    #[serde(rename = "scientificName", default)]
    pub scientific_name: Option<String>,
}
