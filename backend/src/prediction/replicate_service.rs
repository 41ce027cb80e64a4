use log::{info, warn};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use shared::Prediction;
use url::Url;

use crate::config::{GenerationConfig, ReplicateConfig};
use crate::upstream;

#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("URL parsing failed: {0}")]
    Url(#[from] url::ParseError),
    #[error("Invalid prediction id")]
    InvalidId,
    #[error("{message}")]
    Upstream { status: u16, message: String },
}

#[derive(Serialize)]
struct CreatePredictionBody<'a> {
    version: &'a str,
    input: Value,
}

/// Creates and looks up generation jobs on the hosted prediction API.
#[derive(Clone)]
pub struct PredictionService {
    http_client: Client,
    api_base: Url,
    api_token: String,
    generation: GenerationConfig,
}

impl PredictionService {
    pub fn new(http_client: Client, config: &ReplicateConfig) -> Self {
        Self {
            http_client,
            api_base: config.api_base.clone(),
            api_token: config.api_token.clone(),
            generation: config.generation.clone(),
        }
    }

    fn predictions_url(&self) -> Result<Url, PredictionError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(["v1", "predictions"]);
        Ok(url)
    }

    pub async fn create(&self, image_url: &str) -> Result<Prediction, PredictionError> {
        let body = CreatePredictionBody {
            version: &self.generation.version,
            input: self.generation.input_for(image_url),
        };

        let response = self
            .http_client
            .post(self.predictions_url()?)
            .header("Authorization", format!("Token {}", self.api_token))
            .json(&body)
            .send()
            .await?;

        let prediction = Self::read_prediction(response).await?;
        info!("Created prediction {} for {}", prediction.id, image_url);
        Ok(prediction)
    }

    pub async fn get(&self, id: &str) -> Result<Prediction, PredictionError> {
        if id.trim().is_empty() {
            return Err(PredictionError::InvalidId);
        }

        let mut url = self.predictions_url()?;
        url.path_segments_mut()
            .map_err(|_| PredictionError::InvalidId)?
            .push(id);

        let response = self
            .http_client
            .get(url)
            .header("Authorization", format!("Token {}", self.api_token))
            .send()
            .await?;

        Self::read_prediction(response).await
    }

    async fn read_prediction(response: Response) -> Result<Prediction, PredictionError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            warn!("Prediction API returned {}: {}", status, error_text);
            let message = upstream::error_message(&error_text)
                .unwrap_or_else(|| format!("Prediction request failed with status {}", status));
            return Err(PredictionError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}
