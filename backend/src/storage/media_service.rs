use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, info, warn};
use reqwest::Client;
use shared::UploadedFile;
use shared::upload::{DataUrlError, FileInfo, FileRejection, data_url_payload, validate_file};
use url::Url;

use crate::config::MediaConfig;
use crate::upstream;

/// Relays base64 images to the hosted media store and hands back their public URL.
#[derive(Clone)]
pub struct MediaService {
    http_client: Client,
    upload_url: Url,
    upload_preset: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid upload: {0}")]
    InvalidPayload(#[from] DataUrlError),
    #[error("Image data is not valid base64")]
    Decode(#[from] base64::DecodeError),
    #[error(transparent)]
    Rejected(#[from] FileRejection),
    #[error("Unrecognised image format")]
    UnknownFormat,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Upstream(String),
}

impl MediaService {
    pub fn new(http_client: Client, config: &MediaConfig) -> Self {
        Self {
            http_client,
            upload_url: config.upload_url.clone(),
            upload_preset: config.upload_preset.clone(),
        }
    }

    /// Checks a data URL against the upload policy and returns the decoded size.
    pub fn validate_image(data_url: &str) -> Result<usize, UploadError> {
        let (mime, payload) = data_url_payload(data_url)?;
        let image_data = STANDARD.decode(payload.trim())?;

        validate_file(&FileInfo {
            name: "upload".to_string(),
            mime: mime.to_string(),
            size: image_data.len() as u64,
        })?;

        let format = image::guess_format(&image_data).map_err(|_| UploadError::UnknownFormat)?;
        debug!("Upload is {:?} ({} bytes)", format, image_data.len());

        Ok(image_data.len())
    }

    pub async fn upload(&self, data_url: &str) -> Result<UploadedFile, UploadError> {
        let size = Self::validate_image(data_url)?;
        info!("Uploading {} byte image to {}", size, self.upload_url);

        let params = [("file", data_url), ("upload_preset", self.upload_preset.as_str())];
        let response = self
            .http_client
            .post(self.upload_url.clone())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            warn!("Media store rejected upload ({}): {}", status, error_text);
            let message = upstream::error_message(&error_text)
                .unwrap_or_else(|| format!("Upload failed with status {}", status));
            return Err(UploadError::Upstream(message));
        }

        let uploaded: UploadedFile = response.json().await?;
        info!("Image stored at {}", uploaded.secure_url);
        Ok(uploaded)
    }
}
