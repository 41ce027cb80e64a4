use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UploadRequest {
    pub base64: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UploadedFile {
    pub secure_url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatePredictionRequest {
    pub image_url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl PredictionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PredictionStatus::Succeeded | PredictionStatus::Failed | PredictionStatus::Canceled
        )
    }
}

/// Job handle of the hosted prediction service. Extra upstream fields are ignored.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Prediction {
    pub id: String,
    pub status: PredictionStatus,
    #[serde(default, deserialize_with = "deserialize_output")]
    pub output: Option<String>,
    #[serde(default, deserialize_with = "deserialize_error")]
    pub error: Option<String>,
}

impl Prediction {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Output comes back as a single URL or as a list of frames; the last frame is the newest
fn deserialize_output<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Array(items) => {
            let mut latest = None;
            for item in items {
                match item {
                    Value::String(s) => latest = Some(s),
                    Value::Null => {}
                    other => {
                        return Err(serde::de::Error::custom(format!(
                            "Invalid output frame: {}",
                            other
                        )));
                    }
                }
            }
            Ok(latest)
        }
        _ => Err(serde::de::Error::custom(
            "Expected output to be null, a string or a list of strings",
        )),
    }
}

// Upstream errors are usually strings but occasionally structured objects
fn deserialize_error<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Ok(Some(other.to_string())),
    }
}
