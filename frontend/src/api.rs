use gloo_file::{Blob, File as GlooFile, ObjectUrl};
use gloo_net::http::{Request, Response};
use shared::workflow::{Pacer, PredictionApi};
use shared::{CreatePredictionRequest, ErrorResponse, Prediction, UploadRequest, UploadedFile};
use std::future::Future;
use std::time::Duration;
use wasm_bindgen::JsCast;
use web_sys::HtmlAnchorElement;

const UPLOAD_FAILED: &str = "Network response was not ok";

/// Prediction relay as seen from the browser.
pub struct RelayClient;

impl PredictionApi for RelayClient {
    type Error = String;

    fn create(&self, image_url: &str) -> impl Future<Output = Result<Prediction, String>> {
        let body = CreatePredictionRequest {
            image_url: image_url.to_string(),
        };
        async move {
            let response = Request::post("/api/predictions")
                .json(&body)
                .map_err(|e| format!("Failed to build request: {}", e))?
                .send()
                .await
                .map_err(|e| format!("Network error: {}", e))?;
            read_prediction(response, 201).await
        }
    }

    fn get(&self, id: &str) -> impl Future<Output = Result<Prediction, String>> {
        let url = format!(
            "/api/predictions/{}",
            String::from(js_sys::encode_uri_component(id))
        );
        async move {
            let response = Request::get(&url)
                .send()
                .await
                .map_err(|e| format!("Network error: {}", e))?;
            read_prediction(response, 200).await
        }
    }
}

pub struct TimerPacer;

impl Pacer for TimerPacer {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        gloo_timers::future::sleep(duration)
    }
}

async fn read_prediction(response: Response, expected_status: u16) -> Result<Prediction, String> {
    if response.status() != expected_status {
        return Err(error_message(response, None).await);
    }
    response
        .json::<Prediction>()
        .await
        .map_err(|e| format!("Failed to parse response: {}", e))
}

async fn error_message(response: Response, fallback: Option<&str>) -> String {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) if !body.error.is_empty() => body.error,
        _ => fallback
            .map(str::to_string)
            .unwrap_or_else(|| format!("Server error: {}", status)),
    }
}

pub async fn read_data_url(file: &GlooFile) -> Result<String, String> {
    gloo_file::futures::read_as_data_url(file)
        .await
        .map_err(|e| format!("Failed to read {}: {}", file.name(), e))
}

pub async fn upload_image(data_url: String) -> Result<UploadedFile, String> {
    let response = Request::post("/api/upload")
        .json(&UploadRequest { base64: data_url })
        .map_err(|e| format!("Failed to build request: {}", e))?
        .send()
        .await
        .map_err(|_| UPLOAD_FAILED.to_string())?;

    if !response.ok() {
        return Err(error_message(response, Some(UPLOAD_FAILED)).await);
    }

    response
        .json::<UploadedFile>()
        .await
        .map_err(|e| format!("Failed to parse response: {}", e))
}

/// Fetches the generated animation and hands it to the browser as a file download.
/// The returned `ObjectUrl` must outlive the download; dropping it revokes the link.
pub async fn download_output(url: &str, file_name: &str) -> Result<ObjectUrl, String> {
    let response = Request::get(url)
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;
    if !response.ok() {
        return Err(format!("Download failed: {}", response.status()));
    }
    let bytes = response
        .binary()
        .await
        .map_err(|e| format!("Download failed: {}", e))?;

    let blob = Blob::new_with_options(bytes.as_slice(), Some("image/gif"));
    let object_url = ObjectUrl::from(blob);

    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| "No document available".to_string())?;
    let body = document
        .body()
        .ok_or_else(|| "No document body available".to_string())?;
    let anchor = document
        .create_element("a")
        .map_err(|_| "Failed to create download link".to_string())?
        .dyn_into::<HtmlAnchorElement>()
        .map_err(|_| "Failed to create download link".to_string())?;

    anchor.set_href(&object_url);
    anchor.set_download(file_name);
    anchor.set_hidden(true);
    body.append_child(&anchor)
        .map_err(|_| "Failed to attach download link".to_string())?;
    anchor.click();
    anchor.remove();

    log::info!("Downloaded {} as {}", url, file_name);
    Ok(object_url)
}
