use actix_files::Files;
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::http::StatusCode;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use log::{error, info, warn};
use shared::upload::FileRejection;
use shared::{CreatePredictionRequest, ErrorResponse, UploadRequest};

use crate::prediction::replicate_service::{PredictionError, PredictionService};
use crate::storage::media_service::{MediaService, UploadError};

/// A 1 MB image grows by a third once base64 encoded.
const UPLOAD_BODY_LIMIT: usize = 2 * 1024 * 1024;

pub fn configure_routes(cfg: &mut web::ServiceConfig, frontend_dir: String) {
    configure_api(cfg);
    cfg.service(Files::new("/", frontend_dir).index_file("index.html"));
}

pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(
            web::resource("/api/upload")
                .app_data(
                    web::JsonConfig::default()
                        .limit(UPLOAD_BODY_LIMIT)
                        .error_handler(json_error_handler),
                )
                .route(web::post().to(upload_image)),
        )
        .service(web::resource("/api/predictions").route(web::post().to(create_prediction)))
        .service(web::resource("/api/predictions/{id}").route(web::get().to(get_prediction)));
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> Error {
    let status = match &err {
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            StatusCode::PAYLOAD_TOO_LARGE
        }
        JsonPayloadError::ContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        _ => StatusCode::BAD_REQUEST,
    };
    warn!("Rejected request body: {}", err);
    let response = HttpResponse::build(status).json(ErrorResponse::new(err.to_string()));
    InternalError::from_response(err, response).into()
}

fn error_response(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse::new(message))
}

fn upload_status(err: &UploadError) -> StatusCode {
    match err {
        UploadError::Rejected(FileRejection::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
        UploadError::Rejected(FileRejection::InvalidType { .. }) | UploadError::InvalidPayload(_) => {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        }
        UploadError::Decode(_) | UploadError::UnknownFormat => StatusCode::BAD_REQUEST,
        UploadError::Http(_) | UploadError::Upstream(_) => StatusCode::BAD_GATEWAY,
    }
}

fn prediction_status(err: &PredictionError) -> StatusCode {
    match err {
        PredictionError::InvalidId => StatusCode::BAD_REQUEST,
        PredictionError::Upstream { status: 404, .. } => StatusCode::NOT_FOUND,
        PredictionError::Http(_) => StatusCode::BAD_GATEWAY,
        PredictionError::Url(_) | PredictionError::Upstream { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn upload_image(
    media: web::Data<MediaService>,
    body: web::Json<UploadRequest>,
) -> HttpResponse {
    match media.upload(&body.base64).await {
        Ok(uploaded) => HttpResponse::Ok().json(uploaded),
        Err(e) => {
            error!("Upload failed: {}", e);
            error_response(upload_status(&e), e.to_string())
        }
    }
}

async fn create_prediction(
    predictions: web::Data<PredictionService>,
    body: web::Json<CreatePredictionRequest>,
) -> HttpResponse {
    let image_url = body.image_url.trim();
    if image_url.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "imageUrl is required");
    }

    match predictions.create(image_url).await {
        Ok(prediction) => HttpResponse::Created().json(prediction),
        Err(e) => {
            error!("Failed to create prediction for {}: {}", image_url, e);
            error_response(prediction_status(&e), e.to_string())
        }
    }
}

async fn get_prediction(
    predictions: web::Data<PredictionService>,
    path: web::Path<String>,
) -> HttpResponse {
    let id = path.into_inner();
    match predictions.get(&id).await {
        Ok(prediction) => {
            info!("Prediction {} is {}", prediction.id, prediction.status);
            HttpResponse::Ok().json(prediction)
        }
        Err(e) => {
            error!("Error retrieving prediction {}: {}", id, e);
            error_response(prediction_status(&e), e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationConfig, MediaConfig, ReplicateConfig};
    use actix_web::{test, App, HttpServer};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::{json, Value};
    use shared::{Prediction, PredictionStatus, UploadedFile};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use url::Url;

    const TOKEN: &str = "test-token";

    /// Calls that reached the fake upstream.
    #[derive(Default)]
    struct UpstreamCalls {
        uploads: AtomicUsize,
        creates: AtomicUsize,
    }

    async fn fake_upload(
        calls: web::Data<Arc<UpstreamCalls>>,
        form: web::Form<HashMap<String, String>>,
    ) -> HttpResponse {
        calls.uploads.fetch_add(1, Ordering::SeqCst);
        match form.get("upload_preset").map(String::as_str) {
            Some("unsigned") if form.get("file").is_some_and(|f| f.starts_with("data:image/")) => {
                HttpResponse::Ok().json(json!({
                    "public_id": "abc",
                    "secure_url": "https://x/img.png"
                }))
            }
            _ => HttpResponse::BadRequest()
                .json(json!({ "error": { "message": "Upload preset not found" } })),
        }
    }

    async fn fake_create(
        calls: web::Data<Arc<UpstreamCalls>>,
        req: HttpRequest,
        body: web::Json<Value>,
    ) -> HttpResponse {
        calls.creates.fetch_add(1, Ordering::SeqCst);
        let authorized = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            == Some("Token test-token");
        if !authorized {
            return HttpResponse::Unauthorized().json(json!({ "detail": "Invalid token." }));
        }
        if body["version"] != "v1" {
            return HttpResponse::UnprocessableEntity().json(json!({ "detail": "bad version" }));
        }
        match body["input"]["image"].as_str() {
            Some("https://x/limited.png") => {
                HttpResponse::TooManyRequests().json(json!({ "detail": "rate limited" }))
            }
            Some(_) => HttpResponse::Created().json(json!({
                "id": "p1",
                "version": "v1",
                "status": "processing",
                "output": "https://x/frame1.gif",
                "error": null,
                "urls": { "get": "https://api/p1" }
            })),
            None => HttpResponse::UnprocessableEntity().json(json!({ "detail": "image missing" })),
        }
    }

    async fn fake_get(path: web::Path<String>) -> HttpResponse {
        match path.as_str() {
            "p1" => HttpResponse::Ok().json(json!({
                "id": "p1",
                "status": "succeeded",
                "output": ["https://x/frame1.gif", "https://x/final.gif"],
                "error": null
            })),
            _ => HttpResponse::NotFound().json(json!({ "detail": "Not found." })),
        }
    }

    /// Starts a local stand-in for both hosted APIs and returns its base URL.
    fn spawn_upstream(calls: Arc<UpstreamCalls>) -> Url {
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(calls.clone()))
                .route("/v1_1/demo/image/upload", web::post().to(fake_upload))
                .route("/v1/predictions", web::post().to(fake_create))
                .route("/v1/predictions/{id}", web::get().to(fake_get))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        Url::parse(&format!("http://{}", addr)).unwrap()
    }

    fn services(base: &Url, preset: &str) -> (MediaService, PredictionService) {
        let client = reqwest::Client::new();
        let media = MediaService::new(
            client.clone(),
            &MediaConfig {
                upload_url: base.join("v1_1/demo/image/upload").unwrap(),
                upload_preset: preset.to_string(),
            },
        );
        let predictions = PredictionService::new(
            client,
            &ReplicateConfig {
                api_base: base.clone(),
                api_token: TOKEN.to_string(),
                generation: GenerationConfig::from_yaml_str("version: v1\n").unwrap(),
            },
        );
        (media, predictions)
    }

    macro_rules! api_app {
        ($media:expr, $predictions:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($media))
                    .app_data(web::Data::new($predictions))
                    .configure(configure_api),
            )
            .await
        };
    }

    fn png_data_url(len: usize) -> String {
        let mut bytes = vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
        bytes.resize(len, 0);
        format!("data:image/png;base64,{}", STANDARD.encode(bytes))
    }

    #[actix_web::test]
    async fn upload_returns_secure_url() {
        let calls = Arc::new(UpstreamCalls::default());
        let base = spawn_upstream(calls.clone());
        let (media, predictions) = services(&base, "unsigned");
        let app = api_app!(media, predictions);

        let req = test::TestRequest::post()
            .uri("/api/upload")
            .set_json(UploadRequest {
                base64: png_data_url(128),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let uploaded: UploadedFile = test::read_body_json(resp).await;
        assert_eq!(uploaded.secure_url, "https://x/img.png");
        assert_eq!(calls.uploads.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn oversized_upload_never_reaches_media_store() {
        let calls = Arc::new(UpstreamCalls::default());
        let base = spawn_upstream(calls.clone());
        let (media, predictions) = services(&base, "unsigned");
        let app = api_app!(media, predictions);

        let req = test::TestRequest::post()
            .uri("/api/upload")
            .set_json(UploadRequest {
                base64: png_data_url(1_500_000),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(
            body.error,
            "Please upload a image smaller than 1MB. Current size: 2MB"
        );
        assert_eq!(calls.uploads.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn non_image_upload_is_unsupported() {
        let calls = Arc::new(UpstreamCalls::default());
        let base = spawn_upstream(calls.clone());
        let (media, predictions) = services(&base, "unsigned");
        let app = api_app!(media, predictions);

        let req = test::TestRequest::post()
            .uri("/api/upload")
            .set_json(UploadRequest {
                base64: "data:text/plain;base64,aGVsbG8=".to_string(),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(calls.uploads.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn media_store_rejection_is_passed_through() {
        let calls = Arc::new(UpstreamCalls::default());
        let base = spawn_upstream(calls.clone());
        let (media, predictions) = services(&base, "missing-preset");
        let app = api_app!(media, predictions);

        let req = test::TestRequest::post()
            .uri("/api/upload")
            .set_json(UploadRequest {
                base64: png_data_url(64),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.error, "Upload preset not found");
    }

    #[actix_web::test]
    async fn malformed_upload_body_gets_json_error() {
        let calls = Arc::new(UpstreamCalls::default());
        let base = spawn_upstream(calls.clone());
        let (media, predictions) = services(&base, "unsigned");
        let app = api_app!(media, predictions);

        let req = test::TestRequest::post()
            .uri("/api/upload")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{\"image\": 1}")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert!(!body.error.is_empty());
    }

    #[actix_web::test]
    async fn create_prediction_returns_created_job() {
        let calls = Arc::new(UpstreamCalls::default());
        let base = spawn_upstream(calls.clone());
        let (media, predictions) = services(&base, "unsigned");
        let app = api_app!(media, predictions);

        let req = test::TestRequest::post()
            .uri("/api/predictions")
            .set_json(json!({ "imageUrl": "https://x/img.png" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CREATED);
        let prediction: Prediction = test::read_body_json(resp).await;
        assert_eq!(prediction.id, "p1");
        assert_eq!(prediction.status, PredictionStatus::Processing);
        assert_eq!(prediction.output.as_deref(), Some("https://x/frame1.gif"));
    }

    #[actix_web::test]
    async fn create_rejection_carries_upstream_message() {
        let calls = Arc::new(UpstreamCalls::default());
        let base = spawn_upstream(calls.clone());
        let (media, predictions) = services(&base, "unsigned");
        let app = api_app!(media, predictions);

        let req = test::TestRequest::post()
            .uri("/api/predictions")
            .set_json(json!({ "imageUrl": "https://x/limited.png" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.error, "rate limited");
    }

    #[actix_web::test]
    async fn empty_image_url_is_rejected_locally() {
        let calls = Arc::new(UpstreamCalls::default());
        let base = spawn_upstream(calls.clone());
        let (media, predictions) = services(&base, "unsigned");
        let app = api_app!(media, predictions);

        let req = test::TestRequest::post()
            .uri("/api/predictions")
            .set_json(json!({ "imageUrl": "  " }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(calls.creates.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn get_prediction_reports_latest_state() {
        let calls = Arc::new(UpstreamCalls::default());
        let base = spawn_upstream(calls.clone());
        let (media, predictions) = services(&base, "unsigned");
        let app = api_app!(media, predictions);

        let req = test::TestRequest::get().uri("/api/predictions/p1").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let prediction: Prediction = test::read_body_json(resp).await;
        assert!(prediction.is_terminal());
        assert_eq!(prediction.output.as_deref(), Some("https://x/final.gif"));
    }

    #[actix_web::test]
    async fn unknown_prediction_is_not_found() {
        let calls = Arc::new(UpstreamCalls::default());
        let base = spawn_upstream(calls.clone());
        let (media, predictions) = services(&base, "unsigned");
        let app = api_app!(media, predictions);

        let req = test::TestRequest::get().uri("/api/predictions/nope").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.error, "Not found.");
    }
}
