use crate::config::Config;
use crate::error::SketchError;
use crate::filters::{
    self, CompositeConfig, EdgeStyle, FilterType, Mode, Preset, RenderedImage, SingleFilterConfig,
};
use crate::storage::{self, ObjectStore, CURRENT_REFERENCE_PATH};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::header::{self, HeaderName},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

const PROCESSING_TIME_HEADER: HeaderName = HeaderName::from_static("x-processing-time-ms");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Injected at startup, `None` when storage is not configured
    pub store: Option<Arc<dyn ObjectStore>>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub modes: Vec<String>,
    pub filter_types: Vec<String>,
    pub edge_styles: Vec<String>,
    pub max_file_size_bytes: usize,
    pub storage_backend: Option<String>,
}

/// Upload response
#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
    pub path: String,
}

/// Current reference response
#[derive(Serialize)]
pub struct CurrentResponse {
    pub url: String,
    pub path: String,
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let store = storage::from_config(config.storage.as_ref());

    let state = AppState {
        config: Arc::new(config),
        store,
    };

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let max_file_size = state.config.max_file_size;

    Router::new()
        .route("/process", post(handle_process))
        .route("/api/process", post(handle_single_filter))
        .route("/upload", post(handle_upload))
        .route("/current", get(handle_current))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        // Room for the multipart framing around a max-size file
        .layer(DefaultBodyLimit::max(max_file_size.saturating_add(64 * 1024)))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parsed multipart form: one file plus text fields
struct UploadForm {
    file: Option<Bytes>,
    content_type: Option<String>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, SketchError> {
        let mut form = UploadForm {
            file: None,
            content_type: None,
            fields: HashMap::new(),
        };

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| SketchError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();

            match name.as_str() {
                "file" | "image" => {
                    form.content_type = field.content_type().map(|s| s.to_string());
                    form.file = Some(field.bytes().await.map_err(|e| {
                        SketchError::InvalidRequest(format!("Failed to read file data: {}", e))
                    })?);
                }
                _ => {
                    let value = field.text().await.map_err(|e| {
                        SketchError::InvalidRequest(format!("Invalid field '{}': {}", name, e))
                    })?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// Take the uploaded file, enforcing the configured size limit
    fn take_file(&mut self, max_file_size: usize) -> Result<Bytes, SketchError> {
        let data = self.file.take().ok_or(SketchError::MissingFile)?;
        if data.len() > max_file_size {
            return Err(SketchError::ImageTooLarge {
                size: data.len(),
                max: max_file_size,
            });
        }
        Ok(data)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn int_or(&self, name: &str, default: i64) -> Result<i64, SketchError> {
        match self.text(name) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|_| {
                SketchError::InvalidParameter(format!(
                    "{} must be an integer, got '{}'",
                    name, value
                ))
            }),
        }
    }

    fn bool_or(&self, name: &str, default: bool) -> Result<bool, SketchError> {
        match self.text(name).map(|v| v.to_lowercase()) {
            None => Ok(default),
            Some(value) => match value.as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(SketchError::InvalidParameter(format!(
                    "{} must be a boolean, got '{}'",
                    name, value
                ))),
            },
        }
    }
}

/// Handle composite processing requests
async fn handle_process(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, SketchError> {
    let mut form = UploadForm::read(multipart).await?;
    let data = form.take_file(state.config.max_file_size)?;

    let defaults = CompositeConfig::default();
    let config = CompositeConfig::from_raw(
        form.int_or("levels", defaults.levels as i64)?,
        form.int_or("blur_radius", defaults.blur_radius as i64)?,
        form.int_or("threshold", defaults.threshold as i64)?,
        form.text("mode").unwrap_or(defaults.mode.as_str()),
        form.bool_or("invert", defaults.invert)?,
    )?;

    tracing::info!(
        levels = config.levels,
        blur_radius = config.blur_radius,
        threshold = config.threshold,
        mode = config.mode.as_str(),
        invert = config.invert,
        "Processing {} byte upload",
        data.len()
    );

    render(data, Preset::Composite(config)).await
}

/// Handle single-filter processing requests
async fn handle_single_filter(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, SketchError> {
    let mut form = UploadForm::read(multipart).await?;
    let data = form.take_file(state.config.max_file_size)?;

    let defaults = SingleFilterConfig::default();
    let filter: FilterType = form
        .text("type")
        .unwrap_or(defaults.filter.as_str())
        .parse()?;
    let edge_style: EdgeStyle = form
        .text("edge_style")
        .unwrap_or(defaults.edge_style.as_str())
        .parse()?;
    let config = SingleFilterConfig::new(filter, form.int_or("param_value", defaults.param_value)?)
        .with_edge_style(edge_style);

    tracing::info!(
        filter = filter.as_str(),
        param_value = config.param_value,
        edge_style = edge_style.as_str(),
        "Processing {} byte upload",
        data.len()
    );

    render(data, Preset::SingleFilter(config)).await
}

async fn render(data: Bytes, preset: Preset) -> Result<Response, SketchError> {
    let rendered: RenderedImage =
        tokio::task::spawn_blocking(move || filters::render_png(&data, &preset))
            .await
            .map_err(|e| SketchError::Internal(format!("Processing task failed: {}", e)))??;

    tracing::info!(
        "Rendered {}x{} sketch in {}ms ({} bytes)",
        rendered.width,
        rendered.height,
        rendered.total_time_ms,
        rendered.png.len()
    );
    tracing::debug!(steps = ?rendered.steps, "Stage timings");

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "inline; filename=processed.png".to_string(),
            ),
            (PROCESSING_TIME_HEADER, rendered.total_time_ms.to_string()),
        ],
        rendered.png,
    )
        .into_response())
}

/// Handle uploads of processed images to object storage
async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, SketchError> {
    let store = state.store.clone().ok_or(SketchError::StorageNotConfigured)?;

    let mut form = UploadForm::read(multipart).await?;
    let data = form.take_file(state.config.max_file_size)?;
    let path = storage::validate_path(form.text("path").unwrap_or(CURRENT_REFERENCE_PATH))?
        .to_string();
    let content_type = form
        .content_type
        .clone()
        .unwrap_or_else(|| "image/png".to_string());

    let upload_store = store.clone();
    let upload_path = path.clone();
    tokio::task::spawn_blocking(move || upload_store.upload(&upload_path, &data, &content_type))
        .await
        .map_err(|e| SketchError::Internal(format!("Upload task failed: {}", e)))??;

    tracing::info!("Published {} to {}", path, store.name());

    Ok(Json(UploadResponse {
        success: true,
        url: store.public_url(&path),
        path,
    }))
}

/// Handle lookups of the current sketch reference
async fn handle_current(
    State(state): State<AppState>,
) -> Result<Json<CurrentResponse>, SketchError> {
    let store = state.store.as_ref().ok_or(SketchError::StorageNotConfigured)?;

    Ok(Json(CurrentResponse {
        url: store.public_url(CURRENT_REFERENCE_PATH),
        path: CURRENT_REFERENCE_PATH.to_string(),
    }))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "drawKISS".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        modes: Mode::ALL.iter().map(|m| m.as_str().to_string()).collect(),
        filter_types: FilterType::ALL
            .iter()
            .map(|f| f.as_str().to_string())
            .collect(),
        edge_styles: EdgeStyle::ALL
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        max_file_size_bytes: state.config.max_file_size,
        storage_backend: state.store.as_ref().map(|s| s.name().to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::storage::testing::MemoryStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use image::{Rgb, RgbImage};
    use tower::ServiceExt;

    const BOUNDARY: &str = "drawkiss-test-boundary";

    fn state(store: Option<Arc<dyn ObjectStore>>) -> AppState {
        AppState {
            config: Arc::new(Config {
                host: "127.0.0.1".to_string(),
                port: 0,
                max_file_size: 1024 * 1024,
                storage: None,
            }),
            store,
        }
    }

    fn sample_png() -> Vec<u8> {
        codec::encode_png(&RgbImage::from_fn(24, 16, |x, _| {
            if x < 12 {
                Rgb([30, 30, 30])
            } else {
                Rgb([220, 220, 220])
            }
        }))
        .unwrap()
    }

    fn multipart_body(file: Option<&[u8]>, fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(data) = file {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"photo.png\"\r\nContent-Type: image/png\r\n\r\n",
                    BOUNDARY
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    async fn post_form(
        app: Router,
        uri: &str,
        file: Option<&[u8]>,
        fields: &[(&str, &str)],
    ) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(file, fields)))
            .unwrap();
        app.oneshot(request).await.unwrap()
    }

    async fn get(app: Router, uri: &str) -> Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = get(router(state(None)), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "drawKISS");
    }

    #[tokio::test]
    async fn test_process_returns_png() {
        let png = sample_png();
        let response = post_form(
            router(state(None)),
            "/process",
            Some(&png),
            &[("levels", "4"), ("blur_radius", "0"), ("mode", "posterize")],
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert!(response.headers().contains_key(PROCESSING_TIME_HEADER));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let out = codec::decode(&bytes).unwrap().to_rgb8();
        assert_eq!(out.dimensions(), (24, 16));
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(23, 0).0, [192, 192, 192]);
    }

    #[tokio::test]
    async fn test_process_rejects_unknown_mode() {
        let png = sample_png();
        let response =
            post_form(router(state(None)), "/process", Some(&png), &[("mode", "sepia")]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "INVALID_FILTER_TYPE");
    }

    #[tokio::test]
    async fn test_process_rejects_non_numeric_levels() {
        let png = sample_png();
        let response =
            post_form(router(state(None)), "/process", Some(&png), &[("levels", "four")]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_PARAMETER");
    }

    #[tokio::test]
    async fn test_process_rejects_oversized_blur_radius() {
        let png = sample_png();
        let response = post_form(
            router(state(None)),
            "/process",
            Some(&png),
            &[("blur_radius", "4000000000")],
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_PARAMETER");
    }

    #[tokio::test]
    async fn test_process_requires_file() {
        let response = post_form(router(state(None)), "/process", None, &[("levels", "4")]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "MISSING_FILE");
    }

    #[tokio::test]
    async fn test_process_rejects_corrupt_image() {
        let response =
            post_form(router(state(None)), "/process", Some(b"not a png"), &[]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_IMAGE");
    }

    #[tokio::test]
    async fn test_single_filter_threshold() {
        let png = sample_png();
        let response = post_form(
            router(state(None)),
            "/api/process",
            Some(&png),
            &[("type", "threshold"), ("param_value", "128")],
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let out = codec::decode(&bytes).unwrap().to_rgb8();
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(23, 15).0, [255, 255, 255]);
    }

    #[tokio::test]
    async fn test_single_filter_unknown_type() {
        let png = sample_png();
        let response = post_form(
            router(state(None)),
            "/api/process",
            Some(&png),
            &[("type", "sepia")],
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "INVALID_FILTER_TYPE");
        assert!(body["error"].as_str().unwrap().contains("sepia"));
    }

    #[tokio::test]
    async fn test_upload_without_storage() {
        let png = sample_png();
        let response = post_form(router(state(None)), "/upload", Some(&png), &[]).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = get(router(state(None)), "/current").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_upload_publishes_to_injected_store() {
        let store = Arc::new(MemoryStore::default());
        let app = router(state(Some(store.clone() as Arc<dyn ObjectStore>)));
        let png = sample_png();

        let response = post_form(app.clone(), "/upload", Some(&png), &[]).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["path"], CURRENT_REFERENCE_PATH);
        assert_eq!(body["url"], "memory://bucket/current/sketch_ref.png");

        let objects = store.objects.lock().unwrap();
        let (data, content_type) = &objects[CURRENT_REFERENCE_PATH];
        assert_eq!(data, &png);
        assert_eq!(content_type, "image/png");
        drop(objects);

        let body = json_body(get(app, "/current").await).await;
        assert_eq!(body["url"], "memory://bucket/current/sketch_ref.png");
    }

    #[tokio::test]
    async fn test_upload_rejects_escaping_path() {
        let store = Arc::new(MemoryStore::default());
        let app = router(state(Some(store as Arc<dyn ObjectStore>)));
        let png = sample_png();

        let response = post_form(app, "/upload", Some(&png), &[("path", "../other.png")]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_rejects_query_characters_in_path() {
        let store = Arc::new(MemoryStore::default());
        let app = router(state(Some(store.clone() as Arc<dyn ObjectStore>)));
        let png = sample_png();

        let response = post_form(app, "/upload", Some(&png), &[("path", "a?b.png")]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_info_lists_filters() {
        let body = json_body(get(router(state(None)), "/info").await).await;
        assert_eq!(body["modes"], serde_json::json!(["posterize", "edges", "both"]));
        assert_eq!(
            body["filter_types"],
            serde_json::json!(["posterize", "edges", "blur", "threshold"])
        );
        assert!(body["storage_backend"].is_null());
    }
}
