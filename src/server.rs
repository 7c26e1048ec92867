//! HTTP surface for the browser UI.
//!
//! The UI renders widgets and forwards user input here; each request is one
//! render of the shared [`SupportHub`]. Requests run on a blocking task while
//! holding the hub lock, so interactions are evaluated one at a time.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audio::AudioError;
use crate::config::{Config, Settings};
use crate::dashboard::{ProfileUpdate, SupportHub};
use crate::emotion::ClassifierConfig;
use crate::materials::MaterialError;
use crate::rewards::RewardAsset;

/// Shared hub type for use in async contexts
pub type SharedHub = Arc<Mutex<SupportHub>>;

/// Headroom over the material cap so oversize uploads reach the shelf's own check
const BODY_LIMIT_HEADROOM: usize = 64 * 1024;

/// Config backing the settings routes
pub struct SettingsStore {
    config: Config,
    /// `None` keeps changes in memory only
    path: Option<PathBuf>,
}

impl SettingsStore {
    pub fn new(config: Config, path: Option<PathBuf>) -> Self {
        Self { config, path }
    }

    pub fn settings(&self) -> Settings {
        self.config.to_settings()
    }

    /// Merge and persist; the stored config only changes once the save succeeds
    fn apply(&mut self, settings: &Settings) -> anyhow::Result<(Settings, ClassifierConfig)> {
        let mut config = self.config.clone();
        config.update_from_settings(settings);
        match &self.path {
            Some(path) => config.save_to(path)?,
            None => warn!("Config location unavailable, settings kept in memory only"),
        }
        self.config = config;
        Ok((self.config.to_settings(), self.config.classifier_config()))
    }
}

/// Shared state for the HTTP server
#[derive(Clone)]
pub struct AppState {
    pub hub: SharedHub,
    /// Fixed for the life of the hub, so reading it never waits on a render
    pub session_id: Arc<str>,
    pub settings: Arc<Mutex<SettingsStore>>,
}

impl AppState {
    pub fn new(hub: SupportHub, settings: SettingsStore) -> Self {
        let session_id = Arc::from(hub.session_id());
        Self {
            hub: Arc::new(Mutex::new(hub)),
            session_id,
            settings: Arc::new(Mutex::new(settings)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// JSON error body returned to the UI
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<AudioError> for ApiError {
    fn from(e: AudioError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, e.to_string())
    }
}

impl From<MaterialError> for ApiError {
    fn from(e: MaterialError) -> Self {
        let status = match e {
            MaterialError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            MaterialError::ShelfFull { .. } => StatusCode::INSUFFICIENT_STORAGE,
            MaterialError::UnsupportedType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            MaterialError::Empty => StatusCode::BAD_REQUEST,
        };
        Self::new(status, e.to_string())
    }
}

/// Run one render against the hub on a blocking task
async fn with_hub<T, F>(hub: SharedHub, render: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut SupportHub) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = hub
            .lock()
            .map_err(|_| ApiError::internal("Session state is unavailable"))?;
        Ok(render(&mut guard))
    })
    .await
    .map_err(|e| ApiError::internal(format!("Render task failed: {}", e)))?
}

/// Build the router. `max_body_bytes` caps captured images, recordings and uploads.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_endpoint))
        .route("/api/settings", get(get_settings).put(put_settings))
        .route("/api/session", get(get_session))
        .route("/api/session/profile", put(update_profile))
        .route("/api/vision/capture", post(capture_expression))
        .route("/api/audio/record", post(record_audio))
        .route("/api/rewards", get(list_rewards))
        .route("/api/rewards/:asset", post(play_reward))
        .route("/api/materials", get(list_materials).post(upload_material))
        .route("/api/materials/:id", get(get_material))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(
            max_body_bytes.saturating_add(BODY_LIMIT_HEADROOM),
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Bind and serve until Ctrl-C
pub async fn serve(
    state: AppState,
    addr: SocketAddr,
    max_body_bytes: usize,
) -> Result<(), ServerError> {
    let app = router(state, max_body_bytes);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!("Support hub listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Support hub stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Simple health endpoint for quick checks. Never takes the hub lock.
async fn health_endpoint(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "healthy": true,
        "session_id": state.session_id.to_string(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_settings(State(state): State<AppState>) -> Result<Response, ApiError> {
    let settings = state
        .settings
        .lock()
        .map_err(|_| ApiError::internal("Settings are unavailable"))?
        .settings();
    Ok(Json(settings).into_response())
}

async fn put_settings(
    State(state): State<AppState>,
    Json(settings): Json<Settings>,
) -> Result<Response, ApiError> {
    let validation_errors = settings.validate();
    if !validation_errors.is_empty() {
        let error_messages: Vec<String> =
            validation_errors.iter().map(|e| e.to_string()).collect();
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("Invalid settings: {}", error_messages.join("; ")),
        ));
    }

    let store = state.settings.clone();
    let (saved, classifier_config) = tokio::task::spawn_blocking(move || {
        let mut store = store
            .lock()
            .map_err(|_| ApiError::internal("Settings are unavailable"))?;
        store.apply(&settings).map_err(|e| {
            error!("Failed to save settings: {}", e);
            ApiError::internal(format!("Failed to save settings: {}", e))
        })
    })
    .await
    .map_err(|e| ApiError::internal(format!("Settings task failed: {}", e)))??;

    with_hub(state.hub, move |hub| hub.set_classifier_config(classifier_config)).await?;
    info!("Settings updated");
    Ok(Json(saved).into_response())
}

async fn get_session(State(state): State<AppState>) -> Result<Response, ApiError> {
    let header = with_hub(state.hub, |hub| hub.header(Local::now())).await?;
    Ok(Json(header).into_response())
}

async fn update_profile(
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Response, ApiError> {
    let rendered = with_hub(state.hub, move |hub| {
        hub.update_profile(update, Local::now())
    })
    .await?;
    Ok(Json(rendered.header).into_response())
}

async fn capture_expression(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    if body.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Captured image is empty"));
    }
    let rendered = with_hub(state.hub, move |hub| {
        hub.capture_expression(&body, Local::now())
    })
    .await?;
    Ok(Json(rendered).into_response())
}

async fn record_audio(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let rendered = with_hub(state.hub, move |hub| hub.record_audio(&body, Local::now())).await??;
    Ok(Json(rendered).into_response())
}

async fn list_rewards(State(state): State<AppState>) -> Result<Response, ApiError> {
    let rendered = with_hub(state.hub, |hub| hub.rewards(Local::now())).await?;
    Ok(Json(rendered).into_response())
}

async fn play_reward(
    State(state): State<AppState>,
    Path(asset): Path<String>,
) -> Result<Response, ApiError> {
    let asset = RewardAsset::from_id(&asset).ok_or_else(|| {
        warn!("Unknown reward asset requested: {}", asset);
        ApiError::new(StatusCode::NOT_FOUND, format!("Unknown reward: {}", asset))
    })?;
    let rendered = with_hub(state.hub, move |hub| hub.play_reward(asset, Local::now())).await?;
    Ok(Json(rendered).into_response())
}

#[derive(Debug, Deserialize)]
struct UploadParams {
    #[serde(default)]
    file_name: String,
}

async fn upload_material(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let rendered = with_hub(state.hub, move |hub| {
        hub.upload_material(&params.file_name, body.to_vec(), Local::now())
    })
    .await??;
    Ok((StatusCode::CREATED, Json(rendered)).into_response())
}

async fn list_materials(State(state): State<AppState>) -> Result<Response, ApiError> {
    let rendered = with_hub(state.hub, |hub| hub.materials(Local::now())).await?;
    Ok(Json(rendered).into_response())
}

async fn get_material(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let found = with_hub(state.hub, move |hub| {
        hub.material(id)
            .map(|m| (m.kind.content_type(), m.bytes.clone()))
    })
    .await?;

    match found {
        Some((content_type, bytes)) => {
            Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
        }
        None => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("Material not found: {}", id),
        )),
    }
}
