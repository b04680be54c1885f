//! HTTP presentation layer: the web UI and its JSON API.
//!
//! Serves a single-page front end and five small endpoints around the
//! per-session state:
//!
//! - `GET  /`            - the upload/extract/reset page (embedded HTML)
//! - `POST /api/upload`  - multipart image upload (png/jpg/jpeg)
//! - `GET  /api/image`   - the currently uploaded image, for display
//! - `POST /api/extract` - run one extraction against the vision API
//! - `GET  /api/session` - current phase + result, for UI refresh
//! - `POST /api/reset`   - clear image and result
//!
//! # Example
//!
//! ```no_run
//! use img2tex::{server::AppState, ExtractionConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState::new(ExtractionConfig::default())?;
//! let router = img2tex::server::create_router(state);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::ExtractionConfig;
use crate::error::Img2TexError;
use crate::extract;
use crate::output::ExtractionOutput;
use crate::pipeline::postprocess::clean_latex;
use crate::pipeline::vision::VisionProvider;
use crate::session::{Session, SessionError, SessionPhase, UploadedImage};

/// Upload size cap. Generous for equation screenshots; axum's default 2 MB
/// body limit is too tight for phone-camera JPEGs.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

static INDEX_HTML: &str = include_str!("assets/index.html");

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
///
/// One session per served process, matching the single-user interactive
/// model: state is an explicit object injected into every handler via axum's
/// `State`, never a process-wide global.
#[derive(Clone)]
pub struct AppState {
    /// Extraction configuration (model, sampling parameters, prompt).
    pub config: ExtractionConfig,
    /// Vision provider, resolved once at startup.
    pub provider: Arc<dyn VisionProvider>,
    /// The interactive session's state.
    pub session: Arc<Mutex<Session>>,
}

impl AppState {
    /// Creates an `AppState`, resolving the vision provider from the config.
    ///
    /// Fails fast with [`Img2TexError::MissingApiKey`] when no credential is
    /// configured, rather than failing on the first extract click.
    pub fn new(config: ExtractionConfig) -> Result<Self, Img2TexError> {
        let provider = extract::resolve_provider(&config)?;
        Ok(Self::with_provider(config, provider))
    }

    /// Creates an `AppState` with an explicit provider (stubs, middleware).
    #[must_use]
    pub fn with_provider(config: ExtractionConfig, provider: Arc<dyn VisionProvider>) -> Self {
        Self {
            config,
            provider,
            session: Arc::new(Mutex::new(Session::new())),
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Snapshot of the session for the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    /// Current presentation phase.
    pub phase: SessionPhase,
    /// Whether an image is currently held.
    pub has_image: bool,
    /// Original filename of the uploaded image, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Pixel width of the uploaded image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Pixel height of the uploaded image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// The raw extraction result, verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latex: Option<String>,
    /// The cleaned variant used for typesetting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned: Option<String>,
}

impl SessionView {
    fn from_session(session: &Session) -> Self {
        let image = session.image();
        let latex = session.latex().map(str::to_string);
        let cleaned = latex.as_deref().map(clean_latex);
        Self {
            phase: session.phase(),
            has_image: image.is_some(),
            filename: image.and_then(|i| i.filename.clone()),
            width: image.map(UploadedImage::width),
            height: image.map(UploadedImage::height),
            latex,
            cleaned,
        }
    }
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

// ============================================================================
// API Error Type
// ============================================================================

/// Internal error type for API handlers.
#[derive(Debug)]
enum ApiError {
    /// Invalid transition (no image / extraction already running).
    Session(SessionError),
    /// Upload rejected (bad extension, undecodable bytes).
    Upload(Img2TexError),
    /// The vision call failed; prior session state was retained.
    Extraction(Img2TexError),
    /// Malformed multipart request.
    Multipart(String),
    /// The session changed while the call was in flight; result discarded.
    SessionChanged,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Session(SessionError::NoImage) => {
                (StatusCode::BAD_REQUEST, SessionError::NoImage.to_string())
            }
            Self::Session(SessionError::ExtractionInFlight) => (
                StatusCode::CONFLICT,
                SessionError::ExtractionInFlight.to_string(),
            ),
            Self::Upload(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::Extraction(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            Self::Multipart(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::SessionChanged => (
                StatusCode::CONFLICT,
                "Session changed during extraction; result discarded".to_string(),
            ),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with the page and all API endpoints.
pub fn create_router(state: AppState) -> Router {
    // CORS open for development; the app carries no credentials in requests.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/upload", post(handle_upload))
        .route("/image", get(handle_image))
        .route("/extract", post(handle_extract))
        .route("/session", get(handle_session))
        .route("/reset", post(handle_reset));

    Router::new()
        .route("/", get(handle_index))
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `GET /` — the embedded single-page UI.
async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Handler for `GET /api/session`.
async fn handle_session(State(state): State<Arc<AppState>>) -> Json<SessionView> {
    let session = state.session.lock().await;
    Json(SessionView::from_session(&session))
}

/// Handler for `POST /api/upload`.
///
/// Expects a multipart body with a `file` field. Validation and decoding
/// happen before the session is touched, so a rejected upload leaves the
/// prior image and result intact.
async fn handle_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<SessionView>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Multipart(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().map(ToString::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Multipart(e.to_string()))?;

        let image =
            UploadedImage::from_bytes(bytes.to_vec(), filename).map_err(ApiError::Upload)?;
        info!(
            width = image.width(),
            height = image.height(),
            "Image uploaded"
        );

        let mut session = state.session.lock().await;
        session.load_image(image);
        return Ok(Json(SessionView::from_session(&session)));
    }

    Err(ApiError::Multipart(
        "multipart body is missing a 'file' field".to_string(),
    ))
}

/// Handler for `GET /api/image` — the uploaded image bytes for display.
async fn handle_image(State(state): State<Arc<AppState>>) -> Response {
    let session = state.session.lock().await;
    match session.image() {
        Some(image) => (
            [(header::CONTENT_TYPE, image.mime_type)],
            image.raw.clone(),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No image uploaded".to_string(),
            }),
        )
            .into_response(),
    }
}

/// Handler for `POST /api/extract`.
///
/// The session lock is held only to enter and leave the `Extracting` phase,
/// not across the network call, so `GET /api/session` stays responsive and
/// can report the in-flight state. The completion write is discarded when the
/// session moved on (new upload or reset) while the call was in flight.
async fn handle_extract(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ExtractionOutput>, ApiError> {
    let bitmap = {
        let mut session = state.session.lock().await;
        session
            .begin_extraction()
            .map_err(ApiError::Session)?
            .bitmap
            .clone()
    };

    let result = extract::run_extraction(&state.provider, &bitmap, &state.config).await;

    let mut session = state.session.lock().await;
    match result {
        Ok(output) => {
            if session.complete_extraction(output.latex.clone()) {
                Ok(Json(output))
            } else {
                Err(ApiError::SessionChanged)
            }
        }
        Err(e) => {
            warn!(error = %e, "Extraction failed");
            session.fail_extraction();
            Err(ApiError::Extraction(e))
        }
    }
}

/// Handler for `POST /api/reset`.
///
/// Idempotent: clearing an already-empty session succeeds.
async fn handle_reset(State(state): State<Arc<AppState>>) -> Json<SessionView> {
    let mut session = state.session.lock().await;
    session.reset();
    info!("Session reset");
    Json(SessionView::from_session(&session))
}

// ============================================================================
// Tests
// ============================================================================
