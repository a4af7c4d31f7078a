//! HTTP surface: the page itself plus the JSON API it polls.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::encoder::{self, FileHandle};
use crate::error::{EncodeError, GenerationError};
use crate::orchestrator::{Orchestrator, Snapshot};
use crate::state::RequestKind;

const INDEX_HTML: &str = include_str!("../static/index.html");

pub fn router(orchestrator: Orchestrator, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/state", get(current_state))
        .route("/api/image", post(upload_image))
        .route("/api/image/:generation", get(preview_image))
        .route("/api/generate/caption", post(generate_caption))
        .route("/api/generate/social-post", post(generate_social_post))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn current_state(State(orchestrator): State<Orchestrator>) -> Json<Snapshot> {
    Json(orchestrator.snapshot())
}

async fn upload_image(
    State(orchestrator): State<Orchestrator>,
    mut multipart: Multipart,
) -> Result<Json<Snapshot>, (StatusCode, String)> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_rejection)? {
        if field.name() != Some("image") {
            continue;
        }

        let name = field.file_name().unwrap_or("image").to_string();
        let declared = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_rejection)?;

        let (declared, bytes) = match encoder::decode_data_uri(&data) {
            Some((mime, bytes)) => (Some(mime), bytes),
            None => (declared, data.to_vec()),
        };

        let mime = encoder::resolve_mime(declared.as_deref(), &bytes).map_err(|e| {
            warn!(%name, error = %e, "rejected upload");
            let status = match e {
                EncodeError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                EncodeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, e.to_string())
        })?;

        orchestrator.select_image(FileHandle::from_bytes(name, Some(mime), bytes));
        return Ok(Json(orchestrator.snapshot()));
    }

    Err((StatusCode::BAD_REQUEST, "No image field in upload".to_string()))
}

// Exceeding the upload limit surfaces here as 413, not as a malformed body.
fn multipart_rejection(err: MultipartError) -> (StatusCode, String) {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("upload exceeds the configured size limit");
        return (status, "Image is too large to upload".to_string());
    }
    (status, err.body_text())
}

async fn preview_image(
    State(orchestrator): State<Orchestrator>,
    Path(generation): Path<u64>,
) -> Response {
    let Some(file) = orchestrator.preview(generation) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match file.read().await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, file.mime_hint().to_string()),
                (header::CACHE_CONTROL, "no-store".to_string()),
            ],
            bytes.to_vec(),
        )
            .into_response(),
        Err(e) => {
            warn!(generation, error = %e, "preview unavailable");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

async fn generate_caption(
    State(orchestrator): State<Orchestrator>,
) -> (StatusCode, Json<Snapshot>) {
    start(&orchestrator, RequestKind::Caption)
}

async fn generate_social_post(
    State(orchestrator): State<Orchestrator>,
) -> (StatusCode, Json<Snapshot>) {
    start(&orchestrator, RequestKind::SocialPost)
}

fn start(orchestrator: &Orchestrator, kind: RequestKind) -> (StatusCode, Json<Snapshot>) {
    let status = match orchestrator.start(kind) {
        Ok(_) => StatusCode::ACCEPTED,
        Err(GenerationError::AlreadyPending(_)) => StatusCode::CONFLICT,
        Err(_) => StatusCode::BAD_REQUEST,
    };
    (status, Json(orchestrator.snapshot()))
}
