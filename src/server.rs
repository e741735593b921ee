//! JSON HTTP server.
//!
//! A thin axum layer over [`App`]. Authentication happens upstream: the
//! auth proxy sets `x-user-id` (and `x-user-admin: true` for admins), and
//! every `/api` route turns those headers into a [`RequestContext`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `GET`    | `/api/documents` | All documents, newest first |
//! | `GET`    | `/api/documents/{id}` | One document |
//! | `POST`   | `/api/documents/ingest` | Ingest server-side files (admin) |
//! | `DELETE` | `/api/documents/{id}` | Delete a document (admin) |
//! | `POST`   | `/api/search` | Ranked chunks for a question |
//! | `POST`   | `/api/ask` | Grounded answer with sources |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "quota_exceeded", "message": "Model API quota exceeded. Please check your API key." } }
//! ```
//!
//! Error codes: `bad_request` (400), `unauthorized` (401), `forbidden` (403),
//! `not_found` (404), `quota_exceeded` (429), `internal` (500).

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use docqa_core::models::{ChunkIndex, Document};
use docqa_core::retrieval::RetrievedChunk;

use crate::answer::{Answer, AnswerError};
use crate::app::App;
use crate::context::{RequestContext, UserIdentity};
use crate::ingest::{IngestError, UploadedFile};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ADMIN_HEADER: &str = "x-user-admin";

#[derive(Clone)]
struct AppState {
    app: Arc<App>,
}

/// Build the router. Split from [`run_server`] so tests can drive it
/// without a socket.
pub fn router(app: Arc<App>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/documents", get(handle_list_documents))
        .route("/api/documents/ingest", post(handle_ingest))
        .route(
            "/api/documents/{id}",
            get(handle_get_document).delete(handle_delete_document),
        )
        .route("/api/search", post(handle_search))
        .route("/api/ask", post(handle_ask))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { app })
}

/// Serve on `[server].bind` until the process is terminated.
pub async fn run_server(app: App) -> anyhow::Result<()> {
    let bind_addr = app.config.server.bind.clone();
    let router = router(Arc::new(app));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "docqa server listening");
    println!("docqa server listening on http://{}", bind_addr);
    axum::serve(listener, router).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::NOT_FOUND, "not_found", message)
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "request failed");
    AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal error")
}

impl From<AnswerError> for AppError {
    fn from(err: AnswerError) -> Self {
        match &err {
            AnswerError::QuotaExceeded(source) => {
                tracing::warn!(error = %source, "model quota exceeded");
                AppError::new(StatusCode::TOO_MANY_REQUESTS, err.code(), err.to_string())
            }
            AnswerError::Failed(source) => {
                tracing::error!(error = %format!("{:#}", source), "question failed");
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, err.code(), err.to_string())
            }
        }
    }
}

// ============ Caller identity ============

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AppError::new(StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized")
            })?;
        let is_admin = parts
            .headers
            .get(USER_ADMIN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(RequestContext {
            user: UserIdentity {
                user_id: user_id.to_string(),
                is_admin,
            },
        })
    }
}

fn require_admin(ctx: &RequestContext) -> Result<(), AppError> {
    if ctx.is_admin() {
        Ok(())
    } else {
        Err(AppError::new(
            StatusCode::FORBIDDEN,
            "forbidden",
            "Admin access required",
        ))
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Documents ============

async fn handle_list_documents(
    State(state): State<AppState>,
    _ctx: RequestContext,
) -> Result<Json<Vec<Document>>, AppError> {
    let docs = state.app.documents.list().await.map_err(internal)?;
    Ok(Json(docs))
}

async fn handle_get_document(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    state
        .app
        .documents
        .get(&id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("Document not found"))
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: String,
}

async fn handle_delete_document(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    require_admin(&ctx)?;
    match state.app.documents.delete(&id).await.map_err(internal)? {
        Some(doc) => Ok(Json(DeleteResponse { deleted: doc.id })),
        None => Err(not_found("Document not found")),
    }
}

#[derive(Deserialize)]
struct IngestFile {
    path: PathBuf,
    original_name: Option<String>,
}

#[derive(Deserialize)]
struct IngestRequest {
    files: Vec<IngestFile>,
}

#[derive(Serialize)]
struct IngestResult {
    original_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<Document>,
    chunks: usize,
    images: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn handle_ingest(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(req): Json<IngestRequest>,
) -> Result<Json<Vec<IngestResult>>, AppError> {
    require_admin(&ctx)?;
    if req.files.is_empty() {
        return Err(bad_request("No files uploaded"));
    }

    let files: Vec<UploadedFile> = req
        .files
        .into_iter()
        .map(|f| match f.original_name {
            Some(name) => UploadedFile::new(f.path, name),
            None => UploadedFile::from_path(f.path),
        })
        .collect();

    let results = state.app.ingestor.ingest_batch(&files, &ctx).await;
    let body = results
        .into_iter()
        .map(|item| match item.result {
            Ok(ingested) => IngestResult {
                original_name: item.original_name,
                chunks: ingested.chunks + ingested.image_chunks,
                images: ingested.images,
                document: Some(ingested.document),
                error: None,
            },
            Err(e) => IngestResult {
                original_name: item.original_name,
                document: None,
                chunks: 0,
                images: 0,
                error: Some(match e {
                    IngestError::Rejected(msg) => msg,
                    IngestError::Failed(_) => "Failed to process file".to_string(),
                }),
            },
        })
        .collect();
    Ok(Json(body))
}

// ============ Questions ============

#[derive(Deserialize)]
struct QuestionRequest {
    question: String,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

/// A retrieved chunk without its embedding vector.
#[derive(Serialize)]
struct SearchHit {
    chunk_id: String,
    document_id: String,
    chunk_index: ChunkIndex,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<u32>,
    similarity: f32,
}

impl From<RetrievedChunk> for SearchHit {
    fn from(r: RetrievedChunk) -> Self {
        Self {
            chunk_id: r.chunk.id,
            document_id: r.chunk.document_id,
            chunk_index: r.chunk.chunk_index,
            text: r.chunk.text,
            page: r.chunk.page_number,
            similarity: r.similarity,
        }
    }
}

fn validate_question(req: &QuestionRequest) -> Result<&str, AppError> {
    let q = req.question.trim();
    if q.is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    Ok(q)
}

async fn handle_search(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let question = validate_question(&req)?;
    let results = state.app.assistant.search(question).await?;
    Ok(Json(SearchResponse {
        results: results.into_iter().map(SearchHit::from).collect(),
    }))
}

async fn handle_ask(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<Answer>, AppError> {
    let question = validate_question(&req)?;
    let answer = state.app.assistant.answer_question(question).await?;
    Ok(Json(answer))
}
