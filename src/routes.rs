use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, FromRef, FromRequest, Path, Query, Request, State,
        rejection::{PathRejection, QueryRejection},
    },
    handler::HandlerWithoutStateExt,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::any::Any;
use std::path::Path as FsPath;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::{AppError, ErrorResponse, errors};
use crate::ids::RandomHexIds;
use crate::middleware::{RequestContext, request_id_middleware};
use crate::pagination::PageRequest;
use crate::repository::{CreatedScript, ScriptChanges, ScriptRecord, ScriptRepository, ScriptSummary};
use crate::stats::StoreStatistics;
use crate::validation::{FieldError, ScriptInput};

type ApiResult<T> = Result<T, ErrorResponse>;

/// Worst case bytes per content char once encoded (`\uXXXX\uXXXX` in JSON,
/// four `%XX` triplets in a form).
const MAX_ENCODED_BYTES_PER_CHAR: usize = 12;

/// Room for owner, filename, description and field names.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// Request body cap large enough for any content that passes validation.
pub fn body_limit(max_content_chars: usize) -> usize {
    max_content_chars
        .saturating_mul(MAX_ENCODED_BYTES_PER_CHAR)
        .saturating_add(BODY_OVERHEAD_BYTES)
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    repository: Arc<Mutex<ScriptRepository>>,
    default_page_size: usize,
    max_page_size: usize,
    max_content_chars: usize,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let repository = ScriptRepository::with_options(
            config.repository_options(),
            RandomHexIds::new(config.id_bytes),
        );
        Self::with_repository(repository, config)
    }

    pub fn with_repository(repository: ScriptRepository, config: &Config) -> Self {
        Self {
            repository: Arc::new(Mutex::new(repository)),
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            max_content_chars: config.max_content_chars,
        }
    }

    /// Lock the store for one operation. A poisoned lock is recovered since
    /// every repository operation leaves the map consistent before it can panic.
    pub fn repository(&self) -> MutexGuard<'_, ScriptRepository> {
        self.repository.lock().unwrap_or_else(|poisoned| {
            warn!("Script repository mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

/// Body extractor accepting either JSON or url-encoded forms.
///
/// A body over [`body_limit`] is reported as oversized content, with the
/// declared body length standing in for the character count.
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    AppState: FromRef<S>,
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let declared_len = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        let max = AppState::from_ref(state).max_content_chars;

        let bytes = match Bytes::from_request(req, state).await {
            Ok(bytes) => bytes,
            Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                warn!("Rejected oversized body ({:?} bytes declared)", declared_len);
                let actual = declared_len.unwrap_or_default().max(max.saturating_add(1));
                return Err(AppError::ValidationFailed {
                    errors: vec![FieldError::too_large("content", actual, max)],
                });
            }
            Err(rejection) => return Err(AppError::bad_request(rejection.body_text())),
        };

        if is_form {
            serde_urlencoded::from_bytes(&bytes)
                .map(Self)
                .map_err(|e| AppError::bad_request(format!("Invalid form body: {}", e)))
        } else {
            Ok(Self(serde_json::from_slice(&bytes)?))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateScriptRequest {
    pub content: Option<String>,
    pub owner: Option<String>,
    pub filename: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateScriptRequest {
    pub owner: Option<String>,
    pub content: Option<String>,
    pub filename: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub owner: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawQuery {
    pub user: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScriptList {
    pub scripts: Vec<ScriptSummary>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub scripts: usize,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState, static_dir: Option<&FsPath>) -> Router {
    let limit = body_limit(state.max_content_chars);
    let router = Router::new()
        .route("/health", get(health))
        .route("/api/stats", get(stats))
        .route("/api/scripts", get(list_scripts).post(create_script))
        .route(
            "/api/scripts/{id}",
            get(view_script).put(update_script).delete(delete_script),
        )
        .route("/api/scripts/{id}/edit", get(edit_script))
        .route("/view/{id}", get(view_script))
        .route("/edit/{id}", get(edit_script))
        .route("/raw/{id}", get(raw_script));

    let router = match static_dir {
        Some(dir) => {
            debug!("Serving static files from {}", dir.display());
            router.fallback_service(
                ServeDir::new(dir)
                    .call_fallback_on_method_not_allowed(true)
                    .not_found_service(not_found.into_service()),
            )
        }
        None => router.fallback(not_found),
    };

    with_layers(router.with_state(state).layer(DefaultBodyLimit::max(limit)))
}

/// Panic catching, tracing, CORS and request ids, outermost last.
fn with_layers(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(request_id_middleware))
}

fn rejected(ctx: &RequestContext, message: String) -> ErrorResponse {
    ctx.error_response(AppError::bad_request(message))
}

async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let scripts = state.repository().len();
    Json(HealthStatus {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        scripts,
    })
}

async fn stats(State(state): State<AppState>) -> Json<StoreStatistics> {
    Json(state.repository().stats())
}

async fn create_script(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<JsonOrForm<CreateScriptRequest>, AppError>,
) -> ApiResult<(StatusCode, Json<CreatedScript>)> {
    let JsonOrForm(body) = payload.map_err(|e| ctx.error_response(e))?;

    let created = state
        .repository()
        .create(ScriptInput {
            content: body.content.as_deref(),
            owner: body.owner.as_deref(),
            filename: body.filename.as_deref(),
            description: body.description.as_deref(),
        })
        .map_err(|e| ctx.error_response(e.into()))?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_scripts(
    State(state): State<AppState>,
    ctx: RequestContext,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<ScriptList>> {
    let Query(query) = query.map_err(|e| rejected(&ctx, e.body_text()))?;
    let request = PageRequest::new(
        query.page,
        query.limit,
        state.default_page_size,
        state.max_page_size,
    );

    let page = state.repository().list(request);
    Ok(Json(ScriptList {
        scripts: page.items,
        page: page.page,
        limit: page.limit,
        total: page.total,
    }))
}

async fn view_script(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<ScriptSummary>> {
    let Path(id) = id.map_err(|e| rejected(&ctx, e.body_text()))?;
    let summary = state
        .repository()
        .get_metadata(&id)
        .map_err(|e| ctx.error_response(e.into()))?;
    Ok(Json(summary))
}

async fn raw_script(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: Result<Path<String>, PathRejection>,
    query: Result<Query<RawQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Path(id) = id.map_err(|e| rejected(&ctx, e.body_text()))?;
    let Query(query) = query.map_err(|e| rejected(&ctx, e.body_text()))?;
    let raw = state
        .repository()
        .get_raw(&id, query.user.as_deref())
        .map_err(|e| ctx.error_response(e.into()))?;

    Ok((
        [(header::CONTENT_TYPE, with_charset(raw.content_type))],
        raw.content,
    )
        .into_response())
}

async fn edit_script(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: Result<Path<String>, PathRejection>,
    query: Result<Query<OwnerQuery>, QueryRejection>,
) -> ApiResult<Json<ScriptRecord>> {
    let Path(id) = id.map_err(|e| rejected(&ctx, e.body_text()))?;
    let Query(query) = query.map_err(|e| rejected(&ctx, e.body_text()))?;
    let record = state
        .repository()
        .get_for_edit(&id, query.owner.as_deref().unwrap_or_default())
        .map_err(|e| ctx.error_response(e.into()))?;
    Ok(Json(record))
}

async fn update_script(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: Result<Path<String>, PathRejection>,
    payload: Result<JsonOrForm<UpdateScriptRequest>, AppError>,
) -> ApiResult<Json<ScriptRecord>> {
    let Path(id) = id.map_err(|e| rejected(&ctx, e.body_text()))?;
    let JsonOrForm(body) = payload.map_err(|e| ctx.error_response(e))?;

    let record = state
        .repository()
        .update(
            &id,
            body.owner.as_deref().unwrap_or_default(),
            ScriptChanges {
                content: body.content.as_deref(),
                filename: body.filename.as_deref(),
                description: body.description.as_deref(),
            },
        )
        .map_err(|e| ctx.error_response(e.into()))?;
    Ok(Json(record))
}

async fn delete_script(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: Result<Path<String>, PathRejection>,
    query: Result<Query<OwnerQuery>, QueryRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id.map_err(|e| rejected(&ctx, e.body_text()))?;
    let Query(query) = query.map_err(|e| rejected(&ctx, e.body_text()))?;
    state
        .repository()
        .delete(&id, query.owner.as_deref().unwrap_or_default())
        .map_err(|e| ctx.error_response(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn not_found(ctx: RequestContext) -> ErrorResponse {
    errors::not_found(&ctx.path, &ctx.method, &ctx.request_id)
}

/// Raw content is served as UTF-8 text.
fn with_charset(content_type: &str) -> String {
    format!("{}; charset=utf-8", content_type)
}

/// The panic payload carries no request data, so the body has no path,
/// method or request id. The client still gets its id from the
/// `x-request-id` header, set by the outer middleware.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Request handler panicked: {}", detail);

    errors::internal_server_error("unknown", "unknown", "unknown").into_response()
}
