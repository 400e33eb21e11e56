use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Domain rules: who sees what, how listings are composed and paged.
pub mod clock;
pub mod pagination;
pub mod policy;
pub mod query;

// Application services and components.
pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;

// Routing split by access level (Public, Authenticated).
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use clock::{Clock, ClockState, FixedClock, SystemClock};
pub use config::AppConfig;
pub use errors::{AppError, AppResult};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for every handler annotated with `#[utoipa::path]`, served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::listings::index, handlers::listings::category_posts,
        handlers::posts::post_detail, handlers::posts::comment_from_detail,
        handlers::posts::create_post_form, handlers::posts::create_post,
        handlers::posts::edit_post_form, handlers::posts::edit_post,
        handlers::posts::delete_post_confirm, handlers::posts::delete_post,
        handlers::comments::add_comment, handlers::comments::edit_comment_form,
        handlers::comments::edit_comment, handlers::comments::delete_comment_confirm,
        handlers::comments::delete_comment,
        handlers::profiles::profile, handlers::profiles::edit_profile_form,
        handlers::profiles::edit_profile,
        handlers::uploads::get_presigned_url
    ),
    components(
        schemas(
            models::Location, models::Category, models::Post, models::PostSummary,
            models::Comment, models::Profile, models::PostForm, models::CommentForm,
            models::ProfileForm, models::PresignedUrlRequest, models::PresignedUrlResponse,
            models::PostListView, models::PostDetailView, pagination::PageMeta,
        )
    ),
    tags(
        (name = "blog", description = "Blog API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The services shared by every request. Handlers pull only what they need
/// through the `FromRef` impls below.
#[derive(Clone)]
pub struct AppState {
    /// Persistence, behind a trait so tests can run without Postgres.
    pub repo: RepositoryState,
    /// Image storage (S3/MinIO, or the mock).
    pub storage: StorageState,
    /// The "now" every visibility decision is made against.
    pub clock: ClockState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for ClockState {
    fn from_ref(app_state: &AppState) -> ClockState {
        app_state.clock.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated routes. Extracting `AuthUser` resolves the session
/// (local bypass header or bearer token, then user lookup) and rejects the
/// request with 401 before the handler runs when that fails.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routes, the auth layer, the observability stack and CORS.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Same paths as some public routes (`/posts/{id}/`); the method routers merge
        // and only the authenticated methods carry the layer.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with the `x-request-id` so every log line
/// of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
