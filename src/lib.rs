use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware::from_fn_with_state,
};
use std::sync::Arc;
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

// Security core: tokens, principal and permission model, request interceptors.
pub mod auth;
pub mod middleware;
pub mod token;

// Login entry point and its collaborators.
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repository;

// Access rule table, split by permission tier (Public, Authenticated, Admin).
pub mod routes;
use routes::{AuthorizationTable, authenticated, public};
use token::TokenCodec;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use password::{BcryptPasswordVerifier, PasswordState};
pub use repository::{InMemoryUserRepository, PostgresUserRepository, RepositoryState};

/// Shared handle to the process-wide token codec.
pub type TokenState = Arc<TokenCodec>;

/// Shared handle to the immutable rule table.
pub type TableState = Arc<AuthorizationTable>;

/// ApiDoc
///
/// OpenAPI document for the endpoints served by this crate, published at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::login, handlers::get_me),
    components(
        schemas(
            models::LoginRequest, models::TokenResponse, error::ErrorResponse,
            auth::Principal, auth::Role,
        )
    ),
    tags(
        (name = "student-api", description = "Student API authentication")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, cloneable container of everything a request may need. Every field
/// is built once in `main` and only read afterwards.
#[derive(Clone)]
pub struct AppState {
    /// Account lookup used by the login entry point.
    pub repo: RepositoryState,
    /// Password hash verification used by the login entry point.
    pub passwords: PasswordState,
    /// Issues and validates access tokens.
    pub codec: TokenState,
    /// Ordered (method, pattern) → permission rules.
    pub table: TableState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    /// new
    ///
    /// Assembles the state from its collaborators, building the rule table.
    pub fn new(
        repo: RepositoryState,
        passwords: PasswordState,
        codec: TokenCodec,
        config: AppConfig,
    ) -> Self {
        Self {
            repo,
            passwords,
            codec: Arc::new(codec),
            table: Arc::new(AuthorizationTable::build()),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for TokenState {
    fn from_ref(app_state: &AppState) -> TokenState {
        app_state.codec.clone()
    }
}

impl FromRef<AppState> for TableState {
    fn from_ref(app_state: &AppState) -> TableState {
        app_state.table.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application: the crate's own endpoints plus `business_routes`
/// supplied by the embedding application, all behind the two security
/// middlewares, with observability and CORS outermost.
///
/// Security order per request: `authenticate` (token → principal, or 401), then
/// `authorize` (rule lookup and decision, 401/403), then the handler. The layers
/// wrap the fallback as well, so unknown paths get the default rule.
pub fn create_router(state: AppState, business_routes: Router<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .merge(business_routes)
        // Layers added later run first: authenticate wraps authorize.
        .layer(from_fn_with_state(state.clone(), middleware::authorize))
        .layer(from_fn_with_state(state.clone(), middleware::authenticate))
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
/// Span for `TraceLayer`, correlating every log line of a request through its
/// `x-request-id`.
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
