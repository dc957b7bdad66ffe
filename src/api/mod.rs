//! HTTP API layer: operational endpoints and OpenAPI document.
//!
//! The gateway's real traffic is on the WebSocket; HTTP only exposes
//! service health.

pub mod handlers;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// OpenAPI document of the HTTP endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "roulette-gateway", description = "Realtime roulette gateway"),
    paths(handlers::system::health_handler),
    components(schemas(handlers::system::HealthResponse))
)]
pub struct ApiDoc;

/// Builds the HTTP router.
pub fn build_router() -> Router<AppState> {
    Router::new().merge(handlers::system::routes())
}

/// Builds the complete application: HTTP routes, `/ws`, Swagger UI (with
/// the `swagger-ui` feature) and the tracing and CORS layers.
pub fn build_app(state: AppState) -> Router {
    let router = Router::new()
        .merge(build_router())
        .route("/ws", get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
