pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::metadata::MetadataStore;
use crate::services::storage::ObjectStorage;
use crate::services::upload::ProgressTracker;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use dashmap::DashMap;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::uploads::upload_papers,
        api::handlers::uploads::upload_progress,
        api::handlers::papers::list_papers,
        api::handlers::papers::download_paper,
        api::handlers::papers::set_favorite,
        api::handlers::papers::delete_paper,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            api::handlers::uploads::UploadBatchResponse,
            api::handlers::uploads::UploadOutcomeResponse,
            api::handlers::papers::PaperResponse,
            api::handlers::papers::SetFavoriteRequest,
            services::upload::SessionStatus,
            services::upload::TransferProgress,
        )
    ),
    tags(
        (name = "papers", description = "Paper catalog endpoints"),
        (name = "uploads", description = "Batch upload endpoints")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn ObjectStorage>,
    pub metadata: Arc<dyn MetadataStore>,
    pub config: AppConfig,
    /// Progress trackers of in-flight batches, keyed by session id.
    pub active_uploads: Arc<DashMap<String, Arc<ProgressTracker>>>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/api/papers/upload",
            post(api::handlers::uploads::upload_papers)
                .layer(axum::extract::DefaultBodyLimit::max(
                    state.config.policy.max_files * state.config.policy.max_file_size
                        + 10 * 1024 * 1024, // multipart overhead
                ))
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::auth_middleware,
                )),
        )
        .route(
            "/api/uploads/:session_id/progress",
            get(api::handlers::uploads::upload_progress).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .route(
            "/api/papers",
            get(api::handlers::papers::list_papers).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .route(
            "/api/papers/:id",
            axum::routing::delete(api::handlers::papers::delete_paper).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .route(
            "/api/papers/:id/download",
            get(api::handlers::papers::download_paper).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .route(
            "/api/papers/:id/favorite",
            put(api::handlers::papers::set_favorite).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .with_state(state)
}
