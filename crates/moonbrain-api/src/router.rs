//! Route table and middleware stack.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::extractors::MakeRequestUuidV7;
use crate::handlers::{auth, health, notes, tags};
use crate::state::AppState;

/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Moonbrain API",
        description = "Publish, search, and link notes"
    ),
    paths(
        health::health_check,
        notes::list_notes,
        notes::get_note,
        notes::create_note,
        notes::update_note,
        notes::bulk_upsert_notes,
        notes::note_graph,
        tags::list_tags,
        auth::github_login,
        auth::github_callback,
        auth::logout,
        auth::create_token,
        auth::delete_token,
        auth::verify,
        auth::list_api_tokens,
    ),
    components(schemas(
        moonbrain_core::PublicNote,
        moonbrain_core::PublicUser,
        moonbrain_core::NoteMeta,
        moonbrain_core::NoteHeading,
        moonbrain_core::NoteLink,
        moonbrain_core::UpsertNoteRequest,
        moonbrain_core::Pagination,
        moonbrain_core::ApiToken,
        moonbrain_core::NoteGraph,
        moonbrain_core::GraphNoteNode,
        moonbrain_core::GraphNoteLink,
        notes::BulkUpsertSummary,
        auth::LoginRedirect,
        auth::DeleteTokenRequest,
    )),
    tags(
        (name = "Notes", description = "Note publishing and retrieval"),
        (name = "Tags", description = "Global tag set"),
        (name = "Auth", description = "GitHub login, sessions, and API tokens"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let v1 = Router::new()
        .route("/notes", get(notes::list_notes).post(notes::create_note))
        .route("/notes/bulk-upsert", put(notes::bulk_upsert_notes))
        .route("/notes/graph", get(notes::note_graph))
        .route("/notes/:id", get(notes::get_note).put(notes::update_note))
        .route("/tags", get(tags::list_tags))
        .route("/auth/github/login", get(auth::github_login))
        .route("/auth/github/callback", get(auth::github_callback))
        .route("/auth/logout", get(auth::logout))
        .route(
            "/auth/token",
            post(auth::create_token).delete(auth::delete_token),
        )
        .route("/auth/verify", get(auth::verify))
        .route("/auth/api-tokens", get(auth::list_api_tokens));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/v1", v1)
        .nest_service("/media", ServeDir::new(&config.media_path))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(config.cors_origins()))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(std::time::Duration::from_secs(3600)),
        )
        // Multipart uploads are bounded by the outer limit instead.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .with_state(state)
}
