use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use marquee_common::Config;
use marquee_graph::{GraphClient, MovieReader, RecommendationService};

mod suggest;
mod templates;
use suggest::suggest;
use templates::*;

// --- App State ---

struct AppState {
    service: Arc<RecommendationService>,
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("marquee=info".parse()?))
        .init();

    let config = Config::web_from_env()?;
    config.log_redacted();

    let client =
        GraphClient::connect(&config.neo4j_uri, &config.neo4j_user, &config.neo4j_password)
            .await?;

    let service = Arc::new(RecommendationService::new(
        Arc::new(MovieReader::new(client)),
        config.title_cache_ttl,
        config.query_cache_ttl,
    ));
    match service.warm().await {
        Ok(n) => info!(titles = n, "Title cache warmed"),
        Err(e) => warn!(error = %e, "Title cache warm-up failed, loading on first request"),
    }

    let app = build_router(service);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("Marquee web server starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(service: Arc<RecommendationService>) -> Router {
    let state = Arc::new(AppState { service });

    Router::new()
        .route("/", get(index_page))
        .route("/recommend", get(recommend_page))
        .route("/api/suggest", get(api_suggest))
        .route("/api/recommendations", get(api_recommendations))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        // Method + path only; titles in the query string stay out of the logs
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

// --- Handlers ---

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Deserialize)]
struct TitleQuery {
    title: Option<String>,
}

impl TitleQuery {
    fn title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

async fn index_page(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Response {
    let query = params.q.as_deref().unwrap_or("");
    if query.trim().is_empty() {
        return Html(render_index(None, &[])).into_response();
    }

    match state.service.titles().await {
        Ok(snap) => {
            let suggestions = suggest(query, &snap.titles);
            Html(render_index(Some(query), &suggestions)).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Failed to load titles");
            server_error_page("Could not load movie titles.")
        }
    }
}

async fn recommend_page(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TitleQuery>,
) -> Response {
    let Some(title) = params.title() else {
        return Redirect::to("/").into_response();
    };

    match state.service.recommend(title).await {
        Ok(recs) => Html(render_recommendations(&recs)).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to load recommendations");
            server_error_page("Could not load recommendations.")
        }
    }
}

async fn api_suggest(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Response {
    let query = params.q.unwrap_or_default();
    match state.service.titles().await {
        Ok(snap) => Json(suggest(&query, &snap.titles)).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to load titles");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to load titles")
        }
    }
}

async fn api_recommendations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TitleQuery>,
) -> Response {
    let Some(title) = params.title() else {
        return json_error(StatusCode::BAD_REQUEST, "title is required");
    };

    match state.service.recommend(title).await {
        Ok(recs) => Json(recs).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to load recommendations");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to load recommendations")
        }
    }
}

async fn healthz(State(state): State<Arc<AppState>>) -> Response {
    match state.service.counts().await {
        Ok(counts) => Json(counts).into_response(),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "graph unavailable")
        }
    }
}

fn server_error_page(message: &str) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Html(render_error(message))).into_response()
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        [(header::CACHE_CONTROL, "no-store")],
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}
