use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use thiserror::Error;
use topiko::core_modules::translations::{categories, labels};
use topiko::core_modules::utils::map_raster::map_raster;
use topiko::{Language, PublishedView, TopikoError, ViewMode, ViewRequest};
use tracing::{debug, warn};

use crate::AppState;
use crate::api::{CategoryItem, DirectoryQuery, ListingsResponse, MapResponse, QueryError, RasterQuery};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    BadQuery(#[from] QueryError),

    #[error(transparent)]
    Directory(#[from] TopikoError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::Directory(TopikoError::CoordinatorClosed) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("Request failed: {self}");
        }
        (status, self.to_string()).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/labels", get(ui_labels))
        .route("/api/categories", get(category_list))
        .route("/api/listings", get(listings))
        .route("/api/map", get(map))
        .route("/api/refresh", post(refresh))
        .route("/api/reload", post(reload))
        .route("/map.png", get(map_png))
        .route("/ws/map", get(map_feed))
        .with_state(state)
}

async fn ui_labels(Query(query): Query<DirectoryQuery>) -> Result<Response, ApiError> {
    Ok(Json(labels(query.language()?)).into_response())
}

async fn category_list(Query(query): Query<DirectoryQuery>) -> Result<Response, ApiError> {
    let language = query.language()?;
    let items: Vec<CategoryItem> = categories().iter().map(|c| CategoryItem::new(c, language)).collect();
    Ok(Json(items).into_response())
}

async fn listings(State(state): State<AppState>, Query(query): Query<DirectoryQuery>) -> Result<Response, ApiError> {
    let language = query.language()?;
    let request = query.to_request(ViewMode::List)?;
    let view = state.coordinator.compute(request).await?;
    let notice = state.coordinator.notice().await;
    Ok(Json(ListingsResponse::new(&view, notice, language)).into_response())
}

async fn map(State(state): State<AppState>, Query(query): Query<DirectoryQuery>) -> Result<Response, ApiError> {
    let language = query.language()?;
    let request = query.to_request(ViewMode::Map)?;
    let view = state.coordinator.compute(request).await?;
    let notice = state.coordinator.notice().await;
    let bounds = state.coordinator.pipeline().bounds();
    Ok(Json(MapResponse::new(&view, bounds, notice, language)).into_response())
}

/// Recomputes the shared map view and pushes it to every `/ws/map` client.
async fn refresh(
    State(state): State<AppState>,
    Query(query): Query<DirectoryQuery>,
    Json(request): Json<ViewRequest>,
) -> Result<Response, ApiError> {
    let language = query.language()?;
    let request = ViewRequest {
        mode: ViewMode::Map,
        ..request
    };
    let published = state.coordinator.refresh(request).await?;
    Ok(refresh_response(&state, published, language))
}

fn refresh_response(state: &AppState, published: Option<PublishedView>, language: Language) -> Response {
    match published {
        Some(published) => {
            let bounds = state.coordinator.pipeline().bounds();
            let response = MapResponse::new(&published.view, bounds, published.notice, language)
                .with_generation(published.generation);
            Json(response).into_response()
        }
        // A newer refresh already won.
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Re-reads listings and the location provider.
async fn reload(State(state): State<AppState>) -> Result<Response, ApiError> {
    let applied = state.coordinator.reload_listings().await?;
    let location = state.coordinator.refresh_location().await;
    let rows = state.coordinator.listings().await.len();
    Ok(Json(json!({
        "applied": applied,
        "listings": rows,
        "location_known": location.is_some(),
    }))
    .into_response())
}

async fn map_png(
    State(state): State<AppState>,
    Query(query): Query<DirectoryQuery>,
    Query(raster): Query<RasterQuery>,
) -> Result<Response, ApiError> {
    let request = query.to_request(ViewMode::Map)?;
    let view = state.coordinator.compute(request).await?;
    let (width, height) = raster.dimensions();
    let canvas = map_raster::render(&view.map_points, state.coordinator.pipeline().bounds(), width, height);
    let bytes = map_raster::encode_png(&canvas)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}

async fn map_feed(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Response, ApiError> {
    let language = query.language()?;
    Ok(ws.on_upgrade(move |socket| stream_maps(socket, state, language)))
}

async fn stream_maps(socket: WebSocket, state: AppState, language: Language) {
    use futures_util::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    let mut updates = state.coordinator.subscribe();
    // Send whatever is already published straight away.
    updates.mark_changed();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(published) = updates.borrow_and_update().clone() else {
                    continue;
                };
                let bounds = state.coordinator.pipeline().bounds();
                let payload = MapResponse::new(&published.view, bounds, published.notice, language)
                    .with_generation(published.generation);
                let text = match serde_json::to_string(&payload) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Could not serialize map update: {e}");
                        continue;
                    }
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("Map feed client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_coordinator;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::sync::Arc;
    use topiko::error::LocationError;
    use topiko::sources::NoLocation;
    use topiko::{DirectoryPipeline, PipelineConfig};
    use tower::ServiceExt;

    async fn state() -> AppState {
        let pipeline = Arc::new(DirectoryPipeline::new(PipelineConfig::default()).expect("default config is valid"));
        let coordinator = build_coordinator(pipeline, None, Arc::new(NoLocation(LocationError::Unsupported)))
            .expect("sample store always builds");
        coordinator.reload_listings().await.expect("open");
        AppState {
            coordinator: Arc::new(coordinator),
        }
    }

    async fn app() -> Router {
        router(state().await)
    }

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).expect("valid request"))
            .await
            .expect("router is infallible")
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("readable body");
        serde_json::from_slice(&bytes).expect("JSON body")
    }

    #[tokio::test]
    async fn healthz_answers_ok() {
        let response = get(app().await, "/healthz").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_near_and_lang_are_bad_requests() {
        let app = app().await;
        let bad_near = get(app.clone(), "/api/listings?near=athens").await;
        assert_eq!(bad_near.status(), StatusCode::BAD_REQUEST);

        let bad_lang = get(app.clone(), "/api/categories?lang=fr").await;
        assert_eq!(bad_lang.status(), StatusCode::BAD_REQUEST);

        let bad_map = get(app, "/map.png?near=91,nope").await;
        assert_eq!(bad_map.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn listings_are_paginated_and_flag_sample_data() {
        let response = get(app().await, "/api/listings?near=me&lang=gr").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["current_page"], 1);
        assert_eq!(body["location_prompt"], labels(Language::Gr).location_prompt);
        assert_eq!(body["notice"], labels(Language::Gr).sample_data_unconfigured);
        assert!(!body["entries"].as_array().expect("entries array").is_empty());
    }

    #[tokio::test]
    async fn map_png_is_served_as_png() {
        let response = get(app().await, "/map.png?width=64&height=48").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("image/png")
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("readable body");
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[tokio::test]
    async fn refresh_publishes_a_map_generation() {
        let response = app()
            .await
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/refresh")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"filter": {"categories": ["2"]}}"#))
                    .expect("valid request"),
            )
            .await
            .expect("router is infallible");
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["generation"], 1);
        assert_eq!(body["total_matches"], 2);
    }

    #[tokio::test]
    async fn superseded_refresh_is_no_content() {
        let response = refresh_response(&state().await, None, Language::En);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(QueryError::Near("x".into())).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(TopikoError::CoordinatorClosed).into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(TopikoError::Store("down".into())).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
