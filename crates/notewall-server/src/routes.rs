//! HTTP handlers for the wall and the catalog proxy.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use cookie::CookieJar;
use notewall_catalog::extract_track_id;
use notewall_protocol::VisitorSession;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::ApiError;
use crate::message::{MessageView, PostMessageRequest};
use crate::state::AppState;
use crate::visitor::{jar_from_headers, with_cookies};

const MESSAGE_ID_LEN: usize = 36;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(api_health))
        .route("/api/session", get(api_session))
        .route(
            "/api/messages",
            get(api_messages)
                .post(api_post_message)
                .delete(api_delete_message),
        )
        .route("/api/catalog/search", get(api_catalog_search))
        .route("/api/catalog/resolve", get(api_catalog_resolve))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct RateLimitInfo {
    remaining: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    #[serde(flatten)]
    session: VisitorSession,
    rate_limit: RateLimitInfo,
}

async fn api_health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn api_session(State(app): State<AppState>, headers: HeaderMap) -> Response {
    let mut jar = jar_from_headers(&headers);
    let session = app.sessions.resolve_or_create(&mut jar);
    let decision = app.limiter.check(&session.identity);

    with_cookies(
        &jar,
        Json(SessionResponse {
            session,
            rate_limit: RateLimitInfo {
                remaining: decision.remaining,
            },
        }),
    )
}

async fn api_messages(
    State(app): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let jar = jar_from_headers(&headers);
    let visitor = app.sessions.resolve(&jar).map(|s| s.identity);

    let messages: Vec<MessageView> = app
        .store
        .list_recent()
        .await?
        .into_iter()
        .map(|m| MessageView::for_visitor(m, visitor.as_deref()))
        .collect();

    Ok(Json(json!({ "messages": messages, "visitorId": visitor })))
}

async fn api_post_message(State(app): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let mut jar = jar_from_headers(&headers);
    let session = app.sessions.resolve_or_create(&mut jar);
    // A freshly minted identity must reach the client even when the post fails.
    let result = post_message(&app, &mut jar, &session, &body).await;
    with_cookies(&jar, result)
}

async fn post_message(
    app: &AppState,
    jar: &mut CookieJar,
    session: &VisitorSession,
    body: &[u8],
) -> Result<impl IntoResponse, ApiError> {
    let decision = app.limiter.check(&session.identity);
    if !decision.allowed {
        tracing::debug!(retry_after_ms = ?decision.retry_after_ms, "Post rejected by rate limiter");
        return Err(ApiError::RateLimited(decision));
    }

    let request: PostMessageRequest = serde_json::from_slice(body)
        .map_err(|_| ApiError::BadRequest("Invalid JSON body".to_string()))?;
    let new = request.validate(&session.identity)?;
    let nickname = new.from_name.clone();

    let message = app.store.create(new).await?;
    app.limiter.record(&session.identity);
    app.sessions.set_nickname(jar, &nickname);

    let remaining = app.limiter.check(&session.identity).remaining;
    tracing::info!(id = %message.id, remaining, "Message posted");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": MessageView::for_visitor(message, Some(&session.identity)),
            "rateLimit": RateLimitInfo { remaining },
        })),
    ))
}

#[derive(Deserialize)]
struct DeleteQuery {
    id: Option<String>,
}

async fn api_delete_message(
    State(app): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let jar = jar_from_headers(&headers);
    let session = app.sessions.resolve(&jar).ok_or(ApiError::NoSession)?;

    let raw = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing required query parameter: id".to_string()))?;
    let id = parse_message_id(&raw)?;

    let existing = app.store.find(id).await?.ok_or(ApiError::NotFound("Message"))?;
    if existing.visitor_id.as_deref() != Some(session.identity.as_str()) {
        return Err(ApiError::Forbidden);
    }

    if !app.store.delete_owned(id, &session.identity).await? {
        // Removed by a concurrent request between lookup and delete.
        return Err(ApiError::NotFound("Message"));
    }
    tracing::info!(%id, "Message deleted");

    Ok(Json(json!({ "success": true, "deletedId": raw })))
}

/// Only the hyphenated form is accepted, in either case.
fn parse_message_id(raw: &str) -> Result<Uuid, ApiError> {
    let invalid = || ApiError::BadRequest("Invalid message ID format".to_string());
    if raw.len() != MESSAGE_ID_LEN {
        return Err(invalid());
    }
    Uuid::try_parse(raw).map_err(|_| invalid())
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
    limit: Option<String>,
}

async fn api_catalog_search(
    State(app): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing required query parameter: q".to_string()))?;
    // Non-numeric limits fall back to the default.
    let limit = query.limit.and_then(|l| l.trim().parse::<u32>().ok());

    let tracks = app.catalog.search_tracks(q, limit).await?;
    Ok(Json(json!({ "tracks": tracks })))
}

#[derive(Deserialize)]
struct ResolveQuery {
    input: Option<String>,
}

async fn api_catalog_resolve(
    State(app): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let track_id = query
        .input
        .as_deref()
        .and_then(extract_track_id)
        .ok_or_else(|| ApiError::BadRequest("Not a recognizable track link or id".to_string()))?;

    let track = app
        .catalog
        .get_track(&track_id)
        .await?
        .ok_or(ApiError::NotFound("Track"))?;
    Ok(Json(json!({ "track": track })))
}
