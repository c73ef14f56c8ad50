use axum::{
    extract::{ws::WebSocketUpgrade, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use domain::Username;
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::ApiError, hub_connection::HubConnection, state::AppState};

#[derive(Debug, Deserialize)]
struct HubQuery {
    /// WebSocket 无法携带 Authorization 头，/hubs 下的路径从查询参数读取 token
    access_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct OnlineUsersResponse {
    usernames: Vec<Username>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .route("/hubs/presence", get(presence_hub))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new().route("/presence/online", get(online_users))
}

/// 根据配置的来源列表构建 CORS 层；`*` 表示任意来源（此时不允许携带凭据）
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    if origins.iter().any(|origin| origin == "*") {
        return base.allow_origin(AllowOrigin::any());
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(origin = %origin, error = %err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn online_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<OnlineUsersResponse>, ApiError> {
    state.jwt_service.extract_user_from_headers(&headers)?;
    let usernames = state.presence.online_users().await?;
    Ok(Json(OnlineUsersResponse { usernames }))
}

async fn presence_hub(
    State(state): State<AppState>,
    Query(query): Query<HubQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let token = query
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Missing access token"))?;
    let username = state.jwt_service.authenticate(&token)?;

    Ok(ws.on_upgrade(move |socket| async move {
        match HubConnection::open(socket, state, username).await {
            Ok(connection) => connection.run().await,
            Err(err) => tracing::error!(error = ?err, "Hub 连接建立失败"),
        }
    }))
}
