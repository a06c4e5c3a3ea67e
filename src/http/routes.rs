use axum::{
    extract::State,
    http::{header, HeaderMap, Uri},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::error::RestError;
use crate::feed::{util::http_date, FeedBuilder, FeedRequest};
use crate::http::warmup::{run_all, WarmUp};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<FeedBuilder>,
    pub warm_ups: Arc<Vec<Arc<dyn WarmUp>>>,
}

impl AppState {
    pub fn new(feed: FeedBuilder, warm_ups: Vec<Arc<dyn WarmUp>>) -> Self {
        Self {
            feed: Arc::new(feed),
            warm_ups: Arc::new(warm_ups),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/feed", get(feed))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn feed(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, RestError> {
    info!("feed request received");
    run_all(&state.warm_ups).await?;

    let request = FeedRequest {
        path: uri.path().to_string(),
        secure: is_secure(&headers, state.feed.settings().secure_links),
    };
    let feed = state.feed.build(&request).await?;

    Ok((
        [
            (header::CONTENT_TYPE, feed.content_type.to_string()),
            (header::LAST_MODIFIED, http_date(&feed.last_modified)),
        ],
        feed.body,
    )
        .into_response())
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Scheme from a TLS-terminating proxy, falling back to the configured default.
fn is_secure(headers: &HeaderMap, default: bool) -> bool {
    headers
        .get(FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok())
        .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::FixtureStore;
    use crate::config::FeedSettings;
    use crate::feed::{comment::NoComments, render::NodeRenderer, ContentAssembler, FeedVariant, NoopFragmentCache};
    use axum::body::Body;
    use axum::http::{HeaderValue, Request, StatusCode};
    use tower::ServiceExt;

    fn state() -> AppState {
        let settings = FeedSettings::for_variant(FeedVariant::YandexTurbo);
        let assembler = ContentAssembler::new(Arc::new(NodeRenderer), Arc::new(NoComments), 5);
        let builder = FeedBuilder::new(
            Arc::new(settings),
            Arc::new(FixtureStore::bundled().unwrap()),
            assembler,
            Arc::new(NoopFragmentCache),
        );
        AppState::new(builder, Vec::new())
    }

    #[test]
    fn test_is_secure() {
        let mut headers = HeaderMap::new();
        assert!(is_secure(&headers, true));
        assert!(!is_secure(&headers, false));

        headers.insert(FORWARDED_PROTO, HeaderValue::from_static("http"));
        assert!(!is_secure(&headers, true));
        headers.insert(FORWARDED_PROTO, HeaderValue::from_static("HTTPS"));
        assert!(is_secure(&headers, false));
    }

    #[tokio::test]
    async fn test_plain_http_links() {
        let request = Request::builder()
            .uri("/feed")
            .header(FORWARDED_PROTO, "http")
            .body(Body::empty())
            .unwrap();
        let response = router(state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("<link>http://test.ru/dacha-here-seller-abroad/?utm_source=rss</link>"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let request = Request::builder().uri("/rss").body(Body::empty()).unwrap();
        let response = router(state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
