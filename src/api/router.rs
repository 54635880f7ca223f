use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use super::admin;
use super::health;
use super::middleware::{logging_middleware, metrics_middleware};
use super::state::AppState;
use super::v1;

/// Create the full router with application state
pub fn create_router_with_state(state: AppState) -> Router {
    Router::new()
        // Health endpoints (no state needed)
        .route("/health", get(health::health_check))
        .route("/live", get(health::live_check))
        // Search API
        .nest("/v1", v1::create_v1_router())
        // Cache and rate limit introspection
        .merge(admin::create_admin_router())
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::extract::ConnectInfo;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::api::middleware::CallerPolicy;
    use crate::domain::rate_limit::RateLimitConfig;
    use crate::infrastructure::services::{SearchService, SearchServiceConfig};
    use crate::infrastructure::source::InMemoryCandidateSource;

    fn app_with(config: SearchServiceConfig) -> Router {
        let service =
            SearchService::init(config, Arc::new(InMemoryCandidateSource::sample())).unwrap();
        create_router_with_state(AppState::new(service))
    }

    fn limited_app(max_requests: u32, policy: CallerPolicy) -> Router {
        let config = SearchServiceConfig::default()
            .with_rate_limit(RateLimitConfig::new(max_requests, Duration::from_secs(60)));
        let service =
            SearchService::init(config, Arc::new(InMemoryCandidateSource::sample())).unwrap();
        create_router_with_state(AppState::new(service).with_caller_policy(policy))
    }

    /// A search for a distinct term from `peer`, carrying per-request spoofable headers
    fn search_from(peer: &str, i: usize) -> Request<Body> {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/v1/search")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-account-id", format!("rotating-{}", i))
            .header("x-forwarded-for", format!("198.51.100.{}", i))
            .header("x-real-ip", format!("203.0.113.{}", i))
            .body(Body::from(json!({ "term": format!("term {}", i) }).to_string()))
            .unwrap();
        let addr: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    fn app() -> Router {
        app_with(SearchServiceConfig::default())
    }

    fn search_request(body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/v1/search")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-account-id", "acct-1")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn vet_near_downtown() -> Value {
        json!({
            "term": "vet",
            "location": { "latitude": 39.7684, "longitude": -86.1581 },
            "sortByDistance": true
        })
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = app();

        let response = app.clone().oneshot(request(Method::GET, "/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");

        let response = app.oneshot(request(Method::GET, "/live")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_search_miss_then_hit() {
        let app = app();

        let response = app
            .clone()
            .oneshot(search_request(vet_near_downtown()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let first = body_json(response).await;
        assert_eq!(first["fromCache"], false);
        assert_eq!(first["results"].as_array().unwrap().len(), 3);
        assert_eq!(first["results"][0]["id"], "svc-1");
        assert!(first["results"][2].get("distance").is_none());

        let response = app
            .oneshot(search_request(vet_near_downtown()))
            .await
            .unwrap();
        let second = body_json(response).await;
        assert_eq!(second["fromCache"], true);
        assert_eq!(second["fingerprint"], first["fingerprint"]);
        assert_eq!(second["results"], first["results"]);
    }

    #[tokio::test]
    async fn test_rate_limited_search_returns_429() {
        let config = SearchServiceConfig::default()
            .with_rate_limit(RateLimitConfig::new(1, Duration::from_secs(60)));
        let app = app_with(config);

        let response = app
            .clone()
            .oneshot(search_request(json!({ "term": "vet" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(search_request(json!({ "term": "bowl" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry: u64 = response.headers()[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=60).contains(&retry));

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "rate_limited");
        assert_eq!(json["retryAfter"], retry);
    }

    #[tokio::test]
    async fn test_rotating_headers_do_not_escape_the_limit() {
        let app = limited_app(10, CallerPolicy::default());

        for i in 0..10 {
            let response = app
                .clone()
                .oneshot(search_from("192.0.2.10:40000", i))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .clone()
            .oneshot(search_from("192.0.2.10:40001", 10))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        // Another peer still has its own budget
        let response = app
            .clone()
            .oneshot(search_from("192.0.2.99:40000", 11))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(request(Method::GET, "/rate-limit/stats"))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"]["trackedIdentities"], 2);
    }

    #[tokio::test]
    async fn test_trusted_account_header_separates_callers() {
        let policy = CallerPolicy {
            trust_proxy_headers: false,
            trust_account_header: true,
        };
        let app = limited_app(1, policy);

        for i in 0..3 {
            let response = app
                .clone()
                .oneshot(search_from("192.0.2.10:40000", i))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_invalid_query_returns_400() {
        let response = app()
            .oneshot(search_request(json!({
                "term": "vet",
                "location": { "latitude": 91.0, "longitude": 0.0 }
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "invalid_query");
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/search")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert!(response.status().is_client_error());
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "json_parse_error");
    }

    #[tokio::test]
    async fn test_cache_stats_and_clear() {
        let app = app();
        app.clone()
            .oneshot(search_request(vet_near_downtown()))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/cache/stats"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["entries"], 1);
        assert_eq!(json["data"]["misses"], 1);
        assert_eq!(json["data"]["cacheType"], "memory");

        let response = app
            .clone()
            .oneshot(request(Method::DELETE, "/cache/stats"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert!(json["message"].is_string());

        let response = app
            .oneshot(request(Method::GET, "/cache/stats"))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"]["entries"], 0);
        assert_eq!(json["data"]["hits"], 0);
    }

    #[tokio::test]
    async fn test_cache_entries_and_invalidation() {
        let app = app();
        let response = app
            .clone()
            .oneshot(search_request(vet_near_downtown()))
            .await
            .unwrap();
        let fingerprint = body_json(response).await["fingerprint"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/cache/entries"))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 1);

        let uri = format!("/cache/entries/{}", fingerprint);
        let response = app
            .clone()
            .oneshot(request(Method::DELETE, &uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(request(Method::DELETE, &uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["code"], "not_found");
    }

    #[tokio::test]
    async fn test_rate_limit_stats() {
        let app = app();
        app.clone()
            .oneshot(search_request(json!({ "term": "vet" })))
            .await
            .unwrap();

        let response = app
            .oneshot(request(Method::GET, "/rate-limit/stats"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["enabled"], true);
        assert_eq!(json["data"]["maxRequests"], 10);
        assert_eq!(json["data"]["windowSecs"], 60);
        assert_eq!(json["data"]["trackedIdentities"], 1);
    }
}
