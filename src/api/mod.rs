// src/api/mod.rs — HTTP surface for the consent frontend and status polling

pub mod handlers;
pub mod types;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::core::{PurgeService, TaskRunner};
use crate::infra::config::ApiConfig;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<PurgeService>,
    pub runner: Arc<TaskRunner>,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(allowed)
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: ApiState, config: &ApiConfig) -> Router {
    Router::new()
        .route("/api/v1/auth", post(handlers::begin_auth))
        .route("/api/v1/callback", post(handlers::complete_auth))
        .route("/api/v1/process", post(handlers::start_processing))
        .route("/api/v1/status", get(handlers::get_status))
        .route("/api/v1/health", get(handlers::health))
        .layer(cors_layer(&config.cors_origins))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn start_server(
    config: &ApiConfig,
    state: ApiState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.bind, config.port);
    let router = build_router(state, config);

    tracing::info!("API server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::{Session, SessionStatus};
    use crate::infra::config::Config;
    use crate::oauth::TokenPair;
    use crate::store::{MemoryStore, SessionStore};
    use crate::upstream::{HttpResponse, MockHttpTransport};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.oauth.consumer_key = Some("ck".into());
        config.oauth.consumer_secret = Some("cs".into());
        config
    }

    fn app(transport: MockHttpTransport, store: Arc<MemoryStore>) -> Router {
        let config = test_config();
        let runner = Arc::new(TaskRunner::new());
        let service = PurgeService::new(&config, Arc::new(transport), store, runner.clone()).unwrap();
        build_router(
            ApiState {
                service: Arc::new(service),
                runner,
            },
            &config.api,
        )
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = app(MockHttpTransport::new(), Arc::new(MemoryStore::new()));
        let req = Request::builder()
            .uri("/api/v1/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_auth_with_empty_body_returns_url_and_session() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_execute()
            .returning(|_| Ok(HttpResponse::new(200, "oauth_token=rt&oauth_token_secret=rts")));

        let store = Arc::new(MemoryStore::new());
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/auth")
            .body(Body::empty())
            .unwrap();
        let resp = app(transport, store.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert!(json["authUrl"].as_str().unwrap().ends_with("oauth_token=rt"));
        let session_id = json["sessionId"].as_str().unwrap();
        assert!(store.get(session_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_callback_missing_verifier_is_bad_request() {
        let app = app(MockHttpTransport::new(), Arc::new(MemoryStore::new()));
        let req = post_json(
            "/api/v1/callback",
            serde_json::json!({"oauthToken": "rt", "sessionId": "s"}),
        );
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await["error"]
            .as_str()
            .unwrap()
            .contains("oauthVerifier"));
    }

    #[tokio::test]
    async fn test_callback_token_mismatch_is_forbidden() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::pending(TokenPair::new("rt", "rts"));
        let id = session.id.clone();
        store.create(session).await.unwrap();

        let req = post_json(
            "/api/v1/callback",
            serde_json::json!({"oauthToken": "other", "oauthVerifier": "v", "sessionId": id}),
        );
        let resp = app(MockHttpTransport::new(), store.clone())
            .oneshot(req)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            store.get(&id).await.unwrap().unwrap().status,
            SessionStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_process_requires_authenticated_session() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::pending(TokenPair::new("rt", "rts"));
        let id = session.id.clone();
        store.create(session).await.unwrap();

        let req = post_json("/api/v1/process", serde_json::json!({ "sessionId": id }));
        let resp = app(MockHttpTransport::new(), store).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_process_body_errors_come_back_as_json() {
        let router = app(MockHttpTransport::new(), Arc::new(MemoryStore::new()));

        // No content type, no body
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/process")
            .body(Body::empty())
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await["error"]
            .as_str()
            .unwrap()
            .contains("sessionId"));

        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/process")
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request body"));

        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/callback")
            .body(Body::from("{\"oauthToken\": 7}"))
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_status_projection_and_not_found() {
        let store = Arc::new(MemoryStore::new());
        let mut session = Session::pending(TokenPair::new("rt", "rts"));
        session.status = SessionStatus::Processing;
        session.access_token = Some(TokenPair::new("at", "hidden-secret"));
        session.total_items = 20;
        session.processed_items = 10;
        let id = session.id.clone();
        store.create(session).await.unwrap();

        let router = app(MockHttpTransport::new(), store);
        let req = Request::builder()
            .uri(format!("/api/v1/status?sessionId={id}"))
            .body(Body::empty())
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "processing");
        assert_eq!(json["progress"]["percentage"], 50);
        assert!(!json.to_string().contains("hidden-secret"));

        let req = Request::builder()
            .uri("/api/v1/status?sessionId=ghost")
            .body(Body::empty())
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = Request::builder()
            .uri("/api/v1/status")
            .body(Body::empty())
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
