//! Axum router configuration with middleware.
//!
//! `/` and `/health` are public; every other route requires an API key.
//! Middleware: CORS, tracing.

use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::routing::{delete, get, post};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::http::handlers;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .route("/chat", post(handlers::chat::send_message))
        .route("/chat/history", get(handlers::chat::list_chats))
        .route("/chat/history/{chat_id}", get(handlers::chat::get_history))
        .route("/chat/delete/{chat_id}", delete(handlers::chat::delete_chat))
        .route(
            "/chat/{chat_id}/system-prompt",
            get(handlers::system_prompt::get_system_prompt)
                .put(handlers::system_prompt::set_system_prompt),
        )
        .route("/usage", get(handlers::usage::get_usage))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET / - Service name, version, and route index (no auth required).
async fn service_info() -> Json<ApiResponse<serde_json::Value>> {
    let start = Instant::now();
    let info = json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /chat",
            "GET /chat/history",
            "GET /chat/history/{chat_id}",
            "DELETE /chat/delete/{chat_id}",
            "GET /chat/{chat_id}/system-prompt",
            "PUT /chat/{chat_id}/system-prompt",
            "GET /usage",
            "GET /health",
        ],
    });
    Json(ApiResponse::success(
        info,
        Uuid::now_v7().to_string(),
        start.elapsed().as_millis() as u64,
    ))
}

/// GET /health - Liveness check (no auth required).
async fn health_check() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        json!({
            "status": "ok",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION"),
        }),
        Uuid::now_v7().to_string(),
        0,
    ))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use chatlayer_types::config::AppConfig;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::http::extractors::auth::user_id_for_key;

    const KEY: &str = "test-key";

    async fn test_state(llm_url: &str, requests_per_hour: u64) -> AppState {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_path_buf();
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);

        let mut config = AppConfig::default();
        config.auth.api_key = Some(KEY.to_string());
        config.llm.base_url = llm_url.to_string();
        config.rate_limit.requests_per_hour = requests_per_hour;
        AppState::from_config(config, data_dir).await.unwrap()
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {KEY}"));
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn ollama_reply(content: &str) -> String {
        json!({
            "model": "llama3.1:8b-instruct-q8_0",
            "message": {"role": "assistant", "content": content},
            "done": true,
            "prompt_eval_count": 20,
            "eval_count": 4
        })
        .to_string()
    }

    #[tokio::test]
    async fn health_and_root_need_no_key() {
        let router = build_router(test_state("http://127.0.0.1:9", 10).await);

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&router, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, body) = send(&router, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "chatlayer-api");
    }

    #[tokio::test]
    async fn missing_or_wrong_key_is_unauthorized() {
        let router = build_router(test_state("http://127.0.0.1:9", 10).await);

        let req = Request::builder()
            .uri("/chat/history")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&router, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["errors"][0]["code"], "UNAUTHORIZED");

        let req = Request::builder()
            .uri("/chat/history")
            .header("x-api-key", "wrong")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&router, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn chat_roundtrip_through_ollama() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ollama_reply("Paris."))
            .expect(1)
            .create_async()
            .await;
        let router = build_router(test_state(&server.url(), 10).await);

        let (status, body) = send(
            &router,
            request(
                "POST",
                "/chat",
                Some(json!({"message": "Capital of France?", "chat_id": "geo"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["response"], "Paris.");
        assert_eq!(body["data"]["chat_id"], "geo");
        mock.assert_async().await;

        let (status, body) = send(&router, request("GET", "/chat/history/geo", None)).await;
        assert_eq!(status, StatusCode::OK);
        let messages = body["data"]["history"]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["tokens_used"], 4);

        let (status, body) =
            send(&router, request("GET", "/chat/history/geo?limit=0", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["history"]["messages"].as_array().unwrap().is_empty());

        let (status, body) = send(&router, request("GET", "/chat/history", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["chats"][0]["title"], "Capital of France?");

        let (status, body) = send(&router, request("DELETE", "/chat/delete/geo", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["deleted"], 3);

        let (status, body) = send(&router, request("GET", "/chat/history/geo", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errors"][0]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn validation_errors() {
        let router = build_router(test_state("http://127.0.0.1:9", 10).await);

        let (status, body) = send(
            &router,
            request("POST", "/chat", Some(json!({"message": "hi", "chat_id": "bad id!"}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], "INVALID_CHAT_ID");

        let (status, body) = send(&router, request("POST", "/chat", Some(json!({"message": "  "})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], "VALIDATION_ERROR");

        let (status, body) = send(&router, request("POST", "/chat", Some(json!({"text": "hi"})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn llm_outage_is_bad_gateway() {
        let router = build_router(test_state("http://127.0.0.1:9", 10).await);
        let (status, body) = send(&router, request("POST", "/chat", Some(json!({"message": "hi"})))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["errors"][0]["code"], "LLM_ERROR");
    }

    #[tokio::test]
    async fn system_prompt_get_and_put() {
        let router = build_router(test_state("http://127.0.0.1:9", 10).await);

        let (status, _) = send(&router, request("GET", "/chat/c1/system-prompt", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &router,
            request("PUT", "/chat/c1/system-prompt", Some(json!({"prompt": "Be brief."}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["role"], "system");

        let (status, body) = send(&router, request("GET", "/chat/c1/system-prompt", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["content"], "Be brief.");
    }

    #[tokio::test]
    async fn rate_limit_rejects_after_ceiling() {
        let router = build_router(test_state("http://127.0.0.1:9", 2).await);

        for _ in 0..2 {
            let (status, _) = send(&router, request("GET", "/chat/history", None)).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, body) = send(&router, request("GET", "/chat/history", None)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["errors"][0]["code"], "RATE_LIMITED");
        assert_eq!(body["errors"][0]["details"]["limit"], 2);

        // Usage is budgeted separately and reports the history count.
        let (status, body) =
            send(&router, request("GET", "/usage?endpoint=history", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["usage"], 2);
        assert_eq!(body["data"]["remaining"], 0);
        assert_eq!(body["data"]["user_id"], user_id_for_key(KEY));
    }
}
