//! Router tests against stub providers and an in-memory store

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use contentforge_core::Result;
use contentforge_core::auth::AuthClient;
use contentforge_core::config::{Config, SupabaseCredentials};
use contentforge_core::generate::Generator;
use contentforge_core::prompt::TextPrompt;
use contentforge_core::providers::{
    GeneratedImage, ImageJob, ImageProvider, ProviderKind, ProviderRegistry, TextOptions,
    TextProvider,
};
use contentforge_core::storage::{
    GenerationStore, SqliteGenerationStore, SupabaseGenerationStore,
};
use contentforge_core::Error;
use contentforge_server::{AppState, build_router};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{header as header_is, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Echoes the user prompt back and returns a tiny PNG
struct EchoProvider;

#[async_trait]
impl TextProvider for EchoProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HuggingFace
    }

    async fn generate_text(&self, prompt: &TextPrompt, _: &TextOptions) -> Result<String> {
        Ok(format!(" Echo: {} ", prompt.user))
    }
}

#[async_trait]
impl ImageProvider for EchoProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HuggingFace
    }

    async fn generate_image(&self, _: &ImageJob) -> Result<GeneratedImage> {
        Ok(GeneratedImage {
            bytes: vec![0x89, b'P', b'N', b'G'],
            mime_type: "image/png".to_string(),
        })
    }
}

/// Always reports a cold model
struct LoadingProvider;

#[async_trait]
impl TextProvider for LoadingProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn generate_text(&self, _: &TextPrompt, _: &TextOptions) -> Result<String> {
        Err(Error::ModelLoading { retry_after: 20 })
    }
}

fn router(config: Config, store: Arc<dyn GenerationStore>, auth: Option<AuthClient>) -> Router {
    let mut registry = ProviderRegistry::new();
    registry.register_text(Arc::new(EchoProvider));
    registry.register_image(Arc::new(EchoProvider));
    registry.register_text(Arc::new(LoadingProvider));

    let generator = Generator::new(registry, &config);
    build_router(AppState::new(generator, store, auth, &config))
}

async fn app_with(config: Config, auth: Option<AuthClient>) -> Router {
    let store = SqliteGenerationStore::in_memory().await.unwrap();
    router(config, Arc::new(store), auth)
}

/// Nothing listens on port 1
fn dead_supabase() -> SupabaseCredentials {
    SupabaseCredentials {
        url: "http://127.0.0.1:1".to_string(),
        anon_key: "anon".to_string(),
    }
}

async fn app() -> Router {
    app_with(Config::default(), None).await
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health_reports_storage_and_providers() {
    let (status, body) = send(&app().await, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "sqlite");
    assert_eq!(body["providers"]["image"], json!(["huggingface"]));
}

#[tokio::test]
async fn test_templates_catalog() {
    let (status, body) = send(&app().await, get("/api/templates")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"].as_array().unwrap().len(), 4);
    assert_eq!(body["image"][0]["key"], "social-media");
}

#[tokio::test]
async fn test_generate_text() {
    let (status, body) = send(
        &app().await,
        post_json(
            "/api/generate-text",
            json!({"prompt": "Spring launch", "template": "marketing"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"text": "Echo: Spring launch"}));
}

#[tokio::test]
async fn test_generate_text_rejects_bad_input() {
    let app = app().await;

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/generate-text")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request body: Could not parse JSON");

    let (status, body) = send(&app, post_json("/api/generate-text", json!({"prompt": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Valid prompt is required");

    let untyped = Request::builder()
        .method("POST")
        .uri("/api/generate-text")
        .body(Body::from(r#"{"prompt":"hi"}"#))
        .unwrap();
    let (status, _) = send(&app, untyped).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_body_over_limit_is_rejected() {
    let app = app().await;
    let limit = Config::default().server.body_limit_bytes;

    let prompt = "a".repeat(limit + 1024);
    let (status, body) = send(
        &app,
        post_json("/api/generate-text", json!({ "prompt": prompt })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "Request body too large");

    // Large but within the limit still parses
    let prompt = "a".repeat(limit / 2);
    let (status, _) = send(
        &app,
        post_json("/api/generate-text", json!({ "prompt": prompt })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_provider_key_is_server_error() {
    let (status, body) = send(
        &app().await,
        post_json(
            "/api/generate-text",
            json!({"prompt": "hello", "provider": "mistral"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Server configuration error: API key not found");
}

#[tokio::test]
async fn test_model_loading_returns_retry_after() {
    let (status, body) = send(
        &app().await,
        post_json(
            "/api/generate-text",
            json!({"prompt": "hello", "provider": "gemini"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["retryAfter"], 20);
}

#[tokio::test]
async fn test_generate_image_returns_data_url() {
    let (status, body) = send(
        &app().await,
        post_json(
            "/api/generate-image",
            json!({"prompt": "a harbor at dawn", "style": "Vibrant", "complexity": 70}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        body["imageUrl"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,")
    );
}

#[tokio::test]
async fn test_generate_image_with_text_only_provider() {
    let (status, _) = send(
        &app().await,
        post_json(
            "/api/generate-image",
            json!({"prompt": "x", "provider": "mistral"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_gallery_crud() {
    let app = app().await;

    let (status, created) = send(
        &app,
        post_json(
            "/api/generations",
            json!({
                "type": "text",
                "prompt": "Spring launch",
                "output": "Copy",
                "template": "marketing"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    send(
        &app,
        post_json(
            "/api/generations",
            json!({"type": "image", "prompt": "harbor", "output": "data:image/png;base64,AA=="}),
        ),
    )
    .await;

    let (status, all) = send(&app, get("/api/generations")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, texts) = send(&app, get("/api/generations?type=text")).await;
    assert_eq!(texts.as_array().unwrap().len(), 1);
    assert_eq!(texts[0]["template"], "marketing");

    let (status, one) = send(&app, get(&format!("/api/generations/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["prompt"], "Spring launch");

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/generations/{}", id))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, delete).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": id, "deleted": true}));

    let (status, body) = send(&app, get(&format!("/api/generations/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Generation not found");
}

#[tokio::test]
async fn test_gallery_rejects_invalid_records() {
    let app = app().await;

    let (status, _) = send(
        &app,
        post_json(
            "/api/generations",
            json!({"type": "image", "prompt": "x", "output": "y", "complexity": 140}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/generations?type=video")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unreachable_storage_is_server_error() {
    let store = SupabaseGenerationStore::new(&dead_supabase()).unwrap();
    let app = router(Config::default(), Arc::new(store), None);

    let (status, body) = send(&app, get("/api/generations")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to access storage");
}

#[tokio::test]
async fn test_unreachable_auth_is_not_reported_as_ai_failure() {
    let auth = AuthClient::new(&dead_supabase()).unwrap();
    let mut config = Config::default();
    config.auth.require_auth = true;
    let app = app_with(config, Some(auth)).await;

    let request = Request::builder()
        .uri("/api/generations")
        .header(header::AUTHORIZATION, "Bearer t1")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Failed to connect to auth service");
}

#[tokio::test]
async fn test_auth_routes_without_supabase() {
    let (status, _) = send(
        &app().await,
        post_json("/api/auth/sign-in", json!({"email": "a@b.c", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_require_auth_checks_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header_is("authorization", "Bearer good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "u1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header_is("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "invalid JWT"})))
        .mount(&server)
        .await;

    let auth = AuthClient::new(&SupabaseCredentials {
        url: server.uri(),
        anon_key: "anon".to_string(),
    })
    .unwrap();
    let mut config = Config::default();
    config.auth.require_auth = true;
    let app = app_with(config, Some(auth)).await;

    let (status, body) = send(&app, get("/api/generations")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");

    let stale = Request::builder()
        .uri("/api/generations")
        .header(header::AUTHORIZATION, "Bearer stale")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, stale).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid JWT");

    let good = Request::builder()
        .uri("/api/generations")
        .header(header::AUTHORIZATION, "Bearer good")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, good).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    // Public routes stay open
    let (status, _) = send(&app, get("/api/templates")).await;
    assert_eq!(status, StatusCode::OK);
}
