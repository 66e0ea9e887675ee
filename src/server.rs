/// HTTP server setup and routing
use crate::{
    context::AppContext,
    error::{VaultError, VaultResult},
    metrics,
};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, Method},
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Build the main application router
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::RANGE, header::IF_NONE_MATCH]);

    let body_limit = ctx.config.body_limit();

    Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(crate::api::routes())
        .fallback(not_found)
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Prometheus scrape endpoint
async fn metrics_handler(State(ctx): State<AppContext>) -> impl IntoResponse {
    metrics::set_uptime(ctx.uptime_seconds());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}

/// 404 handler
async fn not_found() -> VaultError {
    VaultError::NotFound("Endpoint not found".to_string())
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> VaultResult<()> {
    let addr = ctx.bind_address();

    info!("hashvault listening on {}", addr);
    info!("   Storage: {}", ctx.config.storage.directory.display());
    info!(
        "   Format:  {} ({})",
        ctx.config.storage.format.extension(),
        ctx.config.storage.format.content_type()
    );

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| VaultError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| VaultError::Internal(format!("Server error: {}", e)))?;

    info!("hashvault stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blob_store::{
            memory::MemoryBlobBackend, normalize::fixtures, BlobStore, BlobStoreConfig, Digest,
            OutputFormat, PassthroughNormalizer, UploadResponse,
        },
        config::ServerConfig,
        error::ErrorResponse,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use base64::{engine::general_purpose::STANDARD, Engine};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn passthrough_app(max_upload_bytes: usize) -> Router {
        let mut config = ServerConfig::default();
        config.storage.format = OutputFormat::Png;
        config.storage.max_upload_bytes = max_upload_bytes;

        let store = BlobStore::with_parts(
            BlobStoreConfig {
                root: config.storage.directory.clone(),
                format: OutputFormat::Png,
                max_upload_bytes,
            },
            Arc::new(MemoryBlobBackend::new()),
            Arc::new(PassthroughNormalizer),
        );
        build_router(AppContext::with_store(config, Arc::new(store)))
    }

    fn upload_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn upload(app: &Router, raw: &[u8]) -> String {
        let response = app
            .clone()
            .oneshot(upload_request(serde_json::json!({ "data": STANDARD.encode(raw) })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        read_json::<UploadResponse>(response).await.hash
    }

    #[tokio::test]
    async fn test_upload_then_fetch() {
        let app = passthrough_app(1024);
        let hash = upload(&app, b"blob bytes").await;
        assert_eq!(hash, Digest::of(b"blob bytes").to_string());

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/{}.png", hash))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(response.headers()[header::ETAG], format!("\"{}\"", hash));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"blob bytes");
    }

    #[tokio::test]
    async fn test_upload_missing_data() {
        let app = passthrough_app(1024);

        for body in [serde_json::json!({}), serde_json::json!({ "data": "" })] {
            let response = app.clone().oneshot(upload_request(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let error: ErrorResponse = read_json(response).await;
            assert_eq!(error.error, "MissingInput");
        }
    }

    #[tokio::test]
    async fn test_upload_non_json_body() {
        let app = passthrough_app(1024);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .body(Body::from("data=abc"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_over_limit() {
        let app = passthrough_app(8);
        let response = app
            .oneshot(upload_request(
                serde_json::json!({ "data": STANDARD.encode([1u8; 9]) }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.error, "PayloadTooLarge");
    }

    #[tokio::test]
    async fn test_upload_body_over_transport_limit() {
        let app = passthrough_app(8);
        let huge = "A".repeat(200 * 1024);
        let response = app
            .oneshot(upload_request(serde_json::json!({ "data": huge })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.error, "PayloadTooLarge");
        assert!(error.message.starts_with("Request body exceeds limit"));
    }

    #[tokio::test]
    async fn test_upload_invalid_base64() {
        let app = passthrough_app(1024);
        let response = app
            .oneshot(upload_request(serde_json::json!({ "data": "%%%not-base64%%%" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.error, "InvalidImage");
    }

    #[tokio::test]
    async fn test_fetch_malformed_and_unknown() {
        let app = passthrough_app(1024);

        let cases = [
            ("/ABCDEF.png", StatusCode::BAD_REQUEST),
            ("/abcdef.webp", StatusCode::BAD_REQUEST),
            ("/..%2Fsecret.png", StatusCode::BAD_REQUEST),
            ("/.png", StatusCode::BAD_REQUEST),
            ("/abcdef.png", StatusCode::NOT_FOUND),
        ];

        for (uri, expected) in cases {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), expected, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_head_returns_headers_without_body() {
        let app = passthrough_app(1024);
        let hash = upload(&app, b"head me").await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("HEAD")
                    .uri(format!("/{}.png", hash))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "7");
        assert_eq!(response.headers()[header::ETAG], format!("\"{}\"", hash));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_conditional_and_range_requests() {
        let app = passthrough_app(1024);
        let hash = upload(&app, b"0123456789").await;
        let uri = format!("/{}.png", hash);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(&uri)
                    .header(header::IF_NONE_MATCH, format!("\"{}\"", hash))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(&uri)
                    .header(header::RANGE, "bytes=2-4")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 2-4/10");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"234");
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let app = passthrough_app(1024);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "https://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = passthrough_app(1024);
        upload(&app, b"counted").await;

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("blob_uploads_total"));
    }

    #[tokio::test]
    async fn test_example_scenario_with_image_normalizer() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::default();
        config.storage.directory = dir.path().to_path_buf();
        let ctx = AppContext::new(config).await.unwrap();
        let app = build_router(ctx);

        let png = fixtures::transparent_pixel_png();
        let payload = format!("data:image/png;base64,{}", STANDARD.encode(&png));

        let response = app
            .clone()
            .oneshot(upload_request(serde_json::json!({ "data": payload })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let hash = read_json::<UploadResponse>(response).await.hash;
        assert_eq!(hash.len(), 64);
        assert!(hash.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/{}.webp", hash))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/webp");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(!body.is_empty());
        assert_eq!(Digest::of(&body).to_string(), hash);

        // Plain base64 without the data URI yields the same digest
        let again = upload(&app, &png).await;
        assert_eq!(again, hash);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
