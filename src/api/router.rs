//! Claim intake API router.
//!
//! Returns a composable `Router` with all routes nested under `/api/`.
//! The CORS layer admits the configured reviewer frontend origin.

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Upload bodies may carry up to `MAX_FILES` files of 8 MB each, plus
/// multipart framing.
const MAX_BODY_BYTES: usize = 90 * 1024 * 1024;

/// Build the claim intake router.
pub fn api_router(ctx: ApiContext, cors_origin: &str) -> Router {
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            tracing::warn!(cors_origin, "Invalid CORS origin — falling back to permissive");
            CorsLayer::permissive()
        }
    };

    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/upload", post(endpoints::upload::upload))
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors);

    Router::new().nest("/api", routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use crate::extraction::MockExtractor;
    use crate::pipeline::BatchProcessor;
    use crate::providers::{MockEmbedder, MockGenerator};
    use crate::vector::InMemoryVectorStore;

    const RISK_JSON: &str =
        r#"{"fraud_risk": "low", "reasons": ["consistent history"], "verification_needed": false}"#;

    const VALIDATION_TEXT: &str =
        "1. Yes.\n2. Yes.\n3. Yes.\n4. Yes.\n5. Yes.\n6. No.\n\nRecommendation: APPROVE";

    fn test_app() -> Router {
        let generator = MockGenerator::with_responses(vec![
            VALIDATION_TEXT.to_string(),
            RISK_JSON.to_string(),
        ])
        .with_chat_response("1. Patient Background: ...");

        let processor = BatchProcessor::new(
            Arc::new(MockExtractor::new()),
            Arc::new(generator),
            Arc::new(MockEmbedder::new()),
            Arc::new(InMemoryVectorStore::new()),
        );
        let ctx = ApiContext::new(Arc::new(processor), CancellationToken::new());
        api_router(ctx, "http://localhost:3000")
    }

    const BOUNDARY: &str = "claim-test-boundary";

    /// Hand-built multipart body: one part per (filename, content) pair.
    fn multipart_body(parts: &[(&str, &str)]) -> String {
        let mut body = String::new();
        for (filename, content) in parts {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    fn upload_request(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn response_json(response: axum::http::Response<Body>) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_response_shape() {
        let app = test_app();
        let req = Request::builder()
            .method("GET")
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert!(!json["version"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn not_found_for_unknown_route() {
        let app = test_app();
        let req = Request::builder()
            .method("GET")
            .uri("/api/nonexistent")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_rejects_empty_batch() {
        let app = test_app();
        let response = app.oneshot(upload_request(multipart_body(&[]))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
        assert_eq!(json["error"]["message"], "No files in upload");
    }

    #[tokio::test]
    async fn upload_processes_eob_and_note() {
        let app = test_app();
        let body = multipart_body(&[
            ("eob.pdf", "eob:\nclaim_amount=14500\npolicy_number=POL9988776"),
            ("note.pdf", "note: Patient reports lower back pain."),
        ]);

        let response = app.oneshot(upload_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["status"], "processed");
        assert_eq!(json["data"]["stage"], "done");
        assert_eq!(json["data"]["document_count"], 2);
        assert!(json["data"]["validation"].is_object());
        assert!(json["data"]["fraud_risk"].is_object());
        assert!(json["data"]["summary"].is_string());
        assert_eq!(json["data"]["failed_files"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn upload_reports_partial_failure() {
        let app = test_app();
        let body = multipart_body(&[
            ("good.pdf", "eob:\npolicy_number=POL9988776"),
            ("bad.pdf", "fail: corrupt scan"),
        ]);

        let response = app.oneshot(upload_request(body)).await.unwrap();
        // Partial failure is still a 200 — the skip is reported in the body.
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["data"]["stage"], "partial_failure");
        assert_eq!(json["data"]["failed_files"][0]["filename"], "bad.pdf");
        assert!(json["message"].as_str().unwrap().contains("1 skipped"));
    }

    #[tokio::test]
    async fn upload_rejects_too_many_files() {
        let app = test_app();
        let parts: Vec<(String, String)> = (0..11)
            .map(|i| (format!("f{i}.pdf"), "note: text".to_string()))
            .collect();
        let refs: Vec<(&str, &str)> = parts
            .iter()
            .map(|(n, c)| (n.as_str(), c.as_str()))
            .collect();

        let response = app.oneshot(upload_request(multipart_body(&refs))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = response_json(response).await;
        assert!(json["error"]["message"].as_str().unwrap().contains("Maximum"));
    }

    #[tokio::test]
    async fn upload_ignores_non_file_fields() {
        let app = test_app();
        // One plain field (no filename) followed by one real file.
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"comment\"\r\n\r\nreviewer note\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"note.pdf\"\r\nContent-Type: application/pdf\r\n\r\nnote: Follow-up visit.\r\n--{BOUNDARY}--\r\n"
        );

        let response = app.oneshot(upload_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["data"]["document_count"], 1);
    }

    #[tokio::test]
    async fn cors_preflight_allows_configured_origin() {
        let app = test_app();
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/upload")
            .header("Origin", "http://localhost:3000")
            .header("Access-Control-Request-Method", "POST")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "http://localhost:3000"
        );
    }
}
