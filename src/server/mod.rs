mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use self::state::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health_handler,
        api::process_card_handler,
        api::similar_cards_handler,
        api::counter_cards_handler,
    ),
    components(schemas(
        types::ProcessCardForm,
        types::CardResponse,
        types::CardSummaryResponse,
        types::ErrorResponse,
    ))
)]
pub struct ApiDoc;

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api::health_handler))
        .route("/process_card", post(api::process_card_handler))
        .route("/get_similar_cards/{card_name}", get(api::similar_cards_handler))
        .route("/get_counter_cards/{card_name}", get(api::counter_cards_handler))
        .route("/metrics", get(api::metrics_handler))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        // 上传限制：10M
        .layer(RequestBodyLimitLayer::new(1024 * 1024 * 10))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::catalog::tests::sample_catalog;
    use crate::embedding::EmbeddingStore;
    use crate::pipeline::PipelineBuilder;

    fn app(uploads: &std::path::Path) -> Router {
        let store = EmbeddingStore::from_entries([
            ("Black Lotus".to_string(), vec![1.0, 0.0]),
            ("Mox Sapphire".to_string(), vec![0.0, 1.0]),
        ])
        .unwrap();
        let pipeline = PipelineBuilder::new(sample_catalog(), store).build();
        create_app(AppState::new(pipeline, uploads.to_path_buf(), 5))
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/",
            "/process_card",
            "/get_similar_cards/{card_name}",
            "/get_counter_cards/{card_name}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let response = app(dir.path()).oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("\"status\""));
    }

    #[tokio::test]
    async fn test_similar_then_metrics() {
        let dir = TempDir::new().unwrap();
        let app = app(dir.path());

        let response =
            app.clone().oneshot(get("/get_similar_cards/black%20lotus")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_text(response).await,
            r#"[{"name":"Mox Sapphire","image_uri_normal":"http://x/ms.png"}]"#
        );

        let response = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("card_request_count"));
        assert!(text.contains(r#"endpoint="/get_similar_cards""#));
        assert!(text.contains("card_similar_duration"));
    }

    #[tokio::test]
    async fn test_counter_failure_is_server_error() {
        let dir = TempDir::new().unwrap();
        let response = app(dir.path()).oneshot(get("/get_counter_cards/Black%20Lotus")).await;
        let response = response.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("no suggestions from the external service"));
    }

    #[tokio::test]
    async fn test_upload_non_image() {
        let dir = TempDir::new().unwrap();
        let body = "--X\r\n\
            Content-Disposition: form-data; name=\"image\"; filename=\"card.txt\"\r\n\
            Content-Type: text/plain\r\n\r\n\
            hello\r\n\
            --X--\r\n";
        let request = Request::post("/process_card")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=X")
            .body(Body::from(body))
            .unwrap();
        let response = app(dir.path()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, r#"{"detail":"Uploaded file is not an image."}"#);
    }
}
