//! HTTP router. All routes are nested under `/api/`.
//!
//! Layers (outermost first): CORS → request tracing → body limit → handler.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Room for multipart boundaries and headers on top of the file itself, so
/// slightly oversized files reach upload validation and get a proper 413.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Build the API router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    let body_limit = ctx.pipeline.config().max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/extract", post(endpoints::extract::extract))
        .route("/test-extract", post(endpoints::extract::extract_text))
        .route("/analyze", post(endpoints::analyze::analyze))
        .route("/report/:id", get(endpoints::reports::detail))
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::analysis::ReportAnalyzer;
    use crate::config::ExtractionConfig;
    use crate::pipeline::extraction::MockPdfExtractor;
    use crate::pipeline::processor::LabReportPipeline;
    use crate::pipeline::structuring::{MockLlmClient, MockReply};
    use crate::store::{InMemoryReportStore, ReportRepository};

    const LAB_TEXT: &str = "Laboratorio Analisi Roma - 12/03/2024\n\
        Colesterolo LDL 160 mg/dL (v.n. < 130)\n\
        Glicemia 88 mg/dL (v.n. 70 - 110)\n\
        Emoglobina 13,1 g/dL (v.n. 12,0 - 16,0)";

    const EXTRACTION_RESPONSE: &str = r#"{
        "document_meta": {"lab_name": "Laboratorio Analisi Roma", "collection_date": "2024-03-12"},
        "analytes": [
            {"name": "Colesterolo LDL", "value": 160, "unit": "mg/dL", "ref_low": null, "ref_high": 130},
            {"name": "Glicemia", "value": 88, "unit": "mg/dL", "ref_low": 70, "ref_high": 110},
            {"name": "Emoglobina", "value": "13,1", "unit": "g/dL", "ref_low": "12,0", "ref_high": "16,0"}
        ]
    }"#;

    const ANALYSIS_RESPONSE: &str = r#"{
        "overall_summary": "One value above range.",
        "overall_score": 80,
        "flags": ["LDL above range"],
        "analytes": [
            {"name": "LDL", "value": 160, "unit": "mg/dL", "ref_high": 130, "status": "high"}
        ],
        "chart_series": [],
        "disclaimers": ["Educational only"]
    }"#;

    const BOUNDARY: &str = "X-BLOODWORK-TEST";

    struct TestApp {
        router: Router,
        store: Arc<InMemoryReportStore>,
    }

    fn test_app(llm: Arc<MockLlmClient>, dev_mode: bool) -> TestApp {
        let config = ExtractionConfig {
            retry_delay: Duration::ZERO,
            max_upload_bytes: 1024,
            ..ExtractionConfig::default()
        };
        let store = Arc::new(InMemoryReportStore::new());
        let pipeline = LabReportPipeline::new(
            llm.clone(),
            Arc::new(MockPdfExtractor::with_pages(&[LAB_TEXT])),
            Arc::new(MockPdfExtractor::with_pages(&[])),
            None,
            config.clone(),
        );
        let analyzer = ReportAnalyzer::new(llm, store.clone(), &config);
        let ctx = ApiContext::new(
            Arc::new(pipeline),
            Arc::new(analyzer),
            store.clone(),
            dev_mode,
        );
        TestApp {
            router: api_router(ctx),
            store,
        }
    }

    fn multipart_request(field: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"report.pdf\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/extract")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn analyze_body() -> Value {
        json!({
            "demographics": {"sex": "M", "birth_year": 1980, "height_cm": 178, "weight_kg": 82},
            "lab_results": [
                {"analyte": "LDL", "value": 160, "unit": "mg/dL", "ref_high": 130},
                {"analyte": "Glucose", "value": 88, "unit": "mg/dL", "ref_low": 70, "ref_high": 110}
            ]
        })
    }

    #[tokio::test]
    async fn health_reports_version() {
        let app = test_app(Arc::new(MockLlmClient::new("{}")), false);
        let (status, json) = send(&app.router, get_request("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], crate::config::APP_VERSION);
    }

    #[tokio::test]
    async fn extract_pdf_returns_normalized_analytes() {
        let llm = Arc::new(MockLlmClient::new(EXTRACTION_RESPONSE));
        let app = test_app(llm, false);

        let (status, json) = send(
            &app.router,
            multipart_request("file", "application/pdf", b"%PDF-1.4 mock"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["extraction_method"], "text_only");
        assert_eq!(json["document_meta"]["lab_name"], "Laboratorio Analisi Roma");
        let analytes = json["analytes"].as_array().unwrap();
        assert_eq!(analytes.len(), 3);
        assert_eq!(analytes[0]["name"], "LDL");
        assert_eq!(analytes[0]["status"], "high");
        assert_eq!(analytes[1]["name"], "Glucose");
        assert_eq!(analytes[2]["name"], "Hemoglobin");
        assert_eq!(analytes[2]["value"], 13.1);
        assert_eq!(analytes[2]["status"], "normal");
        assert_eq!(json["extraction_meta"]["extraction_quality"], "limited");
    }

    #[tokio::test]
    async fn extract_rejects_non_pdf() {
        let llm = Arc::new(MockLlmClient::new(EXTRACTION_RESPONSE));
        let app = test_app(llm.clone(), false);
        let (status, json) =
            send(&app.router, multipart_request("file", "image/png", b"\x89PNG")).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(json["error"], "Only PDF files are supported");
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn extract_requires_file_field() {
        let app = test_app(Arc::new(MockLlmClient::new("{}")), false);
        let (status, json) = send(
            &app.router,
            multipart_request("attachment", "application/pdf", b"%PDF"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No file provided");
    }

    #[tokio::test]
    async fn extract_rejects_oversized_upload() {
        let app = test_app(Arc::new(MockLlmClient::new("{}")), false);
        let big = vec![b'a'; 2048];
        let (status, _) = send(
            &app.router,
            multipart_request("file", "application/pdf", &big),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_extract_on_text() {
        let llm = Arc::new(MockLlmClient::new(EXTRACTION_RESPONSE));
        let app = test_app(llm, false);
        let (status, json) = send(
            &app.router,
            json_request("/api/test-extract", json!({ "text": LAB_TEXT })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["text_length"], LAB_TEXT.chars().count());
        assert_eq!(json["extracted_data"]["analytes"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_extract_requires_text() {
        let app = test_app(Arc::new(MockLlmClient::new("{}")), false);
        for body in [json!({}), json!({ "text": "   " })] {
            let (status, json) = send(&app.router, json_request("/api/test-extract", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["error"], "Text content required");
        }
    }

    #[tokio::test]
    async fn backend_outage_is_bad_gateway() {
        let llm = Arc::new(MockLlmClient::scripted(vec![MockReply::ConnectionError]));
        let app = test_app(llm.clone(), true);
        let (status, json) = send(
            &app.router,
            json_request("/api/test-extract", json!({ "text": LAB_TEXT })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(json["details"].is_string(), "dev mode exposes the cause");
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn analyze_then_fetch_report() {
        let llm = Arc::new(MockLlmClient::new(ANALYSIS_RESPONSE));
        let app = test_app(llm, false);

        let (status, json) = send(&app.router, json_request("/api/analyze", analyze_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        let report_id = json["report_id"].as_str().unwrap().to_string();
        let upload_id = json["upload_id"].as_str().unwrap().to_string();

        let (status, report) =
            send(&app.router, get_request(&format!("/api/report/{report_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["upload_id"], upload_id.as_str());
        assert_eq!(report["result_json"]["overall_score"], 80.0);
        let analytes = report["result_json"]["analytes"].as_array().unwrap();
        assert_eq!(analytes.len(), 2, "Glucose backfilled from the request");
        assert_eq!(analytes[1]["name"], "Glucose");
        assert_eq!(analytes[1]["status"], "normal");

        assert_eq!(app.store.list_uploads().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn analyze_rejects_invalid_demographics() {
        let llm = Arc::new(MockLlmClient::new(ANALYSIS_RESPONSE));
        let app = test_app(llm.clone(), false);
        let mut body = analyze_body();
        body["demographics"]["height_cm"] = json!(20);

        let (status, json) = send(&app.router, json_request("/api/analyze", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid input data");
        assert!(json["details"].as_str().unwrap().contains("height_cm"));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn analyze_rejects_unknown_sex() {
        let app = test_app(Arc::new(MockLlmClient::new(ANALYSIS_RESPONSE)), false);
        let mut body = analyze_body();
        body["demographics"]["sex"] = json!("Q");
        let (status, json) = send(&app.router, json_request("/api/analyze", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid input data");
    }

    #[tokio::test]
    async fn missing_report_is_404() {
        let app = test_app(Arc::new(MockLlmClient::new("{}")), false);
        for id in [uuid::Uuid::new_v4().to_string(), "not-a-uuid".to_string()] {
            let (status, json) =
                send(&app.router, get_request(&format!("/api/report/{id}"))).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(json, json!({ "error": "Report not found" }));
        }
    }
}
