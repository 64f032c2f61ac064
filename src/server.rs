use std::io::Read;
use std::sync::Arc;

use anyhow::anyhow;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chat::{ChatAssistant, ChatRequest};
use crate::error::ApiError;
use crate::insight::InsightService;
use crate::models::{AnalysisEnvelope, WorkloadInput};
use crate::scoring::WorkloadScorer;

const MAX_BODY_BYTES: u64 = 64 * 1024;
const ACCEPT_QUEUE: usize = 64;

/// Collaborators built once at startup and shared read-only by every request.
pub struct AppState {
    pub scorer: WorkloadScorer,
    pub insight: InsightService,
    pub chat: ChatAssistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body: Some(body),
        }
    }

    fn empty() -> Self {
        Self {
            status: 200,
            body: None,
        }
    }

    fn from_error(err: &ApiError) -> Self {
        Self {
            status: err.status_code(),
            body: Some(err.to_body()),
        }
    }
}

pub fn health() -> Value {
    json!({ "status": "healthy", "app": "LoadCheck" })
}

/// Dispatch one request. Transport-free so it can be driven directly from tests.
pub async fn route(state: &AppState, method: &str, url: &str, body: &str) -> ApiResponse {
    let path = url.split('?').next().unwrap_or(url);

    if method.eq_ignore_ascii_case("OPTIONS") {
        return ApiResponse::empty();
    }

    let result = match (path, method.to_ascii_uppercase().as_str()) {
        ("/health", "GET") => Ok(health()),
        ("/analyze", "POST") => analyze(state, body).await,
        ("/chat", "POST") => chat(state, body).await,
        ("/health" | "/analyze" | "/chat", _) => Err(ApiError::MethodNotAllowed),
        _ => Err(ApiError::NotFound),
    };

    match result {
        Ok(body) => ApiResponse::ok(body),
        Err(err) => ApiResponse::from_error(&err),
    }
}

fn parse_object(body: &str) -> Result<Value, ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::bad_request("No data provided"));
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|err| ApiError::bad_request(format!("Invalid JSON payload: {err}")))?;

    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Err(ApiError::bad_request("No data provided")),
        _ => Err(ApiError::bad_request("Request body must be a JSON object")),
    }
}

async fn analyze(state: &AppState, body: &str) -> Result<Value, ApiError> {
    let payload = parse_object(body)?;
    let input: WorkloadInput = serde_json::from_value(payload)
        .map_err(|err| ApiError::bad_request(format!("Invalid workload data: {err}")))?;

    let mut analysis = state.scorer.analyze(&input);
    analysis.ai_message = state.insight.tip(&input, &analysis).await;

    info!(
        target: "loadcheck::server",
        total_score = analysis.total_score,
        risk_level = %analysis.risk_level,
        subjects = input.subjects.len(),
        exams = input.exams.len(),
        projects = input.projects.len(),
        "workload analyzed"
    );

    serde_json::to_value(AnalysisEnvelope::ok(analysis))
        .map_err(|err| ApiError::Internal(err.to_string()))
}

async fn chat(state: &AppState, body: &str) -> Result<Value, ApiError> {
    let payload = parse_object(body)?;
    let request: ChatRequest = serde_json::from_value(payload)
        .map_err(|err| ApiError::bad_request(format!("Invalid chat request: {err}")))?;

    let message = request
        .message
        .as_deref()
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .ok_or_else(|| ApiError::bad_request("Message is required"))?;

    let reply = state
        .chat
        .reply(message, request.context.as_ref())
        .await
        .map_err(|err| ApiError::upstream("Failed to get AI response", err))?;

    Ok(json!({ "success": true, "reply": reply }))
}

fn response_headers() -> Vec<tiny_http::Header> {
    [
        ("Content-Type", "application/json"),
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
        ("Access-Control-Allow-Headers", "Content-Type"),
    ]
    .into_iter()
    .filter_map(|(name, value)| {
        tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
    })
    .collect()
}

/// Blocking accept loop: reads each request body and hands it to the async side.
fn accept_loop(server: tiny_http::Server, tx: mpsc::Sender<(tiny_http::Request, String)>) {
    for mut request in server.incoming_requests() {
        let mut body = String::new();
        if let Err(err) = request
            .as_reader()
            .take(MAX_BODY_BYTES)
            .read_to_string(&mut body)
        {
            debug!(target: "loadcheck::server", error = %err, "unreadable request body");
            body.clear();
        }

        if tx.blocking_send((request, body)).is_err() {
            break;
        }
    }
}

async fn handle(state: Arc<AppState>, request: tiny_http::Request, body: String) {
    let method = request.method().to_string();
    let url = request.url().to_string();
    let response = route(&state, &method, &url, &body).await;

    debug!(
        target: "loadcheck::server",
        %method,
        %url,
        status = response.status,
        "request handled"
    );

    let payload = response
        .body
        .map(|value| value.to_string())
        .unwrap_or_default();
    let mut reply =
        tiny_http::Response::from_data(payload.into_bytes()).with_status_code(response.status);
    for header in response_headers() {
        reply.add_header(header);
    }

    let sent = tokio::task::spawn_blocking(move || request.respond(reply)).await;
    match sent {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            warn!(target: "loadcheck::server", error = %err, "failed to write response")
        }
        Err(err) => warn!(target: "loadcheck::server", error = %err, "response task failed"),
    }
}

pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let server = tiny_http::Server::http(addr)
        .map_err(|err| anyhow!("failed to bind {addr}: {err}"))?;
    info!(target: "loadcheck::server", %addr, "LoadCheck listening");

    let (tx, mut rx) = mpsc::channel(ACCEPT_QUEUE);
    let acceptor = tokio::task::spawn_blocking(move || accept_loop(server, tx));

    while let Some((request, body)) = rx.recv().await {
        tokio::spawn(handle(Arc::clone(&state), request, body));
    }

    acceptor.await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InsightError;
    use crate::insight::{ChatMessage, InsightProvider, FALLBACK_TIP};
    use async_trait::async_trait;
    use std::time::Duration;

    struct DownProvider;

    #[async_trait]
    impl InsightProvider for DownProvider {
        async fn complete(&self, _: &[ChatMessage], _: u32) -> Result<String, InsightError> {
            Err(InsightError::Timeout(5))
        }
    }

    struct CannedProvider;

    #[async_trait]
    impl InsightProvider for CannedProvider {
        async fn complete(&self, _: &[ChatMessage], _: u32) -> Result<String, InsightError> {
            Ok("Try a 25-minute focus block.".to_string())
        }
    }

    fn state_with(provider: Arc<dyn InsightProvider>) -> AppState {
        AppState {
            scorer: WorkloadScorer::new(),
            insight: InsightService::new(Arc::clone(&provider), Duration::from_secs(1)),
            chat: ChatAssistant::new(provider),
        }
    }

    #[tokio::test]
    async fn health_reports_status() {
        let state = state_with(Arc::new(CannedProvider));
        let response = route(&state, "GET", "/health", "").await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body, Some(health()));
    }

    #[tokio::test]
    async fn analyze_survives_insight_failure() {
        let state = state_with(Arc::new(DownProvider));
        let response = route(&state, "POST", "/analyze", r#"{"sleep_hours": 8}"#).await;

        assert_eq!(response.status, 200);
        let body = response.body.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["analysis"]["ai_message"], FALLBACK_TIP);
        assert_eq!(body["analysis"]["total_score"], 0.0);
        assert_eq!(body["analysis"]["risk_level"], "low");
        assert_eq!(body["analysis"]["causes"][0], "Workload is manageable");
    }

    #[tokio::test]
    async fn analyze_reports_full_shape() {
        let state = state_with(Arc::new(CannedProvider));
        let payload = r#"{
            "subjects": [{"name": "Math", "hours_per_week": 12}],
            "exams": [{"name": "Chem", "date": "not-a-date", "difficulty": "hard"}],
            "sleep_hours": 5
        }"#;
        let response = route(&state, "POST", "/analyze?debug=1", payload).await;

        let analysis = &response.body.unwrap()["analysis"];
        assert_eq!(analysis["breakdown"]["homework"], 18.0);
        assert_eq!(analysis["breakdown"]["sleep_deficit"], 15.0);
        assert_eq!(analysis["breakdown"]["exams"], 0.0);
        assert_eq!(analysis["breakdown"]["deadline_clustering"], 0.0);
        assert_eq!(analysis["total_score"], 33.0);
        assert_eq!(analysis["risk_level"], "medium");
        assert_eq!(analysis["ai_message"], "Try a 25-minute focus block.");
        assert!(analysis["summary"].as_str().unwrap().contains("elevated"));
        assert!(analysis["recommendations"][0]["action"].is_string());
    }

    #[tokio::test]
    async fn analyze_rejects_absent_payload() {
        let state = state_with(Arc::new(CannedProvider));

        for body in ["", "null", "[1, 2]", "{not json"] {
            let response = route(&state, "POST", "/analyze", body).await;
            assert_eq!(response.status, 400, "body {body:?}");
            let body = response.body.unwrap();
            assert_eq!(body["success"], false);
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn chat_requires_message() {
        let state = state_with(Arc::new(CannedProvider));
        let response = route(&state, "POST", "/chat", r#"{"message": "  "}"#).await;
        assert_eq!(response.status, 400);
        assert_eq!(response.body.unwrap()["error"], "Message is required");
    }

    #[tokio::test]
    async fn chat_returns_reply() {
        let state = state_with(Arc::new(CannedProvider));
        let response = route(&state, "POST", "/chat", r#"{"message": "Any tips?"}"#).await;
        assert_eq!(response.status, 200);
        let body = response.body.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["reply"], "Try a 25-minute focus block.");
    }

    #[tokio::test]
    async fn chat_surfaces_provider_failure() {
        let state = state_with(Arc::new(DownProvider));
        let response = route(&state, "POST", "/chat", r#"{"message": "Any tips?"}"#).await;
        assert_eq!(response.status, 500);
        let body = response.body.unwrap();
        assert_eq!(body["error"], "Failed to get AI response");
        assert_eq!(body["details"], "request timed out after 5s");
    }

    #[tokio::test]
    async fn unknown_routes_and_methods() {
        let state = state_with(Arc::new(CannedProvider));
        assert_eq!(route(&state, "GET", "/analyze", "").await.status, 405);
        assert_eq!(route(&state, "GET", "/missing", "").await.status, 404);

        let preflight = route(&state, "OPTIONS", "/analyze", "").await;
        assert_eq!(preflight.status, 200);
        assert_eq!(preflight.body, None);
    }

    #[test]
    fn responses_carry_cors_headers() {
        let headers = response_headers();
        assert_eq!(headers.len(), 4);
        assert!(headers
            .iter()
            .any(|header| header.field.equiv("Access-Control-Allow-Origin")));
    }
}
