use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use code_runner::{
    CodeExecutionService, ExecutionOutcome, ExecutionRequest, FailureReason, LanguageInfo,
    RunnerConfig,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Runner error: {0}")]
    Runner(#[from] code_runner::Error),
    #[error("Server error: {0}")]
    ServerError(String),
}

/// Body of `POST /run`. Every field is optional on the wire so that missing
/// fields produce the uniform response shape instead of an extractor error.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RunRequest {
    pub code: Option<String>,
    pub language: Option<String>,
    pub input: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunResponse {
    pub output: String,
    pub error: String,
    pub success: bool,
}

impl RunResponse {
    fn rejected(error: String) -> Self {
        Self {
            output: String::new(),
            error,
            success: false,
        }
    }
}

impl From<&ExecutionOutcome> for RunResponse {
    fn from(outcome: &ExecutionOutcome) -> Self {
        Self {
            output: outcome.stdout.clone(),
            error: outcome.error_message(),
            success: outcome.succeeded,
        }
    }
}

/// HTTP status for a finished request
pub fn status_for(reason: Option<FailureReason>) -> StatusCode {
    match reason {
        Some(FailureReason::InvalidRequest | FailureReason::UnsupportedLanguage) => {
            StatusCode::BAD_REQUEST
        }
        Some(FailureReason::RejectedUnsafeInput) => StatusCode::FORBIDDEN,
        Some(FailureReason::IoFailure | FailureReason::Internal) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::OK,
    }
}

#[derive(Clone)]
pub struct AppState {
    service: CodeExecutionService,
}

pub async fn create_app(config: RunnerConfig) -> Result<Router, ServerError> {
    let service = CodeExecutionService::new(config).await?;
    Ok(router(service))
}

/// Routes around an already constructed service
pub fn router(service: CodeExecutionService) -> Router {
    let state = AppState { service };

    let cors = CorsLayer::permissive();

    Router::new()
        .route("/health", get(health_check))
        .route("/languages", get(languages))
        .route("/run", post(run))
        .route("/api/run", post(run))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), ServerError> {
    info!("Starting code runner server on {}", addr);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn languages(State(state): State<AppState>) -> Json<Vec<LanguageInfo>> {
    Json(state.service.languages())
}

async fn run(
    State(state): State<AppState>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            warn!("Rejected run request body: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(RunResponse::rejected(rejection.body_text())),
            )
                .into_response();
        }
    };

    let request = ExecutionRequest::new(
        payload.language.unwrap_or_default(),
        payload.code.unwrap_or_default(),
    )
    .with_stdin(payload.input.unwrap_or_default());

    let outcome = state.service.execute(request).await;

    (
        status_for(outcome.failure_reason),
        Json(RunResponse::from(&outcome)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use code_runner::ExecutionMode;
    use tempfile::TempDir;
    use tower::ServiceExt;

    // `sh` stands in for python so the tests need no real interpreter
    const SHELL_TOOLCHAINS: &str = r#"
        [python]
        extension = "sh"
        run = ["sh", "{source}"]
    "#;

    const MISSING_TOOLCHAINS: &str = r#"
        [python]
        extension = "py"
        run = ["code-runner-server-missing-interpreter", "{source}"]
    "#;

    struct TestApp {
        app: Router,
        _scratch: TempDir,
        _tables: TempDir,
    }

    async fn test_app(mode: ExecutionMode, toolchains: &str) -> TestApp {
        let scratch = TempDir::new().unwrap();
        let tables = TempDir::new().unwrap();
        let table = tables.path().join("toolchains.toml");
        std::fs::write(&table, toolchains).unwrap();

        let config = RunnerConfig::new(mode)
            .with_scratch_dir(scratch.path().to_path_buf())
            .with_toolchains(table)
            .with_max_concurrent(2);
        let app = create_app(config).await.expect("Failed to create app");

        TestApp {
            app,
            _scratch: scratch,
            _tables: tables,
        }
    }

    async fn post_run(app: &Router, uri: &str, body: String) -> (StatusCode, RunResponse) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn run_body(language: &str, code: &str, input: Option<&str>) -> String {
        serde_json::to_string(&RunRequest {
            code: Some(code.to_string()),
            language: Some(language.to_string()),
            input: input.map(str::to_string),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let test = test_app(ExecutionMode::Local, SHELL_TOOLCHAINS).await;

        let response = test
            .app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_run_success() {
        let test = test_app(ExecutionMode::Local, SHELL_TOOLCHAINS).await;

        let (status, response) = post_run(&test.app, "/run", run_body("python", "echo ok", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            response,
            RunResponse {
                output: "ok".to_string(),
                error: String::new(),
                success: true,
            }
        );
    }

    #[tokio::test]
    async fn test_api_run_with_input() {
        let test = test_app(ExecutionMode::Local, SHELL_TOOLCHAINS).await;

        let (status, response) = post_run(
            &test.app,
            "/api/run",
            run_body("py", "read line\necho \"$line\"", Some("hello\n")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(response.success);
        assert_eq!(response.output, "hello");
    }

    #[tokio::test]
    async fn test_runtime_failure_is_ok_status() {
        let test = test_app(ExecutionMode::Local, SHELL_TOOLCHAINS).await;

        let (status, response) =
            post_run(&test.app, "/run", run_body("python", "echo boom >&2", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(!response.success);
        assert_eq!(response.error, "boom\n");
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let test = test_app(ExecutionMode::Local, SHELL_TOOLCHAINS).await;

        let bodies = [
            "not json".to_string(),
            r#"{"language": "python"}"#.to_string(),
            r#"{"code": "echo ok"}"#.to_string(),
            run_body("ruby", "puts 1", None),
        ];
        for body in bodies {
            let (status, response) = post_run(&test.app, "/run", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(!response.success);
            assert!(!response.error.is_empty());
        }
    }

    #[tokio::test]
    async fn test_unsafe_code_forbidden() {
        let test = test_app(ExecutionMode::Local, SHELL_TOOLCHAINS).await;

        let (status, response) = post_run(
            &test.app,
            "/run",
            run_body("python", "import subprocess", None),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(!response.success);
        assert!(response.error.contains("not allowed"));
    }

    #[tokio::test]
    async fn test_unavailable_toolchain() {
        let test = test_app(ExecutionMode::Local, MISSING_TOOLCHAINS).await;

        let (status, response) = post_run(&test.app, "/run", run_body("python", "print(1)", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(!response.success);
        assert!(response.error.contains("code-runner-server-missing-interpreter"));
    }

    #[tokio::test]
    async fn test_languages() {
        let test = test_app(ExecutionMode::Local, SHELL_TOOLCHAINS).await;

        let response = test
            .app
            .oneshot(Request::builder().uri("/languages").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let languages: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            languages,
            serde_json::json!([{ "name": "python", "compiled": false, "local": true }])
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(None), StatusCode::OK);
        assert_eq!(status_for(Some(FailureReason::Timeout)), StatusCode::OK);
        assert_eq!(
            status_for(Some(FailureReason::ProviderUnavailable)),
            StatusCode::OK
        );
        assert_eq!(
            status_for(Some(FailureReason::UnsupportedLanguage)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(Some(FailureReason::RejectedUnsafeInput)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(Some(FailureReason::IoFailure)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
