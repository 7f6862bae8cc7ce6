//! HTTP entry point.
//!
//! `POST /api/translations` runs one translation job against the project
//! named in the body; `GET /health` is for the platform's probes.

use crate::cms::ManagementClient;
use crate::config::Config;
use crate::error::Error;
use crate::orchestrator::{run_translation, TranslationJob, TranslationReport};
use crate::translation::TranslationProvider;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Body of a translation request. Credentials are per request; nothing is
/// stored between runs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitTranslationRequest {
    pub project_id: String,
    pub mapi_key: String,
    #[serde(flatten)]
    pub job: TranslationJob,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub translator: Arc<dyn TranslationProvider>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/translations", post(init_translation))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn init_translation(
    State(state): State<AppState>,
    Json(request): Json<InitTranslationRequest>,
) -> Result<(StatusCode, Json<TranslationReport>), (StatusCode, Json<ErrorResponse>)> {
    info!(
        "Translation requested for project {} ({} items, provider: {})",
        request.project_id,
        request.job.item_ids.len(),
        state.translator.provider_name()
    );

    let cms = ManagementClient::new(
        state.http.clone(),
        state.config.management_api_url.clone(),
        request.project_id,
        request.mapi_key,
    );

    match run_translation(&cms, state.translator.as_ref(), &request.job).await {
        Ok(report) => {
            let status = if report.is_complete() {
                StatusCode::OK
            } else {
                StatusCode::MULTI_STATUS
            };
            Ok((status, Json(report)))
        }
        Err(e) => {
            let status = status_for(&e);
            let message = format!("{:#}", anyhow::Error::from(e));
            error!("Translation failed ({}): {}", status, message);
            Err((status, Json(ErrorResponse { error: message })))
        }
    }
}

fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::UnknownLanguage { .. } => StatusCode::BAD_REQUEST,
        Error::MissingType { .. } | Error::MissingSnippet { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        Error::MalformedKey { .. } | Error::Transport(_) => StatusCode::BAD_GATEWAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::{StubMode, StubTranslator};

    fn state(management_api_url: &str) -> AppState {
        AppState {
            config: Arc::new(Config {
                port: 0,
                management_api_url: management_api_url.to_string(),
                translation_provider: "stub".to_string(),
                openai_api_key: None,
                openai_model: "gpt-4o-mini".to_string(),
                openai_api_url: "http://unused.test".to_string(),
            }),
            http: reqwest::Client::new(),
            translator: Arc::new(StubTranslator::new(StubMode::Placeholder)),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let request: InitTranslationRequest = serde_json::from_value(serde_json::json!({
            "projectId": "project-1",
            "mapiKey": "key",
            "itemIds": ["a", "b"],
            "fromLanguageId": "lang-en",
            "toLanguageIds": ["lang-es"]
        }))
        .expect("Should parse");

        assert_eq!(request.project_id, "project-1");
        assert_eq!(request.job.item_ids, vec!["a", "b"]);
        assert_eq!(request.job.to_language_ids, vec!["lang-es"]);
    }

    #[test]
    fn test_status_for_errors() {
        assert_eq!(
            status_for(&Error::UnknownLanguage {
                language_id: "x".to_string()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&Error::MissingType {
                type_id: "t".to_string(),
                item_id: "i".to_string(),
                language_id: "l".to_string(),
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&Error::Transport(anyhow::anyhow!("connection refused"))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(health().await, "OK");
    }

    #[tokio::test]
    async fn test_unreachable_cms_is_bad_gateway() {
        let request = InitTranslationRequest {
            project_id: "project-1".to_string(),
            mapi_key: "key".to_string(),
            job: TranslationJob {
                item_ids: vec!["a".to_string()],
                from_language_id: "lang-en".to_string(),
                to_language_ids: vec!["lang-es".to_string()],
            },
        };

        let (status, Json(body)) = init_translation(State(state("http://127.0.0.1:1")), Json(request))
            .await
            .unwrap_err();

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.error.contains("Management API"), "{}", body.error);
    }
}
