//! HTTP surface: the assessment form, its submit action and a liveness check

use crate::handler::{FormHandler, SubmissionError};
use crate::render::{render_page, Notice, PageView};
use crate::types::request::AssessmentForm;
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Form, Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared application state
pub struct AppState {
    pub handler: FormHandler,
}

impl AppState {
    pub fn new(handler: FormHandler) -> Arc<Self> {
        Arc::new(Self { handler })
    }
}

/// Build the router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", get(index).post(predict))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let form = AssessmentForm::default();
    Html(render_page(&PageView {
        form: &form,
        load_error: state.handler.model().load_error(),
        notice: None,
    }))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    form: Result<Form<AssessmentForm>, FormRejection>,
) -> impl IntoResponse {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            warn!(error = %rejection, "Undecodable form submission");
            state.handler.metrics().record_input_error();
            let page = render_page(&PageView {
                form: &AssessmentForm::default(),
                load_error: state.handler.model().load_error(),
                notice: Some(Notice::Error {
                    title: "Invalid input",
                    message: rejection.body_text(),
                }),
            });
            return (rejection.status(), Html(page));
        }
    };

    let worker = state.clone();
    let submitted = form.clone();
    let result = tokio::task::spawn_blocking(move || worker.handler.submit(&submitted)).await;

    let (status, notice) = match &result {
        Ok(Ok(outcome)) => (StatusCode::OK, Notice::Verdict(outcome)),
        Ok(Err(SubmissionError::Input(e))) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Notice::Error {
                title: "Invalid input",
                message: e.to_string(),
            },
        ),
        Ok(Err(e)) if e.is_unavailable() => (
            StatusCode::SERVICE_UNAVAILABLE,
            Notice::Error {
                title: "Predictions disabled",
                message: e.to_string(),
            },
        ),
        Ok(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Notice::Error {
                title: "Prediction Error",
                message: e.to_string(),
            },
        ),
        Err(e) => {
            error!(error = %e, "Assessment task aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Notice::Error {
                    title: "Prediction Error",
                    message: "the model call did not complete".to_string(),
                },
            )
        }
    };

    let page = render_page(&PageView {
        form: &form,
        load_error: state.handler.model().load_error(),
        notice: Some(notice),
    });

    (status, Html(page))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "model": state.handler.model().status(),
    }))
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl-C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
