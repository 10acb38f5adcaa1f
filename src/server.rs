//! HTTP boundary: request validation, engine dispatch, response shaping.
//!
//! Thin by design. Precondition checks (known id, non-empty text) run before
//! any remote work; engine failures map to status codes by classification
//! and always serialize to a structured JSON body, never a stack trace.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::Engine;
use crate::Error;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

#[derive(Debug, Deserialize)]
struct TextproQuery {
    id: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct SuccessBody {
    status: &'static str,
    template_id: String,
    url: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/textpro", get(textpro))
        .with_state(AppState { engine })
}

async fn index() -> &'static str {
    "textfx API is running."
}

async fn textpro(State(state): State<AppState>, Query(query): Query<TextproQuery>) -> Response {
    // Cheap precondition checks before any remote work.
    let id = match query.id {
        Some(id) if state.engine.catalog().contains(&id) => id,
        _ => return error_response(StatusCode::BAD_REQUEST, "Invalid or missing id", None),
    };
    let text = match query.text {
        Some(text) if !text.trim().is_empty() => text,
        _ => return error_response(StatusCode::BAD_REQUEST, "Missing text parameter", None),
    };

    match state.engine.generate(&id, &text).await {
        Ok(result) => {
            info!(template_id = %result.template_id, url = %result.image_url, "image generated");
            Json(SuccessBody {
                status: "success",
                template_id: result.template_id,
                url: result.image_url,
            })
            .into_response()
        }
        Err(err) => {
            warn!(template_id = %id, error = %err, "generation failed");
            if err.is_caller_error() {
                error_response(StatusCode::BAD_REQUEST, short_message(&err), None)
            } else {
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    short_message(&err),
                    Some(err.to_string()),
                )
            }
        }
    }
}

// Short, stable messages; the classified detail rides along for 500s.
fn short_message(err: &Error) -> &'static str {
    match err {
        Error::UnknownTemplate(_) => "Invalid or missing id",
        Error::MissingInput => "Missing text parameter",
        Error::InputsNotFound => "Input field not found",
        Error::ImageNotFound => "Failed to generate image",
        Error::TokenNotFound | Error::PayloadNotFound => "Remote page structure changed",
        Error::Unreachable(_) => "Template page unreachable",
        Error::RemoteError(_) | Error::ConfigError(_) => "Image generation failed",
    }
}

fn error_response(status: StatusCode, error: &str, details: Option<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: error.to_string(),
            details,
        }),
    )
        .into_response()
}
