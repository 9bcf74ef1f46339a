use std::future::Future;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{Map, Value};

use super::{FlakyUpstream, UpstreamFailure};

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

/// HTTP surface of the simulated boats API.
///
/// - `GET /boats` → array of boats
/// - `GET /boats/:id` → boat or 404
/// - `PUT /boats/:id` with a JSON object → merged boat, 404, or 400 for a
///   non-string `name`
///
/// Injected failures answer 500. Each operation runs on its own task, so a
/// client that gives up early does not cancel it.
pub fn router(upstream: FlakyUpstream) -> Router {
    Router::new()
        .route("/boats", get(list_boats))
        .route("/boats/:id", get(get_boat).put(update_boat))
        .with_state(upstream)
}

async fn list_boats(State(upstream): State<FlakyUpstream>) -> Response {
    respond(detached(async move { upstream.list().await }).await)
}

async fn get_boat(State(upstream): State<FlakyUpstream>, Path(id): Path<String>) -> Response {
    respond(detached(async move { upstream.get(&id).await }).await)
}

async fn update_boat(
    State(upstream): State<FlakyUpstream>,
    Path(id): Path<String>,
    Json(fields): Json<Map<String, Value>>,
) -> Response {
    respond(detached(async move { upstream.update(&id, &fields).await }).await)
}

async fn detached<T, F>(operation: F) -> Result<T, UpstreamFailure>
where
    T: Send + 'static,
    F: Future<Output = Result<T, UpstreamFailure>> + Send + 'static,
{
    match tokio::spawn(operation).await {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(error = %err, "simulated boats operation aborted");
            Err(UpstreamFailure::ServerError)
        }
    }
}

fn respond<T: Serialize>(result: Result<T, UpstreamFailure>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(failure) => {
            let status = match failure {
                UpstreamFailure::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
                UpstreamFailure::NotFound(_) => StatusCode::NOT_FOUND,
                UpstreamFailure::InvalidName => StatusCode::BAD_REQUEST,
            };
            let body = ErrorBody {
                message: failure.to_string(),
            };
            (status, Json(body)).into_response()
        }
    }
}
