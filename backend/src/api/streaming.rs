//! Streaming task execution over Server-Sent Events (SSE)
//!
//! Emits one event per task state transition, then the artifact (or an
//! `[ERROR]` line), then `[DONE]`.

use crate::api::utils::{prepare_task, register_artifact, TaskPayload};
use crate::error::AppError;
use crate::orchestrator::constants::{SSE_DONE_SIGNAL, SSE_ERROR_PREFIX};
use crate::orchestrator::{Artifact, PhaseEvent, PhaseObserver};
use crate::state::SharedState;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use futures_util::{stream::Stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// One SSE payload
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    Phase(PhaseEvent),
    Artifact { artifact: Artifact },
}

/// POST /api/tasks/stream - Run a task, streaming its phases
///
/// Input problems are reported as a normal error response before the
/// stream opens.
pub async fn run_task_stream(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<TaskPayload>,
) -> Result<Response, AppError> {
    let task = prepare_task(&state, &headers, payload).await?;

    let (tx, rx) = mpsc::unbounded_channel::<PhaseEvent>();
    let observer: Arc<dyn PhaseObserver> =
        Arc::new(move |event: &PhaseEvent| -> anyhow::Result<()> {
            tx.send(event.clone())
                .map_err(|_| anyhow::anyhow!("Phase stream receiver dropped"))
        });
    let handle = tokio::spawn(task.run(Some(observer)));

    let stream = create_stream(rx, handle, state);
    create_sse_response(stream)
}

fn create_stream(
    events: mpsc::UnboundedReceiver<PhaseEvent>,
    handle: tokio::task::JoinHandle<Result<Artifact, crate::orchestrator::TaskError>>,
    state: SharedState,
) -> impl Stream<Item = Result<String, axum::Error>> {
    use async_stream::stream;

    stream! {
        // Ends once the task drops its observer
        let mut events = UnboundedReceiverStream::new(events);
        while let Some(event) = events.next().await {
            yield Ok(to_json(&StreamEvent::Phase(event)));
        }

        match handle.await {
            Ok(Ok(artifact)) => {
                register_artifact(&state, &artifact).await;
                yield Ok(to_json(&StreamEvent::Artifact { artifact }));
            }
            Ok(Err(e)) => yield Ok(format!("{} {}", SSE_ERROR_PREFIX, e)),
            Err(e) => {
                tracing::error!(error = %e, "Task panicked or was cancelled");
                yield Ok(format!("{} Task aborted", SSE_ERROR_PREFIX));
            }
        }
        yield Ok(SSE_DONE_SIGNAL.to_string());
    }
}

fn to_json(event: &StreamEvent) -> String {
    serde_json::to_string(event).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize stream event");
        format!("{} {}", SSE_ERROR_PREFIX, e)
    })
}

/// Wrap a stream of payload lines as an SSE response
fn create_sse_response(
    stream: impl Stream<Item = Result<String, axum::Error>> + Send + 'static,
) -> Result<Response, AppError> {
    let sse_stream = stream.map(|event_result| {
        let sse_text = match event_result {
            Ok(data) => format!("data: {}\n\n", data),
            Err(e) => format!("data: {} {}\n\n", SSE_ERROR_PREFIX, e),
        };
        Ok::<_, std::io::Error>(sse_text)
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(sse_stream))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build SSE response: {}", e)))
}
