//! HTTP API server.
//!
//! Exposes the answer service as `POST /ask`.

use crate::answer::{AnswerService, QuestionRequest};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::AalimError;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Build the API router around a shared answer service.
pub fn router(service: Arc<AnswerService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ask", post(ask))
        .layer(cors)
        .with_state(service)
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let service = Arc::new(AnswerService::from_settings(&settings)?);
    let app = router(Arc::clone(&service));

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Aalim API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    Output::kv("Ask", "POST /ask");
    Output::kv("Model", service.model());
    Output::kv("Collection", service.retriever().collection());
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn ask(
    State(service): State<Arc<AnswerService>>,
    Json(req): Json<QuestionRequest>,
) -> impl IntoResponse {
    match service.ask(req).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            let status = match e {
                AalimError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error!("Failed to answer question: {}", e);
            (status, Json(ErrorResponse { error: e.to_string() })).into_response()
        }
    }
}
