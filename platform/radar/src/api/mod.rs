use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde_json::json;

use crate::global::GlobalState;

pub mod error;
pub mod v1;

pub fn routes(global: Arc<GlobalState>) -> Router {
	Router::new()
		.nest("/v1", v1::routes())
		.fallback(not_found)
		.with_state(global)
}

async fn not_found() -> impl IntoResponse {
	(
		StatusCode::NOT_FOUND,
		Json(json!({
			"error": "not_found",
		})),
	)
}

/// Serves the API until `shutdown` resolves, then lets in flight requests
/// finish.
pub async fn run<F>(global: Arc<GlobalState>, shutdown: F) -> anyhow::Result<()>
where
	F: Future<Output = ()> + Send + 'static,
{
	let bind_address = global.config().http.bind_address;

	let listener = tokio::net::TcpListener::bind(bind_address)
		.await
		.context("failed to bind http listener")?;

	tracing::info!("listening on {}", bind_address);

	axum::serve(listener, routes(global))
		.with_graceful_shutdown(shutdown)
		.await
		.context("http server failed")
}
