use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::collection::CollectionError;
use crate::engine::{format_countdown, ScanError};
use crate::store::StoreError;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
	#[error(transparent)]
	Scan(#[from] ScanError),
	#[error(transparent)]
	Collection(#[from] CollectionError),
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error("{0} not found")]
	NotFound(&'static str),
}

impl ApiError {
	fn status(&self) -> StatusCode {
		match self {
			Self::Scan(ScanError::UnknownUser(_)) => StatusCode::NOT_FOUND,
			Self::Scan(ScanError::OnCooldown { .. }) => StatusCode::TOO_MANY_REQUESTS,
			Self::Scan(ScanError::Failed(_)) => StatusCode::SERVICE_UNAVAILABLE,
			Self::Collection(CollectionError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
			Self::Collection(CollectionError::CapReached { .. }) => StatusCode::CONFLICT,
			Self::Collection(CollectionError::UnknownUser(_) | CollectionError::NotCollected { .. }) => {
				StatusCode::NOT_FOUND
			}
			Self::Collection(CollectionError::Store(_)) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::NotFound(_) => StatusCode::NOT_FOUND,
		}
	}

	fn code(&self) -> &'static str {
		match self {
			Self::Scan(ScanError::UnknownUser(_)) | Self::Collection(CollectionError::UnknownUser(_)) => "unknown_user",
			Self::Scan(ScanError::OnCooldown { .. }) => "on_cooldown",
			Self::Scan(ScanError::Failed(_)) => "scan_failed",
			Self::Collection(CollectionError::InvalidInput(_)) => "invalid_input",
			Self::Collection(CollectionError::CapReached { .. }) => "cap_reached",
			Self::Collection(CollectionError::NotCollected { .. }) | Self::NotFound(_) => "not_found",
			Self::Collection(CollectionError::Store(_)) | Self::Store(_) => "internal_server_error",
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status();

		if status.is_server_error() {
			tracing::error!(error = %self, "request failed");
		}

		let body = match &self {
			Self::Scan(ScanError::OnCooldown {
				remaining,
				next_allowed_at,
			}) => json!({
				"error": self.code(),
				"message": self.to_string(),
				"cooldown_remaining_seconds": remaining.num_seconds(),
				"next_allowed_at": next_allowed_at,
				"countdown": format_countdown(*remaining),
			}),
			// storage details stay in the logs
			_ if status == StatusCode::INTERNAL_SERVER_ERROR => json!({
				"error": self.code(),
				"message": "internal server error",
			}),
			_ => json!({
				"error": self.code(),
				"message": self.to_string(),
			}),
		};

		(status, Json(body)).into_response()
	}
}
