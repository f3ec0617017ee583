use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use ulid::Ulid;

use crate::api::error::{ApiError, Result};
use crate::database::{Profile, User};
use crate::global::GlobalState;

#[derive(Debug, serde::Deserialize)]
pub struct CreateUserRequest {
	pub display_name: String,
}

pub async fn create(
	State(global): State<Arc<GlobalState>>,
	Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>)> {
	let user = global.collection().create_user(&request.display_name, Utc::now()).await?;

	Ok((StatusCode::CREATED, Json(user)))
}

pub async fn profile(State(global): State<Arc<GlobalState>>, Path(user_id): Path<Ulid>) -> Result<Json<Profile>> {
	global
		.listings()
		.profile(user_id)
		.await?
		.map(Json)
		.ok_or(ApiError::NotFound("user"))
}
