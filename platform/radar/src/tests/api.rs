use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::api;
use crate::config::RadarConfig;
use crate::global::GlobalState;
use crate::tests::global::{mock_global_state, test_radar_config};

async fn request(global: &Arc<GlobalState>, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
	let builder = Request::builder().method(method).uri(uri);
	let request = match body {
		Some(body) => builder
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(body.to_string())),
		None => builder.body(Body::empty()),
	}
	.unwrap();

	let response = api::routes(global.clone()).oneshot(request).await.unwrap();
	let status = response.status();

	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
	// extractor rejections answer in plain text
	let body = if bytes.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
	};

	(status, body)
}

async fn create_user(global: &Arc<GlobalState>, display_name: &str) -> String {
	let (status, body) = request(
		global,
		Method::POST,
		"/v1/users",
		Some(json!({ "display_name": display_name })),
	)
	.await;
	assert_eq!(status, StatusCode::CREATED);

	body["id"].as_str().unwrap().to_string()
}

async fn collect(global: &Arc<GlobalState>, user_id: &str, external_id: &str) -> (StatusCode, Value) {
	request(
		global,
		Method::POST,
		&format!("/v1/users/{user_id}/channels"),
		Some(json!({
			"external_id": external_id,
			"name": external_id,
			"subscriber_count": 10,
		})),
	)
	.await
}

#[tokio::test]
async fn test_health() {
	let global = mock_global_state(test_radar_config());

	let (status, body) = request(&global, Method::GET, "/v1/health", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, json!({ "status": "ok" }));

	let (status, body) = request(&global, Method::GET, "/nope", None).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body, json!({ "error": "not_found" }));
}

#[tokio::test]
async fn test_scan_flow() {
	let global = mock_global_state(test_radar_config());

	let x = create_user(&global, "x").await;
	let y = create_user(&global, "y").await;

	for (user_id, external_id) in [(&x, "a"), (&x, "b"), (&y, "b")] {
		let (status, _) = collect(&global, user_id, external_id).await;
		assert_eq!(status, StatusCode::OK);
	}

	let (status, body) = request(&global, Method::GET, &format!("/v1/users/{x}/scan"), None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["can_scan"], json!(true));
	assert_eq!(body["countdown"], json!("00:00"));

	let (status, body) = request(&global, Method::POST, &format!("/v1/users/{x}/scan"), None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["matches"], json!([{ "user_id": y, "match_count": 1 }]));
	assert_eq!(body["receipt"]["inserted"], json!(1));

	let (status, body) = request(&global, Method::POST, &format!("/v1/users/{x}/scan"), None).await;
	assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
	assert_eq!(body["error"], json!("on_cooldown"));
	let remaining = body["cooldown_remaining_seconds"].as_i64().unwrap();
	assert!((1790..=1800).contains(&remaining), "{remaining}");
	assert!(body["countdown"].as_str().unwrap().starts_with("29:") || body["countdown"] == json!("30:00"));

	let (_, body) = request(&global, Method::GET, &format!("/v1/users/{x}/scan"), None).await;
	assert_eq!(body["can_scan"], json!(false));

	let (status, body) = request(&global, Method::GET, &format!("/v1/users/{y}/clones"), None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body.as_array().unwrap().len(), 1);
	assert_eq!(body[0]["other"]["display_name"], json!("x"));
	assert_eq!(body[0]["shared_channels"][0]["external_id"], json!("b"));

	let (_, body) = request(&global, Method::GET, "/v1/scans/recent", None).await;
	assert_eq!(body.as_array().unwrap().len(), 1);

	let (_, body) = request(&global, Method::GET, "/v1/channels/popular", None).await;
	assert_eq!(body[0]["channel"]["external_id"], json!("b"));
	assert_eq!(body[0]["fan_count"], json!(2));

	let (_, body) = request(&global, Method::GET, "/v1/channels/recent", None).await;
	assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_profile_and_remove() {
	let global = mock_global_state(test_radar_config());

	let x = create_user(&global, "x").await;
	let (_, channel) = collect(&global, &x, "a").await;
	let channel_id = channel["id"].as_str().unwrap();

	let (status, body) = request(&global, Method::GET, &format!("/v1/users/{x}"), None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["user"]["display_name"], json!("x"));
	assert_eq!(body["channels"][0]["id"], json!(channel_id));

	let uri = format!("/v1/users/{x}/channels/{channel_id}");
	let (status, _) = request(&global, Method::DELETE, &uri, None).await;
	assert_eq!(status, StatusCode::NO_CONTENT);

	let (status, body) = request(&global, Method::DELETE, &uri, None).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body["error"], json!("not_found"));
}

#[tokio::test]
async fn test_errors() {
	let global = mock_global_state(RadarConfig {
		channel_cap: 1,
		..test_radar_config()
	});

	let unknown = ulid::Ulid::new();

	let (status, body) = request(&global, Method::GET, &format!("/v1/users/{unknown}"), None).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body["error"], json!("not_found"));

	let (status, body) = request(&global, Method::POST, &format!("/v1/users/{unknown}/scan"), None).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body["error"], json!("unknown_user"));

	let (status, _) = request(&global, Method::GET, "/v1/users/not-a-ulid", None).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	let (status, body) = request(&global, Method::POST, "/v1/users", Some(json!({ "display_name": "" }))).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error"], json!("invalid_input"));

	let x = create_user(&global, "x").await;

	let (status, body) = collect(&global, &x, "not valid").await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error"], json!("invalid_input"));

	let (status, _) = collect(&global, &x, "a").await;
	assert_eq!(status, StatusCode::OK);

	let (status, body) = collect(&global, &x, "b").await;
	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(body["error"], json!("cap_reached"));
	assert_eq!(
		body["message"],
		json!("You can only add 1 channels. Please remove one to add more.")
	);
}
