//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::Utc;
use finderdev_core::{
  ProfileService,
  profile::Profile,
  service::{ConflictPolicy, ReconcileOptions},
  store::{ProfileStore, StoreClients},
};
use finderdev_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{api_router, maintenance_router};

type Service = Arc<ProfileService<SqliteStore, SqliteStore>>;

async fn setup(options: ReconcileOptions) -> (SqliteStore, Router) {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let service: Service = Arc::new(ProfileService::new(
    StoreClients::restricted(store.clone()),
    store.clone(),
    options,
  ));
  let app = api_router(service.clone()).merge(maintenance_router(service));
  (store, app)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  match body {
    Some(json) => call_raw(app, method, uri, Some("application/json"), json.to_string()).await,
    None => call_raw(app, method, uri, None, String::new()).await,
  }
}

async fn call_raw(
  app: &Router,
  method: &str,
  uri: &str,
  content_type: Option<&str>,
  body: String,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(content_type) = content_type {
    builder = builder.header(header::CONTENT_TYPE, content_type);
  }
  let resp = app.clone().oneshot(builder.body(Body::from(body)).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, json)
}

async fn seed(store: &SqliteStore, id: &str, username: &str) -> Profile {
  store
    .insert_profile(Profile::new(id, username, Utc::now()))
    .await
    .unwrap()
}

// ─── Resolve ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn resolve_unknown_profile_is_404_envelope() {
  let (_, app) = setup(ReconcileOptions::default()).await;
  let (status, body) = call(&app, "GET", "/profiles/nobody", None).await;

  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["success"], false);
  assert_eq!(body["error"], "profile not found");
  assert!(body.get("data").is_none());
}

#[tokio::test]
async fn resolve_exact_profile() {
  let (store, app) = setup(ReconcileOptions::default()).await;
  seed(&store, "u1", "alice").await;

  let (status, body) = call(&app, "GET", "/profiles/u1", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["success"], true);
  assert_eq!(body["data"]["profile"]["username"], "alice");
  assert_eq!(body["data"]["needs_sync"], false);
  assert_eq!(body["data"]["drift"], Value::Null);
}

#[tokio::test]
async fn resolve_reports_drift_with_known_email() {
  let (store, app) = setup(ReconcileOptions::default()).await;
  store.add_identity_with_id("old", Some("a@x.com")).await.unwrap();
  seed(&store, "old", "alice").await;

  let (status, body) = call(&app, "GET", "/profiles/new?email=a@x.com", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["needs_sync"], true);
  assert_eq!(body["data"]["drift"]["current_id"], "old");
  assert_eq!(body["data"]["drift"]["target_id"], "new");
}

// ─── Provision ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn provision_creates_then_returns_existing() {
  let (_, app) = setup(ReconcileOptions::default()).await;
  let body = json!({ "email": "a@x.com" });

  let (status, first) = call(&app, "POST", "/profiles/u1/provision", Some(body.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(first["data"]["created"], true);
  assert_eq!(first["data"]["profile"]["username"], "a");

  let (status, second) = call(&app, "POST", "/profiles/u1/provision", Some(body)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(second["data"]["created"], false);
  assert_eq!(second["data"]["profile"], first["data"]["profile"]);
}

#[tokio::test]
async fn provision_without_email_uses_id_prefix() {
  let (_, app) = setup(ReconcileOptions::default()).await;
  let (status, body) =
    call(&app, "POST", "/profiles/abcdef123456/provision", Some(json!({}))).await;

  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["data"]["profile"]["username"], "user_abcdef12");
}

#[tokio::test]
async fn provision_accepts_missing_body() {
  let (_, app) = setup(ReconcileOptions::default()).await;
  let (status, body) = call(&app, "POST", "/profiles/abcdef123456/provision", None).await;

  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["success"], true);
  assert_eq!(body["data"]["profile"]["username"], "user_abcdef12");
}

#[tokio::test]
async fn provision_with_malformed_body_is_enveloped() {
  let (_, app) = setup(ReconcileOptions::default()).await;
  let (status, body) = call_raw(
    &app,
    "POST",
    "/profiles/u1/provision",
    Some("application/json"),
    "{\"email\":".into(),
  )
  .await;

  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["success"], false);
  assert!(body["error"].as_str().unwrap().starts_with("invalid request body"));
}

#[test]
fn second_username_collision_maps_to_409() {
  use axum::response::IntoResponse as _;
  use finderdev_core::Error as CoreError;

  let resp = crate::ApiError::from(CoreError::UsernameTaken("a_17".into())).into_response();
  assert_eq!(resp.status(), StatusCode::CONFLICT);
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn patch_updates_fields() {
  let (store, app) = setup(ReconcileOptions::default()).await;
  seed(&store, "u1", "alice").await;

  let patch = json!({ "full_name": "Alice L.", "bio": "Rust" });
  let (status, body) = call(&app, "PATCH", "/profiles/u1", Some(patch)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["full_name"], "Alice L.");
  assert_eq!(body["data"]["bio"], "Rust");
}

#[tokio::test]
async fn empty_patch_is_bad_request() {
  let (store, app) = setup(ReconcileOptions::default()).await;
  seed(&store, "u1", "alice").await;

  let (status, body) = call(&app, "PATCH", "/profiles/u1", Some(json!({}))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["success"], false);
}

#[tokio::test]
async fn invalid_patch_is_400_and_leaves_row() {
  let (store, app) = setup(ReconcileOptions::default()).await;
  let original = seed(&store, "u1", "alice").await;

  for patch in [
    json!({ "full_name": "A" }),
    json!({ "bio": "b".repeat(1001) }),
    json!({ "website_url": "javascript:alert(1)" }),
  ] {
    let (status, body) = call(&app, "PATCH", "/profiles/u1", Some(patch)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
  }
  assert_eq!(store.get_profile("u1").await.unwrap(), Some(original));
}

#[tokio::test]
async fn patch_without_json_content_type_is_enveloped() {
  let (store, app) = setup(ReconcileOptions::default()).await;
  seed(&store, "u1", "alice").await;

  let (status, body) =
    call_raw(&app, "PATCH", "/profiles/u1", None, r#"{"bio":"x"}"#.into()).await;
  assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
  assert_eq!(body["success"], false);
}

#[tokio::test]
async fn patch_unknown_profile_is_404() {
  let (_, app) = setup(ReconcileOptions::default()).await;
  let (status, _) =
    call(&app, "PATCH", "/profiles/ghost", Some(json!({ "bio": "x" }))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_pages_through_profiles() {
  let (store, app) = setup(ReconcileOptions::default()).await;
  for (id, username) in [("u1", "alice"), ("u2", "alfred"), ("u3", "bob")] {
    seed(&store, id, username).await;
  }

  let (status, body) = call(&app, "GET", "/profiles?q=al&limit=1", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["total"], 2);
  assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
  assert_eq!(body["data"]["has_more"], true);

  let (_, body) = call(&app, "GET", "/profiles?limit=500", None).await;
  assert_eq!(body["data"]["limit"], 100);
  assert_eq!(body["data"]["total"], 3);
}

#[tokio::test]
async fn search_offset_at_usize_max_is_empty_page() {
  let (store, app) = setup(ReconcileOptions::default()).await;
  seed(&store, "u1", "alice").await;

  let uri = format!("/profiles?offset={}", usize::MAX);
  let (status, body) = call(&app, "GET", &uri, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["total"], 1);
  assert_eq!(body["data"]["items"], json!([]));
  assert_eq!(body["data"]["has_more"], false);
}

// ─── Maintenance ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn repair_moves_profile() {
  let (store, app) = setup(ReconcileOptions::default()).await;
  seed(&store, "old", "alice").await;

  let (status, body) = call(
    &app,
    "POST",
    "/profiles/new/repair",
    Some(json!({ "current_id": "old" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["merged"], false);
  assert_eq!(body["data"]["profile"]["id"], "new");
  assert!(store.get_profile("old").await.unwrap().is_none());
}

#[tokio::test]
async fn repair_missing_profile_is_404() {
  let (_, app) = setup(ReconcileOptions::default()).await;
  let (status, _) = call(
    &app,
    "POST",
    "/profiles/new/repair",
    Some(json!({ "current_id": "old" })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn repair_onto_existing_profile_under_reject_is_409() {
  let options = ReconcileOptions {
    conflict_policy: ConflictPolicy::Reject,
    ..ReconcileOptions::default()
  };
  let (store, app) = setup(options).await;
  seed(&store, "old", "alice").await;
  seed(&store, "new", "alice2").await;

  let (status, body) = call(
    &app,
    "POST",
    "/profiles/new/repair",
    Some(json!({ "current_id": "old" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["success"], false);
  assert!(store.get_profile("old").await.unwrap().is_some());
}

#[tokio::test]
async fn repair_onto_itself_is_400() {
  let (store, app) = setup(ReconcileOptions::default()).await;
  seed(&store, "u1", "alice").await;

  let (status, _) = call(
    &app,
    "POST",
    "/profiles/u1/repair",
    Some(json!({ "current_id": "u1" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicates_list_and_prune() {
  let (store, app) = setup(ReconcileOptions::default()).await;
  seed(&store, "u1", "alice").await;

  let (status, body) = call(&app, "GET", "/profiles/u1/duplicates", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"].as_array().unwrap().len(), 1);

  let (status, body) = call(&app, "DELETE", "/profiles/u1/duplicates", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["deleted"], 0);
}

#[tokio::test]
async fn identity_email_reads_provider() {
  let (store, app) = setup(ReconcileOptions::default()).await;
  store.add_identity_with_id("u1", Some("a@x.com")).await.unwrap();

  let (status, body) = call(&app, "GET", "/identities/u1", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["email"], "a@x.com");

  let (_, body) = call(&app, "GET", "/identities/nobody", None).await;
  assert_eq!(body["data"]["email"], Value::Null);
}
