//! API integration tests.
//!
//! These tests drive the full router (middleware included) against a mock
//! database and an in-memory file store.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use roadwatch_api::{app, middleware::AppState};
use roadwatch_common::{
    AppResult, Locale, StorageBackend, TransitionPolicy, UploadedFile,
    config::AuthConfig,
};
use roadwatch_core::{
    AttachmentNormalizer, JwtIdentityProvider, LifecycleManager, PriorityClassifier,
    ReportService,
};
use roadwatch_db::{
    entities::accident_report::{self, ReportPriority, ReportStatus},
    repositories::ReportRepository,
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "test-secret";
const ID_1: &str = "01j0000000000000000000000a";
const BOUNDARY: &str = "roadwatch-boundary";

/// In-memory file store.
#[derive(Default)]
struct MemoryStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait::async_trait]
impl StorageBackend for MemoryStorage {
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<UploadedFile> {
        self.files
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            md5: String::new(),
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.files.lock().unwrap().remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("/uploads/{key}")
    }
}

fn create_test_report(id: &str, reporter_id: &str) -> accident_report::Model {
    let now = Utc::now();
    accident_report::Model {
        id: id.to_string(),
        reporter_id: reporter_id.to_string(),
        reporter_snapshot: json!({
            "name": "Test User", "nationalIdNumber": "29001011234567",
            "phone": "01012345678", "email": "test@example.com"
        }),
        description: "حريق في السيارة".to_string(),
        longitude: 31.2357,
        latitude: 30.0444,
        address: Some("Tahrir".to_string()),
        accuracy_meters: None,
        attachments: json!([]),
        voice_recording: None,
        identity_capture: None,
        status: ReportStatus::Pending,
        priority: ReportPriority::Critical,
        assigned_to: None,
        notes: json!([]),
        resolved_at: None,
        response_time_minutes: None,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

struct TestApp {
    router: Router,
    storage: Arc<MemoryStorage>,
}

fn build_app(db: DatabaseConnection, expose_error_details: bool) -> TestApp {
    let storage = Arc::new(MemoryStorage::default());
    let report_service = ReportService::new(
        ReportRepository::new(Arc::new(db)),
        Arc::clone(&storage) as Arc<dyn StorageBackend>,
        AttachmentNormalizer::new(1024),
        PriorityClassifier::new(&["حريق"], &["مصاب"]).unwrap(),
        LifecycleManager::new(TransitionPolicy::Permissive),
    );
    let identity = JwtIdentityProvider::new(&AuthConfig {
        jwt_secret: SECRET.to_string(),
        issuer: None,
        leeway_seconds: 0,
    })
    .unwrap();

    let state = AppState {
        report_service,
        identity: Arc::new(identity),
        default_locale: Locale::Ar,
        expose_error_details,
        body_limit: 16 * 1024,
    };

    TestApp {
        router: app(state),
        storage,
    }
}

fn empty_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

fn token(sub: &str, role: &str) -> String {
    encode(
        &Header::default(),
        &json!({
            "sub": sub,
            "role": role,
            "name": "Test User",
            "nationalId": "29001011234567",
            "phone": "01012345678",
            "email": "test@example.com",
            "exp": Utc::now().timestamp() + 600,
        }),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).method("GET");
    if let Some(t) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn multipart_body(parts: &[(&str, Option<(&str, &str)>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file {
            Some((file_name, content_type)) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(bearer: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .uri("/api/reports")
        .method("POST")
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = build_app(empty_db(), false);

    let response = app.router.oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized_in_arabic() {
    let app = build_app(empty_db(), false);

    let response = app
        .router
        .oneshot(get("/api/reports/my-reports", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::CONTENT_LANGUAGE).unwrap(),
        "ar"
    );
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(body["error"]["message"], "رمز التحقق غير صحيح");
}

#[tokio::test]
async fn test_error_message_follows_accept_language() {
    let app = build_app(empty_db(), false);

    let request = Request::builder()
        .uri("/api/reports/my-reports")
        .header(header::AUTHORIZATION, "Bearer not-a-token")
        .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(body["error"]["message"], "Invalid or missing access token");
}

#[tokio::test]
async fn test_nearby_requires_coordinates() {
    let app = build_app(empty_db(), false);

    let response = app
        .router
        .oneshot(get(
            "/api/reports/nearby?longitude=31.2",
            Some(&token("user1", "user")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_nearby_returns_distances() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[maplit::btreemap! {
            "id" => sea_orm::Value::from(ID_1),
            "longitude" => sea_orm::Value::from(31.2357),
            "latitude" => sea_orm::Value::from(30.0444),
        }]])
        .append_query_results([[create_test_report(ID_1, "someone")]])
        .into_connection();
    let app = build_app(db, false);

    let response = app
        .router
        .oneshot(get(
            "/api/reports/nearby?longitude=31.2357&latitude=30.0444&maxDistance=1000",
            Some(&token("user1", "user")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["reports"][0]["distanceMeters"], 0.0);
}

#[tokio::test]
async fn test_nearby_rejects_radius_beyond_the_globe() {
    let app = build_app(empty_db(), false);

    let response = app
        .router
        .oneshot(get(
            "/api/reports/nearby?longitude=31.2357&latitude=30.0444&maxDistance=1000000000",
            Some(&token("user1", "user")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_list_all_is_admin_only() {
    let app = build_app(empty_db(), false);

    let response = app
        .router
        .oneshot(get("/api/reports", Some(&token("user1", "user"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_list_all_pages() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_report(ID_1, "user1")]])
        .append_query_results([[maplit::btreemap! {
            "num_items" => sea_orm::Value::BigInt(Some(41))
        }]])
        .into_connection();
    let app = build_app(db, false);

    let response = app
        .router
        .oneshot(get(
            "/api/reports?status=pending&page=3&limit=20",
            Some(&token("admin1", "admin")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 41);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["currentPage"], 3);
    assert_eq!(body["reports"][0]["priority"], "critical");
}

#[tokio::test]
async fn test_list_all_rejects_bad_limit() {
    let app = build_app(empty_db(), false);

    let response = app
        .router
        .oneshot(get(
            "/api/reports?limit=500",
            Some(&token("admin1", "admin")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_all_treats_empty_filters_as_absent() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_report(ID_1, "user1")]])
        .append_query_results([[maplit::btreemap! {
            "num_items" => sea_orm::Value::BigInt(Some(1))
        }]])
        .into_connection();
    let app = build_app(db, false);

    let response = app
        .router
        .oneshot(get(
            "/api/reports?status=&priority=",
            Some(&token("admin1", "admin")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["currentPage"], 1);
}

#[tokio::test]
async fn test_list_all_rejects_unknown_status_filter() {
    let app = build_app(empty_db(), false);

    let response = app
        .router
        .oneshot(get(
            "/api/reports?status=archived",
            Some(&token("admin1", "admin")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_all_rejects_page_beyond_offset_range() {
    let app = build_app(empty_db(), false);

    let response = app
        .router
        .oneshot(get(
            "/api/reports?page=18446744073709551615",
            Some(&token("admin1", "admin")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_create_report_multipart() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_report(ID_1, "user1")]])
        .into_connection();
    let app = build_app(db, false);

    let body = multipart_body(&[
        ("description", None, "حريق في السيارة".as_bytes()),
        (
            "location",
            None,
            br#"{"latitude": 30.0444, "longitude": 31.2357}"#,
        ),
        ("media_0", Some(("crash.jpg", "image/jpeg")), &[0xff, 0xd8, 0xff]),
        ("voice", Some(("note.mp3", "audio/mpeg")), b"ID3"),
        ("unrelated", Some(("x.png", "image/png")), b"png"),
    ]);

    let response = app
        .router
        .oneshot(multipart_request(&token("user1", "user"), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "تم إرسال البلاغ بنجاح");
    assert_eq!(body["report"]["id"], ID_1);
    assert_eq!(body["report"]["status"], "pending");
    assert_eq!(app.storage.files.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_create_report_rejects_executable() {
    let app = build_app(empty_db(), false);

    let body = multipart_body(&[
        ("description", None, "تصادم".as_bytes()),
        ("location", None, br#"{"latitude": 30, "longitude": 31}"#),
        ("media_0", Some(("tool.exe", "application/octet-stream")), b"MZ"),
    ]);

    let response = app
        .router
        .oneshot(multipart_request(&token("user1", "user"), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "UNSUPPORTED_MEDIA");
    assert!(app.storage.files.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_report_oversized_file() {
    let app = build_app(empty_db(), false);

    let big = vec![0u8; 2048];
    let body = multipart_body(&[
        ("description", None, "تصادم".as_bytes()),
        ("location", None, br#"{"latitude": 30, "longitude": 31}"#),
        ("media_0", Some(("big.png", "image/png")), &big),
    ]);

    let response = app
        .router
        .oneshot(multipart_request(&token("user1", "user"), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json_body(response).await["error"]["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_create_report_json_with_structured_location() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_report(ID_1, "user1")]])
        .into_connection();
    let app = build_app(db, false);

    let request = Request::builder()
        .uri("/api/reports")
        .method("POST")
        .header(header::AUTHORIZATION, format!("Bearer {}", token("user1", "user")))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "description": "سيارة متوقفة",
                "location": {"latitude": 30.0444, "longitude": 31.2357, "address": "Tahrir"}
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_get_report_visibility() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_report(ID_1, "owner")]])
        .into_connection();
    let app = build_app(db, false);

    let response = app
        .router
        .oneshot(get(
            &format!("/api/reports/{ID_1}"),
            Some(&token("stranger", "user")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_report_malformed_id() {
    let app = build_app(empty_db(), false);

    let response = app
        .router
        .oneshot(get("/api/reports/not-an-id", Some(&token("admin1", "admin"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["message"], "البلاغ غير موجود");
}

#[tokio::test]
async fn test_update_status() {
    let current = create_test_report(ID_1, "owner");
    let mut saved = current.clone();
    saved.status = ReportStatus::InProgress;
    saved.assigned_to = Some("admin1".to_string());
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[current]])
        .append_query_results([[saved]])
        .into_connection();
    let app = build_app(db, false);

    let request = Request::builder()
        .uri(format!("/api/reports/{ID_1}/status"))
        .method("PUT")
        .header(header::AUTHORIZATION, format!("Bearer {}", token("admin1", "admin")))
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT_LANGUAGE, "en")
        .body(Body::from(
            json!({"status": "in_progress", "note": "unit dispatched"}).to_string(),
        ))
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Report status updated successfully");
    assert_eq!(body["report"]["status"], "in_progress");
    assert_eq!(body["report"]["assignedTo"], "admin1");
}

#[tokio::test]
async fn test_update_status_rejects_unknown_status() {
    let app = build_app(empty_db(), false);

    let request = Request::builder()
        .uri(format!("/api/reports/{ID_1}/status"))
        .method("PUT")
        .header(header::AUTHORIZATION, format!("Bearer {}", token("admin1", "admin")))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"status": "closed"}).to_string()))
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_report() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .into_connection();
    let app = build_app(db, false);

    let request = Request::builder()
        .uri(format!("/api/reports/{ID_1}"))
        .method("DELETE")
        .header(header::AUTHORIZATION, format!("Bearer {}", token("admin1", "admin")))
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "تم حذف البلاغ بنجاح");
}

#[tokio::test]
async fn test_internal_error_detail_outside_production() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_errors([sea_orm::DbErr::Custom("connection reset".to_string())])
        .into_connection();
    let app = build_app(db, true);

    let response = app
        .router
        .oneshot(get(
            "/api/reports/my-reports",
            Some(&token("user1", "user")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
    assert!(body["error"]["detail"].as_str().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn test_internal_error_detail_hidden_in_production() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_errors([sea_orm::DbErr::Custom("connection reset".to_string())])
        .into_connection();
    let app = build_app(db, false);

    let response = app
        .router
        .oneshot(get(
            "/api/reports/my-reports",
            Some(&token("user1", "user")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(response).await["error"].get("detail").is_none());
}
