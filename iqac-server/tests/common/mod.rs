//! Shared helpers for iqac-server integration tests
//!
//! Each test gets its own root folder and database in a TempDir and
//! drives the router in-process with `oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use iqac_common::config::{RootFolder, ServerSettings};
use iqac_common::db::init_database;
use iqac_server::bootstrap::ensure_admin;
use iqac_server::{build_router, AppState};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const ADMIN_EMAIL: &str = "admin@iqac.test";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const PASSWORD: &str = "password123";

/// Upload limit used by the tests
pub const MAX_UPLOAD: usize = 64 * 1024;

const BOUNDARY: &str = "----iqac-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub admin: String,
    root_dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let root = RootFolder::new(dir.path());
    root.ensure_directories().unwrap();

    let pool = init_database(&root.database_path()).await.unwrap();
    let settings = ServerSettings {
        max_upload_bytes: MAX_UPLOAD,
        bcrypt_cost: 4,
        ..Default::default()
    };
    ensure_admin(&pool, ADMIN_EMAIL, Some(ADMIN_PASSWORD), settings.bcrypt_cost)
        .await
        .unwrap();

    let state = AppState::new(pool, settings, TEST_SECRET, &root);
    let router = build_router(state.clone());

    let mut app = TestApp {
        router,
        state,
        admin: String::new(),
        root_dir: dir,
    };
    app.admin = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    app
}

/// Read a response body as JSON (`Null` when empty)
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    }
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub fn id_of(value: &Value) -> Uuid {
    value["id"].as_str().expect("id field").parse().unwrap()
}

/// Build a multipart/form-data body; returns (content type, body)
pub fn multipart(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

impl TestApp {
    /// The root folder holding the database and uploads
    pub fn root(&self) -> &Path {
        self.root_dir.path()
    }

    /// Absolute location of a stored `uploads/...` path
    pub fn stored_file(&self, stored: &str) -> PathBuf {
        self.root().join(stored)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// JSON request; `token` adds a bearer header, `body` a JSON payload
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call("GET", uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call("POST", uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call("PUT", uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> StatusCode {
        self.call("DELETE", uri, Some(token), None).await.0
    }

    pub async fn upload(
        &self,
        uri: &str,
        token: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> (StatusCode, Value) {
        let (content_type, body) = multipart(fields, file);
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let response = self.send(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed for {}: {}", email, body);
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn create_department(&self, name: &str, code: &str) -> Uuid {
        let (status, body) = self
            .post(
                "/api/departments",
                &self.admin,
                json!({ "name": name, "code": code }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        id_of(&body)
    }

    /// Create an approved account as admin and log in; returns (id, token)
    pub async fn create_user(
        &self,
        role: &str,
        department_id: Option<Uuid>,
        email: &str,
    ) -> (Uuid, String) {
        let (status, body) = self
            .post(
                "/api/users",
                &self.admin,
                json!({
                    "name": format!("Test {}", role),
                    "email": email,
                    "password": PASSWORD,
                    "role": role,
                    "department_id": department_id,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        let token = self.login(email, PASSWORD).await;
        (id_of(&body), token)
    }

    /// Coordinator account assigned to `department_id`
    pub async fn create_coordinator(&self, department_id: Uuid, email: &str) -> (Uuid, String) {
        let (id, token) = self.create_user("coordinator", Some(department_id), email).await;
        let (status, body) = self
            .put(
                &format!("/api/departments/{}/coordinator", department_id),
                &self.admin,
                json!({ "user_id": id }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        (id, token)
    }
}

pub fn publication(title: &str) -> Value {
    json!({
        "title": title,
        "academic_year": "2024-25",
        "details": {
            "publication_type": "journal",
            "venue": "IEEE Access",
            "authors": ["A. Rao", "B. Singh"],
            "indexing": "scopus"
        }
    })
}

pub fn course(code: &str) -> Value {
    json!({
        "title": format!("{} lectures", code),
        "academic_year": "2024-25",
        "details": {
            "course_code": code,
            "course_name": "Data Structures",
            "semester": 3,
            "credits": 4
        }
    })
}
