//! Shared fixtures for wardrobe-server integration tests
//!
//! Builds the full router over an in-memory database with stub external
//! services and one signed-in user.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use wardrobe_common::auth::{create_session, upsert_user};
use wardrobe_common::db::init_memory_pool;
use wardrobe_server::services::{
    CheckoutError, CheckoutProvider, CheckoutSession, CreditOrder, ImageHost, ImageUpload,
    InferenceError, MediaHostError, ModelLogSender, TryOnModel,
};
use wardrobe_server::{build_router, AppState};

pub mod log_capture;

pub const BOUNDARY: &str = "wardrobe-test-boundary";

/// Scripted model step
#[derive(Debug, Clone)]
pub enum StubStep {
    Image(String),
    Empty,
    Fail,
}

/// Model returning scripted results in call order
#[derive(Default)]
pub struct StubModel {
    steps: Mutex<VecDeque<StubStep>>,
    calls: Mutex<Vec<(String, String)>>,
    unconfigured: bool,
}

impl StubModel {
    pub fn new(steps: Vec<StubStep>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            ..Default::default()
        })
    }

    pub fn unconfigured() -> Arc<Self> {
        Arc::new(Self {
            unconfigured: true,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TryOnModel for StubModel {
    async fn apply_garment(
        &self,
        human_image_url: &str,
        garment_image_url: &str,
        logs: ModelLogSender,
    ) -> Result<Option<String>, InferenceError> {
        self.calls
            .lock()
            .unwrap()
            .push((human_image_url.to_string(), garment_image_url.to_string()));
        let _ = logs.send(vec!["Sampling".to_string()]);

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(StubStep::Image(url)) => Ok(Some(url)),
            Some(StubStep::Empty) => Ok(None),
            Some(StubStep::Fail) | None => Err(InferenceError::Api(500, "stub failure".to_string())),
        }
    }

    fn is_configured(&self) -> bool {
        !self.unconfigured
    }
}

/// Media host that "hosts" files under a fake CDN
#[derive(Default)]
pub struct StubHost {
    pub uploads: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait]
impl ImageHost for StubHost {
    async fn upload_image(&self, upload: ImageUpload) -> Result<String, MediaHostError> {
        if self.fail {
            return Err(MediaHostError::Rejected(500, "stub rejection".to_string()));
        }
        self.uploads.lock().unwrap().push(upload.file_name.clone());
        Ok(format!("https://cdn.test/{}", upload.file_name))
    }
}

/// Checkout provider recording every order
#[derive(Default)]
pub struct StubCheckout {
    pub orders: Mutex<Vec<CreditOrder>>,
}

#[async_trait]
impl CheckoutProvider for StubCheckout {
    async fn create_session(&self, order: &CreditOrder) -> Result<CheckoutSession, CheckoutError> {
        self.orders.lock().unwrap().push(order.clone());
        Ok(CheckoutSession {
            id: "cs_test_1".to_string(),
            url: "https://pay.test/cs_test_1".to_string(),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub token: String,
    pub user_id: String,
    pub model: Arc<StubModel>,
    pub host: Arc<StubHost>,
    pub checkout: Arc<StubCheckout>,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub async fn test_app() -> TestApp {
    test_app_with(StubModel::new(vec![]), StubHost::default()).await
}

pub async fn test_app_with(model: Arc<StubModel>, host: StubHost) -> TestApp {
    let pool = init_memory_pool().await.unwrap();
    let user = upsert_user(&pool, "ada@example.com", Some("Ada")).await.unwrap();
    let token = create_session(&pool, &user.id, chrono::Duration::days(1))
        .await
        .unwrap();

    let host = Arc::new(host);
    let checkout = Arc::new(StubCheckout::default());
    let state = AppState::new(pool.clone(), model.clone(), host.clone(), checkout.clone())
        .with_public_base_url("https://closet.test");

    TestApp {
        router: build_router(state),
        pool,
        token,
        user_id: user.id,
        model,
        host,
        checkout,
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn delete(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    post_raw(uri, token, body.to_string())
}

pub fn post_raw(uri: &str, token: Option<&str>, body: String) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

/// Multipart POST with text fields and an optional `file` part
pub fn post_multipart(
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> Request<Body> {
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
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Parse an NDJSON body into one value per line
pub async fn body_lines(response: Response<Body>) -> Vec<Value> {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec())
        .unwrap()
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

pub fn event_types(events: &[Value]) -> Vec<String> {
    events
        .iter()
        .map(|e| e["type"].as_str().unwrap_or_default().to_string())
        .collect()
}
