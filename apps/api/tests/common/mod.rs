use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use stockroom_api::{build_router, ApiConfig, AppState};
use stockroom_core::pricing::TaxPrecedence;
use stockroom_db::{Database, DbConfig};
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-pass";

const BOUNDARY: &str = "stockroom-test-boundary";

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        Self::with_precedence(TaxPrecedence::Oldest).await
    }

    pub async fn with_precedence(precedence: TaxPrecedence) -> Self {
        let mut config = ApiConfig::for_tests();
        config.tax_precedence = precedence;

        let db = Database::new(DbConfig::in_memory().tax_precedence(precedence))
            .await
            .expect("Failed to open test db");

        let state = Arc::new(AppState::new(db, config));
        let router = build_router(state.clone());

        Self { router, state }
    }

    /// Sends a request and decodes the JSON body (`Null` when empty).
    pub async fn request(
        &self,
        method: Method,
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

        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Uploads `content` as the multipart `file` field.
    pub async fn upload(
        &self,
        uri: &str,
        token: &str,
        file_name: &str,
        content: &str,
    ) -> (StatusCode, Value) {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{c}\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = file_name,
            c = content
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().expect("No token in body").to_string()
    }

    /// Registers the first (admin) user and returns a token for it.
    pub async fn bootstrap_admin(&self) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/register",
                None,
                Some(json!({
                    "fullName": "Store Admin",
                    "email": ADMIN_EMAIL,
                    "password": ADMIN_PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "bootstrap failed: {}", body);
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Creates a product and returns its JSON.
    pub async fn create_product(
        &self,
        token: &str,
        sku: &str,
        category: &str,
        price: i64,
        stock: i64,
    ) -> Value {
        let (status, body) = self
            .post(
                "/api/product",
                token,
                json!({
                    "name": format!("Product {}", sku),
                    "sku": sku,
                    "category": category,
                    "price": price,
                    "cost": price / 2,
                    "stock": stock,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create product failed: {}", body);
        body["data"].clone()
    }
}
