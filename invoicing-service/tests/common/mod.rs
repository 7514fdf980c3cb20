#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use invoicing_service::config::{
    AuthConfig, Environment, HttpConfig, InvoicingConfig, MongoConfig, PolicyConfig,
};
use invoicing_service::models::User;
use invoicing_service::services::{
    AccessTokenClaims, InMemoryInvoiceStore, InMemoryUserDirectory, InvoiceLifecycle,
    JwtIdentityProvider,
};
use invoicing_service::startup::{build_router, AppState};
use jsonwebtoken::{encode, EncodingKey, Header};
use secrecy::Secret;
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const TEST_SECRET: &str = "test-signing-secret";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryInvoiceStore>,
    pub users: Arc<InMemoryUserDirectory>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

pub fn test_config() -> InvoicingConfig {
    InvoicingConfig {
        common: service_core::config::Config {
            port: 0,
            log_level: "error".to_string(),
        },
        environment: Environment::Dev,
        mongodb: MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "invoicing_test".to_string(),
        },
        auth: AuthConfig {
            jwt_secret: Secret::new(TEST_SECRET.to_string()),
        },
        http: HttpConfig {
            max_body_bytes: 10 * 1024 * 1024,
            allowed_origins: vec!["*".to_string()],
        },
        policy: PolicyConfig {
            allow_self_invoice: true,
            accept_client_date: true,
        },
        otlp_endpoint: None,
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: InvoicingConfig) -> Self {
        let store = Arc::new(InMemoryInvoiceStore::new());
        let users = Arc::new(InMemoryUserDirectory::with_users([
            User::new("u-alice", "alice@example.com", "Alice"),
            User::new("u-bob", "bob@example.com", "Bob"),
            User::new("u-carol", "carol@example.com", "Carol"),
        ]));

        let state = AppState {
            lifecycle: InvoiceLifecycle::new(
                store.clone(),
                users.clone(),
                (&config.policy).into(),
            ),
            identity: Arc::new(JwtIdentityProvider::new(&config.auth.jwt_secret)),
            config,
        };

        Self {
            router: build_router(state),
            store,
            users,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    /// Create an invoice as `issuer` and return its id.
    pub async fn create_invoice(&self, issuer: &str, recipient_email: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/invoices",
                Some(issuer),
                Some(serde_json::json!({
                    "recipient_email": recipient_email,
                    "price": 100,
                    "service": "consulting"
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }
}

pub fn token_for(user_id: &str, email: &str) -> String {
    sign(user_id, email, TEST_SECRET, Duration::minutes(15))
}

pub fn sign(user_id: &str, email: &str, secret: &str, ttl: Duration) -> String {
    let now = Utc::now();
    let claims = AccessTokenClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn alice() -> String {
    token_for("u-alice", "alice@example.com")
}

pub fn bob() -> String {
    token_for("u-bob", "bob@example.com")
}

pub fn carol() -> String {
    token_for("u-carol", "carol@example.com")
}
