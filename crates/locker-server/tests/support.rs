#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use chrono::{Duration, Utc};
use locker_core::{Session, User, UserStatus};
use locker_db::repo::{SessionRepo, UserRepo};
use locker_db::{migrate, PgPool};
use locker_server::app::{build_router, AppState};
use locker_server::config::ServerConfig;
use locker_server::domains::sync::notifier::SyncNotifier;
use locker_server::settings::DbTxIsolation;
use locker_server::tokens::{generate_token, hash_token};
use serde_json::Value;
use sqlx_core::pool::PoolOptions;
use sqlx_postgres::{PgConnectOptions, Postgres};
use std::env;
use std::str::FromStr;
use tower::ServiceExt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

pub const TOKEN_PEPPER: &str = "pepper";

pub async fn setup_db() -> PgPool {
    let db_url =
        env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set for Postgres tests");
    let schema = format!("locker_test_{}", Uuid::now_v7().simple());
    let admin_options =
        PgConnectOptions::from_str(&db_url).expect("failed to parse TEST_DATABASE_URL");
    let admin_pool = PoolOptions::new()
        .max_connections(1)
        .connect_with(admin_options.clone())
        .await
        .expect("connect admin pool");

    sqlx_core::query::query::<Postgres>(&format!("CREATE SCHEMA \"{}\"", schema))
        .execute(&admin_pool)
        .await
        .expect("create schema");

    let options = admin_options.options([("search_path", schema.as_str())]);
    let pool = PoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect_with(options)
        .await
        .expect("connect test pool");

    migrate(&pool).await.expect("migrate");
    pool
}

pub struct TestApp {
    pub app: axum::Router,
    pub pool: PgPool,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(ServerConfig::default()).await
    }

    pub async fn with_config(config: ServerConfig) -> Self {
        static INIT: std::sync::Once = std::sync::Once::new();
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("locker_server=debug"))
                .with_test_writer()
                .try_init();
        });

        let pool = setup_db().await;
        let state = AppState {
            db: pool.clone(),
            db_tx_isolation: DbTxIsolation::ReadCommitted,
            started_at: std::time::Instant::now(),
            token_pepper: TOKEN_PEPPER.to_string(),
            session_ttl_seconds: 3600,
            config,
            notifier: SyncNotifier::new(pool.clone(), 64, None),
        };
        let app = build_router(state.clone());
        Self { app, pool, state }
    }

    /// Inserts an active user with a public key and returns it with a fresh
    /// bearer token.
    pub async fn user(&self, email: &str) -> (User, String) {
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            email: email.to_string(),
            full_name: None,
            public_key: Some(format!("pk-{email}")),
            status: UserStatus::Active,
            revision_date: now,
            created_at: now,
        };
        UserRepo::new(&self.pool)
            .create(&user)
            .await
            .expect("create user");
        let token = self.session_for(&user).await;
        (user, token)
    }

    pub async fn session_for(&self, user: &User) -> String {
        let token = generate_token();
        let now = Utc::now();
        let session = Session {
            id: Uuid::now_v7(),
            user_id: user.id,
            access_token_hash: hash_token(&token, TOKEN_PEPPER),
            access_expires_at: now + Duration::hours(1),
            created_at: now,
        };
        SessionRepo::new(&self.pool)
            .create(&session)
            .await
            .expect("create session");
        token
    }

    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    pub async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, path, Some(token), None).await
    }

    pub async fn create_cipher(&self, token: &str, data: &str) -> Uuid {
        let (status, body) = self
            .post(
                "/v1/ciphers",
                token,
                serde_json::json!({ "cipher_type": "login", "data": data }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create cipher: {body}");
        parse_id(&body["id"])
    }
}

pub fn parse_id(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .expect("uuid field")
}
