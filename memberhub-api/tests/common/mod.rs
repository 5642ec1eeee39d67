//! Common test utilities for integration tests
//!
//! - Test database setup (skipped when `DATABASE_URL` is unset)
//! - Test user creation with a given role and status
//! - JWT token generation
//! - Request helpers that drive the router without a socket

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use memberhub_api::app::{build_router, AppState};
use memberhub_api::config::Config;
use memberhub_shared::auth::jwt::{create_token, Claims, TokenType};
use memberhub_shared::auth::password::hash_password;
use memberhub_shared::db::migrations::{ensure_database_exists, run_migrations};
use memberhub_shared::models::user::{CreateUser, Role, User, UserStatus};
use serde_json::Value;
use sqlx::PgPool;
use tower::Service as _;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-at-least-32-chars";
pub const TEST_PASSWORD: &str = "jardin2024";

/// Test context with a migrated database and a router over it
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
    created_users: std::sync::Mutex<Vec<Uuid>>,
}

impl TestContext {
    /// Connects to `DATABASE_URL`; `None` when it is not set
    pub async fn try_new() -> Option<Self> {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping database-backed test");
            return None;
        };

        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some(database_url.clone()),
            "JWT_SECRET" => Some(TEST_JWT_SECRET.to_string()),
            _ => None,
        })
        .expect("test configuration");

        ensure_database_exists(&config.database.url)
            .await
            .expect("create test database");
        let db = PgPool::connect(&config.database.url)
            .await
            .expect("connect to test database");
        run_migrations(&db).await.expect("run migrations");

        let app = build_router(AppState::new(db.clone(), config.clone()));

        Some(TestContext {
            db,
            app,
            config,
            created_users: std::sync::Mutex::new(Vec::new()),
        })
    }

    /// Creates a user directly in the database (password: [`TEST_PASSWORD`])
    pub async fn create_user(&self, role: Role, status: UserStatus) -> User {
        let user = User::create_with_status(
            &self.db,
            CreateUser {
                email: format!("test-{}@example.com", Uuid::new_v4()),
                password_hash: hash_password(TEST_PASSWORD).expect("hash password"),
                first_name: "Test".to_string(),
                last_name: role.as_str().to_string(),
                phone: None,
                role,
            },
            status,
        )
        .await
        .expect("create user");

        self.created_users.lock().unwrap().push(user.id);
        user
    }

    /// Approved user and an access token for it
    pub async fn login_as(&self, role: Role) -> (User, String) {
        let user = self.create_user(role, UserStatus::Approved).await;
        let token = self.token_for(&user);
        (user, token)
    }

    pub fn token_for(&self, user: &User) -> String {
        let claims = Claims::new(user.id, user.role, TokenType::Access);
        create_token(&claims, &self.config.jwt.secret).expect("create token")
    }

    /// Sends a request through the router; returns status and JSON body
    /// (`Value::Null` for empty bodies)
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON body ({status}): {}", String::from_utf8_lossy(&bytes))
            })
        };

        (status, json)
    }

    /// Deletes the users this context created (their articles keep a NULL author)
    pub async fn cleanup(&self) {
        let ids: Vec<Uuid> = self.created_users.lock().unwrap().drain(..).collect();
        for id in ids {
            User::delete(&self.db, id).await.expect("delete test user");
        }
    }
}

/// Returns the ids of the `items` of a paginated response
pub fn item_ids(page: &Value) -> Vec<String> {
    page["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|item| item["id"].as_str().expect("item id").to_string())
        .collect()
}
