#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use recipe_api::auth::{generate_jwt, Claims};
use recipe_api::config::{DatabaseConfig, StoreBackend};
use recipe_api::database::{MemoryStore, Store};
use recipe_api::models::{NewUser, User};

/// An in-process app over a fresh in-memory store, or over PostgreSQL
pub struct TestApp {
    pub router: Router,
    pub store: Store,
    pub memory: Option<MemoryStore>,
}

static UNIQUE_USER_SEQ: AtomicU64 = AtomicU64::new(0);

/// One authenticated caller
pub struct TestUser {
    pub user: User,
    pub token: String,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        let memory = MemoryStore::new();
        let store = Store::from_memory(memory.clone());
        let router = recipe_api::app::app(store.clone());
        Self {
            router,
            store,
            memory: Some(memory),
        }
    }

    /// Router over the database at `DATABASE_URL` with migrations applied.
    /// `None` when `DATABASE_URL` is unset, so these tests skip on machines
    /// without PostgreSQL.
    pub async fn postgres() -> Result<Option<Self>> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping PostgreSQL test");
            return Ok(None);
        };
        let config = DatabaseConfig {
            backend: StoreBackend::Postgres,
            url: Some(url),
            max_connections: 2,
            connection_timeout: 10,
            run_migrations: true,
        };
        let store = Store::open(&config).await?;
        let router = recipe_api::app::app(store.clone());
        Ok(Some(Self {
            router,
            store,
            memory: None,
        }))
    }

    /// A user whose email is unique to this run, for databases that outlive a test
    pub async fn unique_user(&self, prefix: &str) -> Result<TestUser> {
        let seq = UNIQUE_USER_SEQ.fetch_add(1, Ordering::Relaxed);
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        self.user(&format!("{}-{}-{}-{}@example.com", prefix, std::process::id(), nanos, seq))
            .await
    }

    pub async fn user(&self, email: &str) -> Result<TestUser> {
        let new_user = NewUser::new(email, Some("Test User")).map_err(|e| anyhow::anyhow!("{}", e))?;
        let user = self.store.users.create(new_user).await?;
        let token = generate_jwt(&Claims::new(&user)?)?;
        Ok(TestUser { user, token })
    }

    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };
        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok(TestResponse { status, body })
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> Result<TestResponse> {
        self.send(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> Result<TestResponse> {
        self.send(Method::POST, uri, Some(&user.token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: &TestUser, body: Value) -> Result<TestResponse> {
        self.send(Method::PUT, uri, Some(&user.token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, user: &TestUser, body: Value) -> Result<TestResponse> {
        self.send(Method::PATCH, uri, Some(&user.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> Result<TestResponse> {
        self.send(Method::DELETE, uri, Some(&user.token), None).await
    }

    /// POSTs and returns the created row's id, failing on anything but 201
    pub async fn create(&self, uri: &str, user: &TestUser, body: Value) -> Result<i64> {
        let res = self.post(uri, user, body).await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "create {} failed: {} {}", uri, res.status, res.body);
        res.body["data"]["id"].as_i64().context("created row has no id")
    }
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    /// `data[*].name`, in response order
    pub fn names(&self) -> Vec<String> {
        self.field_strings("name")
    }

    pub fn field_strings(&self, field: &str) -> Vec<String> {
        self.data()
            .as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row[field].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `data[list][*].field`, e.g. the names of a recipe's tags
    pub fn field_strings_at(&self, list: &str, field: &str) -> Vec<String> {
        self.data()[list]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row[field].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.data()
            .as_array()
            .map(|rows| rows.iter().filter_map(|row| row["id"].as_i64()).collect())
            .unwrap_or_default()
    }
}

/// The real binary on a free port, backed by the in-memory store. The process
/// is killed when the handle drops.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_recipe-api"));
        cmd.env("RECIPE_API_PORT", port.to_string())
            .env("STORE_BACKEND", "memory")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() <= deadline {
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub async fn spawn_server() -> Result<TestServer> {
    let server = TestServer::spawn()?;
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}
