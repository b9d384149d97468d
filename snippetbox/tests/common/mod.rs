//! Shared harness for the HTTP-level tests
//!
//! Each [`TestApp`] owns a fresh in-memory SQLite database and keeps the
//! session cookie between requests the way a browser would.

#![allow(dead_code)]

use axum::http::{header, HeaderValue};
use axum_test::{TestRequest, TestResponse, TestServer};
use snippetbox::auth::password::PasswordHashConfig;
use snippetbox::config::{Config, DatabaseSettings, DirSettings};
use snippetbox::models;
use snippetbox::router::routes;
use snippetbox::session::SessionBackend;
use snippetbox::state::AppState;
use sqlx::SqlitePool;
use std::path::PathBuf;

pub const PASSWORD: &str = "pa$$word1";

/// A running application plus a one-cookie jar
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub pool: SqlitePool,
    cookie: Option<String>,
}

pub fn test_config(backend: SessionBackend) -> Config {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("ui");
    let mut config = Config {
        database: DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        templates: DirSettings {
            dir: root.join("html"),
        },
        static_files: DirSettings {
            dir: root.join("static"),
        },
        password: PasswordHashConfig {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
        },
        ..Config::default()
    };
    config.session.backend = backend;
    config
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(SessionBackend::Memory).await
    }

    pub async fn spawn_with(backend: SessionBackend) -> Self {
        let config = test_config(backend);
        let pool = models::connect(&config.database.url, config.database.max_connections)
            .await
            .unwrap();
        let state = AppState::build(config, pool.clone()).unwrap();
        let server = TestServer::new(routes(state.clone())).unwrap();

        Self {
            server,
            state,
            pool,
            cookie: None,
        }
    }

    /// Current session token, if the server has issued one
    pub fn token(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn clear_cookie(&mut self) {
        self.cookie = None;
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = self.server.get(path);
        self.send(request).await
    }

    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body: Vec<(&str, &str)> = fields.to_vec();
        let request = self.server.post(path).form(&body);
        self.send(request).await
    }

    async fn send(&mut self, mut request: TestRequest) -> TestResponse {
        if let Some(token) = &self.cookie {
            let value = HeaderValue::from_str(&format!("session={token}")).unwrap();
            request = request.add_header(header::COOKIE, value);
        }
        let response = request.await;
        if let Some(token) = session_token(&response) {
            self.cookie = Some(token);
        }
        response
    }

    /// Sign up and log in, leaving the jar holding an authenticated session.
    pub async fn login_as(&mut self, name: &str, email: &str) -> i64 {
        let id = self
            .state
            .users()
            .insert(name, email, PASSWORD)
            .await
            .unwrap();
        let response = self
            .post_form("/user/login", &[("email", email), ("password", PASSWORD)])
            .await;
        assert_eq!(response.status_code(), 303);
        id
    }
}

/// Token from a `Set-Cookie: session=...` header
pub fn session_token(response: &TestResponse) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| cookie.strip_prefix("session="))
        .and_then(|rest| rest.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &TestResponse) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
