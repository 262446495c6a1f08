use std::net::SocketAddr;

use reqwest::Client;
use reqwest::header::HeaderMap;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::Value;
use tempfile::TempDir;

use wiki_server::config::{
    AppConfig, AuthConfig, CooldownConfig, CorsConfig, DatabaseConfig, ServerConfig, WikiConfig,
};
use wiki_server::cooldown::Cooldown;
use wiki_server::entity::user;
use wiki_server::state::AppState;

pub mod routes {
    pub const REGISTER: &str = "/api/v1/auth/register";
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const ME: &str = "/api/v1/auth/me";
    pub const WIKI: &str = "/api/v1/wiki";
    pub const WIKI_RANDOM: &str = "/api/v1/wiki/random";
    pub const WIKI_PICK_VERSION: &str = "/api/v1/wiki/pick_version";
    pub const WIKI_ROLLBACK: &str = "/api/v1/wiki/rollback";

    pub fn article(id: i32) -> String {
        format!("/api/v1/wiki/{id}")
    }
}

/// A running test server backed by its own SQLite database file.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

/// Configuration used by every test app: cooldowns off, no proxy headers trusted.
fn test_config(db_url: String) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors: CorsConfig {
                allow_origins: vec![],
                max_age: 3600,
            },
            trust_forwarded_for: false,
        },
        database: DatabaseConfig {
            url: db_url,
            max_connections: 5,
        },
        auth: AuthConfig {
            jwt_secret: "test-secret-for-integration-tests".to_string(),
        },
        wiki: WikiConfig::default(),
        cooldown: CooldownConfig {
            new_article_by_ip_secs: 0,
            new_article_by_account_secs: 0,
            failed_attempt_secs: 0,
            cleanup_interval_secs: 60,
        },
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn an app after letting the caller adjust the test configuration.
    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("wiki.db").display());

        let mut config = test_config(db_url);
        configure(&mut config);

        let db = wiki_server::database::init_db(&config.database.url, config.database.max_connections)
            .await
            .expect("Failed to initialize test database");
        wiki_server::seed::seed_role_permissions(&db)
            .await
            .expect("Failed to seed test database");
        wiki_server::seed::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");

        let state = AppState {
            db: db.clone(),
            config,
            cooldown: Cooldown::new(),
        };

        let app = wiki_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    /// POST as if relayed by a proxy for client `ip`.
    pub async fn post_with_token_from(
        &self,
        path: &str,
        body: &Value,
        token: &str,
        ip: &str,
    ) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .header("X-Forwarded-For", ip)
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    /// Register a user and log in, returning the auth token.
    pub async fn create_authenticated_user(&self, username: &str, password: &str) -> String {
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });

        let reg = self.post_without_token(routes::REGISTER, &body).await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);

        let res = self.post_without_token(routes::LOGIN, &body).await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);

        res.body["token"]
            .as_str()
            .expect("Login response should contain a token")
            .to_string()
    }

    /// Register a user with a specific role, then log in and return the auth token.
    pub async fn create_user_with_role(
        &self,
        username: &str,
        password: &str,
        role: &str,
    ) -> String {
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });

        let reg = self.post_without_token(routes::REGISTER, &body).await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);

        let db_user = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .expect("DB query failed")
            .expect("User not found after registration");

        let mut active: user::ActiveModel = db_user.into();
        active.role = Set(role.to_string());
        user::Entity::update(active)
            .exec(&self.db)
            .await
            .expect("Failed to update user role");

        let res = self.post_without_token(routes::LOGIN, &body).await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);

        res.body["token"]
            .as_str()
            .expect("Login response should contain a token")
            .to_string()
    }

    /// Create an article via the API and return its `id`.
    pub async fn create_article(&self, token: &str, title: &str, root_id: Option<i32>) -> i32 {
        let res = self
            .post_with_token(
                routes::WIKI,
                &serde_json::json!({
                    "title": title,
                    "content": "## Overview\nSome text.",
                    "root_id": root_id,
                }),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "create_article failed: {}", res.text);
        res.id()
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            text,
            body,
        }
    }

    pub fn id(&self) -> i32 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'") as i32
    }
}
