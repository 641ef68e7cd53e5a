//! Common test utilities for E2E tests

use std::path::PathBuf;

use tempfile::TempDir;
use tidepool::{AppState, config};
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            database: config::DatabaseConfig {
                path: PathBuf::from(&db_path),
                max_connections: 5,
            },
            community: config::CommunityConfig {
                max_content_chars: 5000,
                max_tags_per_post: 10,
                event_buffer: 256,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Register metrics (idempotent across servers in one process)
        tidepool::metrics::init_metrics();

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = tidepool::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// POST a JSON body as the given user
    pub fn post_as(&self, uid: &str, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .header("x-auth-uid", uid)
            .header("x-auth-name", format!("User {}", uid))
    }

    /// DELETE as the given user
    pub fn delete_as(&self, uid: &str, path: &str) -> reqwest::RequestBuilder {
        self.client.delete(self.url(path)).header("x-auth-uid", uid)
    }

    /// GET as the given user
    pub fn get_as(&self, uid: &str, path: &str) -> reqwest::RequestBuilder {
        self.client.get(self.url(path)).header("x-auth-uid", uid)
    }

    /// Create a post and return its id
    pub async fn create_post(&self, uid: &str, content: &str) -> i64 {
        let response = self
            .post_as(uid, "/api/community/posts")
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let json: serde_json::Value = response.json().await.unwrap();
        json["id"].as_i64().unwrap()
    }
}
