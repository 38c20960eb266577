//! Common test utilities for E2E tests

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use postforge::{AppState, config, data};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Stand-in for the external collaborators: the LinkedIn OAuth endpoints
/// and the automation webhook. Records the payloads it receives so tests
/// can assert on exactly what was forwarded.
pub struct MockUpstream {
    pub addr: String,
    pub generate_requests: Arc<Mutex<Vec<Value>>>,
    pub publish_requests: Arc<Mutex<Vec<Value>>>,
}

#[derive(Clone)]
struct MockState {
    generate_requests: Arc<Mutex<Vec<Value>>>,
    publish_requests: Arc<Mutex<Vec<Value>>>,
}

async fn mock_token() -> Json<Value> {
    Json(json!({
        "access_token": "test-access-token",
        "expires_in": 3600,
    }))
}

async fn mock_userinfo() -> Json<Value> {
    Json(json!({
        "sub": "li-123",
        "email": "user@example.com",
        "name": "Test User",
        "picture": "https://media.example.com/avatar.png",
    }))
}

async fn mock_generate(State(state): State<MockState>, Json(body): Json<Value>) -> String {
    state.generate_requests.lock().unwrap().push(body);
    "Generated post text from upstream".to_string()
}

async fn mock_publish(State(state): State<MockState>, Json(body): Json<Value>) -> Json<Value> {
    state.publish_requests.lock().unwrap().push(body);
    Json(json!({
        "status": "posted",
        "post_urn": "urn:li:share:123",
    }))
}

async fn mock_failing() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
}

async fn spawn_mock_upstream() -> MockUpstream {
    let generate_requests = Arc::new(Mutex::new(Vec::new()));
    let publish_requests = Arc::new(Mutex::new(Vec::new()));

    let state = MockState {
        generate_requests: generate_requests.clone(),
        publish_requests: publish_requests.clone(),
    };

    let app = Router::new()
        .route("/oauth/token", post(mock_token))
        .route("/oauth/userinfo", get(mock_userinfo))
        .route("/webhook/generate", post(mock_generate))
        .route("/webhook/publish", post(mock_publish))
        .route("/webhook/failing", post(mock_failing))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockUpstream {
        addr,
        generate_requests,
        publish_requests,
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
    pub upstream: MockUpstream,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server, letting the caller adjust the configuration
    /// before the application state is built.
    pub async fn with_config<F>(mutate: F) -> Self
    where
        F: FnOnce(&mut config::AppConfig),
    {
        let upstream = spawn_mock_upstream().await;

        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let mut config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "test.example.com".to_string(),
                protocol: "https".to_string(),
                landing_path: "/dashboard.html".to_string(),
                error_path: "/".to_string(),
            },
            database: config::DatabaseConfig {
                path: db_path.clone(),
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
                allowed_emails: Vec::new(),
                linkedin: config::LinkedInOAuthConfig {
                    client_id: "test-client-id".to_string(),
                    client_secret: "test-client-secret".to_string(),
                    redirect_uri: "https://test.example.com/auth/callback".to_string(),
                    auth_url: "https://www.linkedin.com/oauth/v2/authorization".to_string(),
                    token_url: format!("{}/oauth/token", upstream.addr),
                    userinfo_url: format!("{}/oauth/userinfo", upstream.addr),
                    scope: "openid profile email w_member_social".to_string(),
                },
            },
            webhook: config::WebhookConfig {
                generate_url: format!("{}/webhook/generate", upstream.addr),
                publish_url: format!("{}/webhook/publish", upstream.addr),
                timeout_seconds: 10,
                default_brand_context: "Test brand".to_string(),
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        mutate(&mut config);

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client that does not follow redirects, so tests can
        // assert on Location headers and Set-Cookie directly.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = postforge::build_router(state.clone());

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
            upstream,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Create a user record directly in the database
    pub async fn create_user(&self, email: &str) -> data::User {
        self.state
            .db
            .find_or_create_user(email, "li-test", Some("Test User"), None)
            .await
            .unwrap()
    }

    /// Create a signed session token for an existing user
    pub fn token_for(&self, user: &data::User) -> String {
        use postforge::auth::{Session, create_session_token};

        let now = Utc::now();
        let session = Session {
            user_id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            linkedin_access_token: "test-access-token".to_string(),
            created_at: now,
            expires_at: now + Duration::days(7),
        };

        create_session_token(&session, &self.state.config.auth.session_secret)
            .expect("Failed to create test token")
    }

    /// Create a user and return a session cookie header value for them
    pub async fn login_as(&self, email: &str) -> String {
        let user = self.create_user(email).await;
        format!("session={}", self.token_for(&user))
    }

    /// Insert a draft post owned by the given user
    pub async fn create_draft_post(&self, user_id: &str) -> data::Post {
        let post = data::Post {
            id: data::EntityId::new().0,
            user_id: user_id.to_string(),
            theme: "launch".to_string(),
            post_type: "update".to_string(),
            length: "short".to_string(),
            tone: "casual".to_string(),
            brand_context: "Test brand".to_string(),
            post_text: "We shipped a thing.".to_string(),
            status: "draft".to_string(),
            external_post_id: None,
            created_at: Utc::now(),
            published_at: None,
        };
        self.state.db.insert_post(&post).await.unwrap();
        post
    }
}

/// Collect all Set-Cookie header values from a response
pub fn set_cookie_values(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(ToString::to_string))
        .collect()
}

/// Extract the value of a named cookie from Set-Cookie headers, if present
pub fn cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    set_cookie_values(response).iter().find_map(|header| {
        let (pair, _attributes) = header.split_once(';').unwrap_or((header.as_str(), ""));
        let (cookie_name, value) = pair.split_once('=')?;
        if cookie_name.trim() == name && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}
