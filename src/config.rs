//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub webhook: WebhookConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "studio.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
    /// Path the browser lands on after a successful login
    #[serde(default = "default_landing_path")]
    pub landing_path: String,
    /// Path failed logins are redirected to (receives an `error` query param)
    #[serde(default = "default_error_path")]
    pub error_path: String,
}

fn default_landing_path() -> String {
    "/dashboard.html".to_string()
}

fn default_error_path() -> String {
    "/".to_string()
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://studio.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Authentication configuration (LinkedIn OAuth + session signing)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session secret key (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
    /// Emails permitted to sign in. Empty means any authenticated
    /// LinkedIn identity is accepted.
    #[serde(default)]
    pub allowed_emails: Vec<String>,
    pub linkedin: LinkedInOAuthConfig,
}

impl AuthConfig {
    /// Check an email against the configured allow-list.
    pub fn is_email_allowed(&self, email: &str) -> bool {
        self.allowed_emails.is_empty()
            || self
                .allowed_emails
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(email))
    }
}

/// LinkedIn OAuth configuration
///
/// The provider endpoint URLs default to LinkedIn's production endpoints;
/// they are overridable so tests can point the flow at a local server.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkedInOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Redirect URI registered with the provider (the callback URL)
    pub redirect_uri: String,
    #[serde(default = "default_linkedin_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_linkedin_token_url")]
    pub token_url: String,
    #[serde(default = "default_linkedin_userinfo_url")]
    pub userinfo_url: String,
    #[serde(default = "default_linkedin_scope")]
    pub scope: String,
}

fn default_linkedin_auth_url() -> String {
    "https://www.linkedin.com/oauth/v2/authorization".to_string()
}

fn default_linkedin_token_url() -> String {
    "https://www.linkedin.com/oauth/v2/accessToken".to_string()
}

fn default_linkedin_userinfo_url() -> String {
    "https://api.linkedin.com/v2/userinfo".to_string()
}

fn default_linkedin_scope() -> String {
    "openid profile email w_member_social".to_string()
}

/// Automation webhook configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Endpoint that turns generation parameters into post text
    pub generate_url: String,
    /// Endpoint that publishes post text to LinkedIn
    pub publish_url: String,
    /// Per-call timeout in seconds (default: 30)
    #[serde(default = "default_webhook_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Brand context sent to the generate webhook when the caller omits one
    #[serde(default)]
    pub default_brand_context: String,
}

fn default_webhook_timeout_seconds() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (POSTFORGE_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.protocol", "http")?
            .set_default("server.landing_path", "/dashboard.html")?
            .set_default("server.error_path", "/")?
            .set_default("auth.session_max_age", 604800)?
            .set_default("webhook.timeout_seconds", 30)?
            .set_default("webhook.default_brand_context", "")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (POSTFORGE_*)
            .add_source(
                Environment::with_prefix("POSTFORGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        let linkedin = &self.auth.linkedin;
        if linkedin.client_id.trim().is_empty()
            || linkedin.client_secret.trim().is_empty()
            || linkedin.redirect_uri.trim().is_empty()
        {
            // The client only ever sees a generic error; the specifics stay
            // in the startup log.
            tracing::error!(
                has_client_id = !linkedin.client_id.trim().is_empty(),
                has_client_secret = !linkedin.client_secret.trim().is_empty(),
                has_redirect_uri = !linkedin.redirect_uri.trim().is_empty(),
                "LinkedIn OAuth is not fully configured"
            );
            return Err(crate::error::AppError::Config(
                "LinkedIn OAuth not configured".to_string(),
            ));
        }

        if self.webhook.generate_url.trim().is_empty()
            || self.webhook.publish_url.trim().is_empty()
        {
            tracing::error!(
                has_generate_url = !self.webhook.generate_url.trim().is_empty(),
                has_publish_url = !self.webhook.publish_url.trim().is_empty(),
                "Automation webhook is not fully configured"
            );
            return Err(crate::error::AppError::Config(
                "Automation webhook not configured".to_string(),
            ));
        }

        if self.webhook.timeout_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "webhook.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
