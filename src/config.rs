//! Application configuration management.
//!
//! Process-level configuration comes from environment variables, loaded
//! through the `envy` crate into a type-safe struct. Runtime-tunable
//! settings (API toggle, rate limit, webhook target) live in the database
//! instead; see [`crate::models::settings::Settings`].

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (optional): SQLite connection string, defaults to
///   `sqlite:pagebuilder.db`
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `SITE_URL` (optional): public base URL used for page links and the
///   webhook payload's site identity
/// - `SITE_NAME` (optional): human-readable site name for webhook payloads
/// - `ADMIN_TOKEN` (optional): bearer token protecting the `/admin` routes.
///   When empty, every admin request is rejected.
/// - `MAX_PAGES_PER_REQUEST` (optional): bulk-create batch cap, defaults
///   to 100
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_site_url")]
    pub site_url: String,

    #[serde(default = "default_site_name")]
    pub site_name: String,

    #[serde(default)]
    pub admin_token: String,

    #[serde(default = "default_max_pages")]
    pub max_pages_per_request: usize,
}

fn default_database_url() -> String {
    "sqlite:pagebuilder.db".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_site_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_site_name() -> String {
    "Page Builder".to_string()
}

fn default_max_pages() -> usize {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            server_port: default_port(),
            site_url: default_site_url(),
            site_name: default_site_name(),
            admin_token: String::new(),
            max_pages_per_request: default_max_pages(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is read first if present (ignored when missing), then
    /// the environment is deserialized into a `Config`.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()
    }
}
