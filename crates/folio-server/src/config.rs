use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// CORS origins; empty allows any origin (development mode)
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            cors_allowed_origins: Vec::new(),
            database: DatabaseConfig::default(),
            media: MediaConfig::default(),
            auth: AuthConfig::default(),
            inference: InferenceConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config '{path}': {e}"))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config '{path}': {e}"))?;
        Ok(config)
    }

    /// Directory uploaded files are written to and served from.
    pub fn media_root(&self) -> PathBuf {
        match &self.media.root {
            Some(root) => PathBuf::from(root),
            None => PathBuf::from(&self.database.data_dir).join("media"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL; a SQLite file in `data_dir` when unset
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            data_dir: default_data_dir(),
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => folio_storage::sqlite_url(std::path::Path::new(&self.data_dir), "folio.db"),
        }
    }

    /// The connection URL with any password replaced, for logging.
    pub fn redacted_url(&self) -> String {
        let url = self.connection_url();
        let Some((scheme, rest)) = url.split_once("://") else {
            return url;
        };
        match rest.split_once('@') {
            Some((userinfo, host)) => {
                let user = userinfo.split(':').next().unwrap_or_default();
                format!("{scheme}://{user}:***@{host}")
            }
            None => url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: None,
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default = "default_token_expire_secs")]
    pub token_expire_secs: u64,
    #[serde(default = "default_username")]
    pub default_username: String,
    #[serde(default = "default_password")]
    pub default_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_expire_secs: default_token_expire_secs(),
            default_username: default_username(),
            default_password: default_password(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// When false the inference routes are not mounted at all
    #[serde(default = "default_inference_enabled")]
    pub enabled: bool,
    #[serde(default = "default_min_latency_ms")]
    pub min_latency_ms: u64,
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_inference_enabled(),
            min_latency_ms: default_min_latency_ms(),
            max_latency_ms: default_max_latency_ms(),
        }
    }
}

// ---- Seed file types (used by the `init-tags` CLI subcommand) ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSeedFile {
    #[serde(default)]
    pub tags: Vec<SeedTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedTag {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

fn default_http_port() -> u16 {
    8080
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_max_image_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_token_expire_secs() -> u64 {
    86400
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_password() -> String {
    "changeme".to_string()
}

fn default_inference_enabled() -> bool {
    true
}

fn default_min_latency_ms() -> u64 {
    100
}

fn default_max_latency_ms() -> u64 {
    800
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.auth.default_username, "admin");
        assert_eq!(config.auth.token_expire_secs, 86400);
        assert!(config.inference.enabled);
        assert_eq!(config.media.max_image_bytes, 10 * 1024 * 1024);
        assert_eq!(config.media_root(), PathBuf::from("data").join("media"));
        assert!(config.database.connection_url().starts_with("sqlite://"));
    }

    #[test]
    fn sections_override_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            http_port = 9000

            [database]
            url = "postgres://folio:hunter2@db:5432/folio"

            [media]
            root = "/srv/media"

            [inference]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.media_root(), PathBuf::from("/srv/media"));
        assert!(!config.inference.enabled);
        assert_eq!(config.inference.max_latency_ms, 800);
        assert_eq!(
            config.database.redacted_url(),
            "postgres://folio:***@db:5432/folio"
        );
    }

    #[test]
    fn tag_seed_color_is_optional() {
        let seed: TagSeedFile =
            serde_json::from_str(r##"{"tags":[{"name":"Rust"},{"name":"Go","color":"#00add8"}]}"##).unwrap();
        assert_eq!(seed.tags.len(), 2);
        assert!(seed.tags[0].color.is_none());
    }
}
