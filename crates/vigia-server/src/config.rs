use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            bind_address: default_bind_address(),
            cors_allowed_origins: Vec::new(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Full SeaORM connection URL; defaults to `<data_dir>/vigia.db`
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            url: None,
        }
    }
}

impl DatabaseConfig {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn connection_url(&self) -> String {
        match self.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => url.to_string(),
            None => format!(
                "sqlite://{}?mode=rwc",
                self.data_path().join("vigia.db").display()
            ),
        }
    }

    /// Connection URL with any `user:password@` credentials masked.
    pub fn redacted_url(&self) -> String {
        let url = self.connection_url();
        let Some(scheme_end) = url.find("://") else {
            return url;
        };
        let rest = &url[scheme_end + 3..];
        match rest.find('@') {
            Some(at) if rest[..at].contains(':') => {
                let user = rest[..at].split(':').next().unwrap_or_default();
                format!("{}{}:***{}", &url[..scheme_end + 3], user, &rest[at..])
            }
            _ => url,
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
    #[serde(default = "default_email")]
    pub default_email: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_expire_secs: default_token_expire_secs(),
            default_username: default_username(),
            default_password: default_password(),
            default_email: default_email(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_token_expire_secs() -> u64 {
    8 * 3600
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_password() -> String {
    "changeme".to_string()
}

fn default_email() -> String {
    "admin@example.com".to_string()
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.http_port)
    }
}
