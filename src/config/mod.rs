use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::storage::{KeyScope, SelectionKey, DEFAULT_SELECTION_KEY};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub directory: DirectoryConfig,
    pub auth: AuthConfig,
    pub selection: SelectionConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryBackend {
    Rest,
    Postgres,
    Fixture,
}

impl DirectoryBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "rest" | "supabase" => Some(DirectoryBackend::Rest),
            "postgres" | "pg" => Some(DirectoryBackend::Postgres),
            "fixture" | "memory" => Some(DirectoryBackend::Fixture),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    pub backend: DirectoryBackend,
    pub rest_url: String,
    #[serde(skip_serializing)]
    pub anon_key: Option<String>,
    #[serde(skip_serializing)]
    pub database_url: Option<String>,
    pub fixture_path: Option<PathBuf>,
    pub timeout_secs: u64,
    pub max_connections: u32,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            backend: DirectoryBackend::Rest,
            rest_url: "http://127.0.0.1:54321".to_string(),
            anon_key: None,
            database_url: None,
            fixture_path: None,
            timeout_secs: 30,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,
    pub jwt_audience: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_audience: "authenticated".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub key: String,
    pub scope: KeyScope,
    pub state_dir: Option<PathBuf>,
}

impl SelectionConfig {
    pub fn selection_key(&self) -> SelectionKey {
        SelectionKey::new(self.key.clone(), self.scope)
    }

    /// Directory holding the persisted selection
    pub fn state_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.state_dir {
            return Ok(dir.clone());
        }
        let home = env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        Ok(PathBuf::from(home).join(".config").join("company-context"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Directory overrides
        if let Ok(v) = env::var("DIRECTORY_BACKEND") {
            match DirectoryBackend::parse(&v) {
                Some(backend) => self.directory.backend = backend,
                None => tracing::warn!("Ignoring unknown DIRECTORY_BACKEND '{}'", v),
            }
        }
        if let Ok(v) = env::var("SUPABASE_URL") {
            self.directory.rest_url = v;
        }
        if let Ok(v) = env::var("SUPABASE_ANON_KEY") {
            self.directory.anon_key = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.directory.database_url = Some(v);
        }
        if let Ok(v) = env::var("DIRECTORY_FIXTURE") {
            self.directory.fixture_path = Some(PathBuf::from(v));
        }
        if let Ok(v) = env::var("DIRECTORY_TIMEOUT_SECS") {
            self.directory.timeout_secs = v.parse().unwrap_or(self.directory.timeout_secs);
        }
        if let Ok(v) = env::var("DIRECTORY_MAX_CONNECTIONS") {
            self.directory.max_connections = v.parse().unwrap_or(self.directory.max_connections);
        }

        // Auth overrides
        if let Ok(v) = env::var("SUPABASE_JWT_SECRET") {
            self.auth.jwt_secret = Some(v);
        }
        if let Ok(v) = env::var("SUPABASE_JWT_AUDIENCE") {
            self.auth.jwt_audience = v;
        }

        // Selection overrides
        if let Ok(v) = env::var("SELECTION_KEY") {
            self.selection.key = v;
        }
        if let Ok(v) = env::var("SELECTION_SCOPE") {
            match v.as_str() {
                "global" => self.selection.scope = KeyScope::Global,
                "per_identity" | "identity" => self.selection.scope = KeyScope::PerIdentity,
                other => tracing::warn!("Ignoring unknown SELECTION_SCOPE '{}'", other),
            }
        }
        if let Ok(v) = env::var("COMPANY_CONTEXT_STATE_DIR") {
            self.selection.state_dir = Some(PathBuf::from(v));
        }

        // Server overrides
        if let Ok(v) = env::var("COMPANY_CONTEXT_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_ENABLE_CORS") {
            self.server.enable_cors = v.parse().unwrap_or(self.server.enable_cors);
        }
        if let Ok(v) = env::var("SERVER_CORS_ORIGINS") {
            self.server.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            directory: DirectoryConfig::default(),
            auth: AuthConfig::default(),
            selection: SelectionConfig {
                key: DEFAULT_SELECTION_KEY.to_string(),
                scope: KeyScope::Global,
                state_dir: None,
            },
            server: ServerConfig {
                port: 3030,
                enable_cors: true,
                cors_origins: vec!["http://localhost:5173".to_string(), "http://localhost:3000".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            directory: DirectoryConfig {
                timeout_secs: 15,
                max_connections: 10,
                ..DirectoryConfig::default()
            },
            auth: AuthConfig::default(),
            selection: SelectionConfig {
                key: DEFAULT_SELECTION_KEY.to_string(),
                scope: KeyScope::Global,
                state_dir: None,
            },
            server: ServerConfig {
                port: 3030,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            directory: DirectoryConfig {
                timeout_secs: 10,
                max_connections: 20,
                ..DirectoryConfig::default()
            },
            auth: AuthConfig::default(),
            selection: SelectionConfig {
                key: DEFAULT_SELECTION_KEY.to_string(),
                scope: KeyScope::Global,
                state_dir: None,
            },
            server: ServerConfig {
                port: 3030,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }
}

// Process-wide config for the binaries. Library code takes config by reference.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
