use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub max_request_size_bytes: usize,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    pub max_lifetime_secs: u64,
    pub acquire_timeout_secs: u64,
    pub connect_attempts: u32,
    pub connect_retry_delay_secs: u64,
    pub bootstrap_schema: bool,
}

impl DatabaseConfig {
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_secs(self.connect_retry_delay_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// HS256 shared secret issued by the identity provider
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,
    /// Published key set of the identity provider (RS256)
    pub jwks_url: Option<String>,
    pub jwks_cache_ttl_secs: u64,
    /// Upper bound on a single key set request
    pub jwks_fetch_timeout_secs: u64,
    pub issuer: Option<String>,
    pub leeway_secs: u64,
    pub auto_provision: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = v.parse().unwrap_or(self.server.request_timeout_secs);
        }
        if let Ok(v) = env::var("SERVER_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }
        if let Ok(v) = env::var("SERVER_ENABLE_REQUEST_LOGGING") {
            self.server.enable_request_logging = v.parse().unwrap_or(self.server.enable_request_logging);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Ok(v) = env::var("STORE_BACKEND") {
            match v.to_ascii_lowercase().as_str() {
                "memory" => self.database.backend = StoreBackend::Memory,
                "postgres" | "postgresql" => self.database.backend = StoreBackend::Postgres,
                _ => {}
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_MIN_CONNECTIONS") {
            self.database.min_connections = v.parse().unwrap_or(self.database.min_connections);
        }
        if let Ok(v) = env::var("DATABASE_MAX_LIFETIME_SECS") {
            self.database.max_lifetime_secs = v.parse().unwrap_or(self.database.max_lifetime_secs);
        }
        if let Ok(v) = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs = v.parse().unwrap_or(self.database.acquire_timeout_secs);
        }
        if let Ok(v) = env::var("DATABASE_CONNECT_ATTEMPTS") {
            self.database.connect_attempts = v.parse().unwrap_or(self.database.connect_attempts);
        }
        if let Ok(v) = env::var("DATABASE_CONNECT_RETRY_DELAY_SECS") {
            self.database.connect_retry_delay_secs = v.parse().unwrap_or(self.database.connect_retry_delay_secs);
        }
        if let Ok(v) = env::var("DATABASE_BOOTSTRAP_SCHEMA") {
            self.database.bootstrap_schema = v.parse().unwrap_or(self.database.bootstrap_schema);
        }

        // Identity overrides
        if let Ok(v) = env::var("CLERK_JWT_SECRET") {
            if !v.is_empty() {
                self.identity.jwt_secret = Some(v);
            }
        }
        if let Ok(v) = env::var("CLERK_JWKS_URL") {
            if !v.is_empty() {
                self.identity.jwks_url = Some(v);
            }
        }
        if let Ok(v) = env::var("IDENTITY_JWKS_CACHE_TTL_SECS") {
            self.identity.jwks_cache_ttl_secs = v.parse().unwrap_or(self.identity.jwks_cache_ttl_secs);
        }
        if let Ok(v) = env::var("IDENTITY_JWKS_FETCH_TIMEOUT_SECS") {
            self.identity.jwks_fetch_timeout_secs = v.parse().unwrap_or(self.identity.jwks_fetch_timeout_secs);
        }
        if let Ok(v) = env::var("IDENTITY_ISSUER") {
            self.identity.issuer = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("IDENTITY_LEEWAY_SECS") {
            self.identity.leeway_secs = v.parse().unwrap_or(self.identity.leeway_secs);
        }
        if let Ok(v) = env::var("IDENTITY_AUTO_PROVISION") {
            self.identity.auto_provision = v.parse().unwrap_or(self.identity.auto_provision);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                request_timeout_secs: 30,
                max_request_size_bytes: 1024 * 1024, // 1MB
                enable_request_logging: true,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 25,
                min_connections: 5,
                max_lifetime_secs: 5 * 60,
                acquire_timeout_secs: 10,
                connect_attempts: 5,
                connect_retry_delay_secs: 5,
                bootstrap_schema: true,
            },
            identity: IdentityConfig {
                jwt_secret: None,
                jwks_url: None,
                jwks_cache_ttl_secs: 3600,
                jwks_fetch_timeout_secs: 5,
                issuer: None,
                leeway_secs: 60,
                auto_provision: false,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                request_timeout_secs: 15,
                max_request_size_bytes: 512 * 1024,
                enable_request_logging: true,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 25,
                min_connections: 25,
                max_lifetime_secs: 5 * 60,
                acquire_timeout_secs: 5,
                connect_attempts: 5,
                connect_retry_delay_secs: 5,
                bootstrap_schema: false,
            },
            identity: IdentityConfig {
                jwt_secret: None,
                jwks_url: None,
                jwks_cache_ttl_secs: 3600,
                jwks_fetch_timeout_secs: 5,
                issuer: None,
                leeway_secs: 30,
                auto_provision: false,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                request_timeout_secs: 10,
                max_request_size_bytes: 256 * 1024,
                enable_request_logging: false,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 25,
                min_connections: 25,
                max_lifetime_secs: 5 * 60,
                acquire_timeout_secs: 3,
                connect_attempts: 5,
                connect_retry_delay_secs: 5,
                bootstrap_schema: false,
            },
            identity: IdentityConfig {
                jwt_secret: None,
                jwks_url: None,
                jwks_cache_ttl_secs: 3600,
                jwks_fetch_timeout_secs: 5,
                issuer: None,
                leeway_secs: 5,
                auto_provision: false,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.max_connections, 25);
        assert!(config.database.bootstrap_schema);
        assert!(!config.identity.auto_provision);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.database.min_connections, 25);
        assert_eq!(config.database.max_lifetime(), Duration::from_secs(300));
        assert!(!config.database.bootstrap_schema);
        assert!(!config.server.enable_request_logging);
    }

    #[test]
    fn test_secret_not_serialized() {
        let mut config = AppConfig::development();
        config.identity.jwt_secret = Some("shh".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("shh"));
    }
}
