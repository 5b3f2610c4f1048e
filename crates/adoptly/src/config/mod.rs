use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

const DEV_TOKEN_SECRET: &str = "adoptly-development-token-secret-change-me";
const DEV_MESSAGE_KEY_SEED: &str = "adoptly-development-message-key";
const MIN_TOKEN_SECRET_LEN: usize = 32;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub security: SecurityConfig,
    pub adoption: AdoptionConfig,
    pub bootstrap_admin: Option<AdminBootstrap>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            security: SecurityConfig::from_env(environment)?,
            adoption: AdoptionConfig::from_env()?,
            bootstrap_admin: AdminBootstrap::from_env(),
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Secrets and lifetimes for access tokens, reset tokens, and message encryption.
#[derive(Clone)]
pub struct SecurityConfig {
    pub token_secret: String,
    pub token_ttl_minutes: i64,
    pub reset_ttl_minutes: i64,
    pub message_key: [u8; 32],
    /// Echo password-reset tokens in API responses (never in production).
    pub expose_reset_tokens: bool,
    pub secure_cookies: bool,
}

impl SecurityConfig {
    fn from_env(environment: AppEnvironment) -> Result<Self, ConfigError> {
        let token_secret = match env::var("ACCESS_TOKEN_SECRET") {
            Ok(secret) => secret,
            Err(_) if environment.is_production() => {
                return Err(ConfigError::Missing("ACCESS_TOKEN_SECRET"))
            }
            Err(_) => DEV_TOKEN_SECRET.to_string(),
        };
        if token_secret.len() < MIN_TOKEN_SECRET_LEN {
            return Err(ConfigError::WeakTokenSecret);
        }

        let message_key = match env::var("MESSAGE_ENCRYPTION_KEY") {
            Ok(raw) => decode_message_key(&raw)?,
            Err(_) if environment.is_production() => {
                return Err(ConfigError::Missing("MESSAGE_ENCRYPTION_KEY"))
            }
            Err(_) => Sha256::digest(DEV_MESSAGE_KEY_SEED.as_bytes()).into(),
        };

        Ok(Self {
            token_secret,
            token_ttl_minutes: minutes_var("ACCESS_TOKEN_TTL_MINUTES", 24 * 60)?,
            reset_ttl_minutes: minutes_var("RESET_TOKEN_TTL_MINUTES", 30)?,
            message_key,
            expose_reset_tokens: !environment.is_production(),
            secure_cookies: environment.is_production(),
        })
    }

    /// Deterministic settings for tests and local demos.
    pub fn development() -> Self {
        Self {
            token_secret: DEV_TOKEN_SECRET.to_string(),
            token_ttl_minutes: 24 * 60,
            reset_ttl_minutes: 30,
            message_key: Sha256::digest(DEV_MESSAGE_KEY_SEED.as_bytes()).into(),
            expose_reset_tokens: true,
            secure_cookies: false,
        }
    }
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("token_secret", &"<redacted>")
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("reset_ttl_minutes", &self.reset_ttl_minutes)
            .field("message_key", &"<redacted>")
            .field("expose_reset_tokens", &self.expose_reset_tokens)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

fn decode_message_key(raw: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = STANDARD
        .decode(raw.trim())
        .map_err(|_| ConfigError::InvalidMessageKey)?;
    bytes.try_into().map_err(|_| ConfigError::InvalidMessageKey)
}

fn minutes_var(name: &'static str, default: i64) -> Result<i64, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse::<i64>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidDuration(name)),
        },
        Err(_) => Ok(default),
    }
}

/// Which party may withdraw a pending adoption request, read from `ADOPTION_DELETE_AUTHORITY`.
///
/// Deployments that want the older owner-only rule, where a listing's owner clears requests
/// off their own pet, set `owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteAuthority {
    /// The person who asked to adopt withdraws their own request.
    #[default]
    Requester,
    /// Only the pet's owner may delete requests for it.
    PetOwner,
    Either,
}

impl DeleteAuthority {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "requester" => Some(Self::Requester),
            "owner" | "pet_owner" => Some(Self::PetOwner),
            "either" | "both" => Some(Self::Either),
            _ => None,
        }
    }
}

/// Adoption workflow policy knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdoptionConfig {
    pub delete_authority: DeleteAuthority,
}

impl AdoptionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let delete_authority = match env::var("ADOPTION_DELETE_AUTHORITY") {
            Ok(raw) => DeleteAuthority::parse(&raw).ok_or(ConfigError::InvalidDeleteAuthority)?,
            Err(_) => DeleteAuthority::default(),
        };
        Ok(Self { delete_authority })
    }
}

/// Admin account created at startup when all three variables are present.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl AdminBootstrap {
    fn from_env() -> Option<Self> {
        Some(Self {
            email: env::var("ADMIN_EMAIL").ok()?,
            username: env::var("ADMIN_USERNAME").ok()?,
            password: env::var("ADMIN_PASSWORD").ok()?,
        })
    }
}

impl fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("email", &self.email)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    Missing(&'static str),
    WeakTokenSecret,
    InvalidMessageKey,
    InvalidDuration(&'static str),
    InvalidDeleteAuthority,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::Missing(name) => write!(f, "{name} must be set in production"),
            ConfigError::WeakTokenSecret => write!(
                f,
                "ACCESS_TOKEN_SECRET must be at least {MIN_TOKEN_SECRET_LEN} bytes"
            ),
            ConfigError::InvalidMessageKey => {
                write!(f, "MESSAGE_ENCRYPTION_KEY must be 32 bytes encoded as base64")
            }
            ConfigError::InvalidDuration(name) => {
                write!(f, "{name} must be a positive number of minutes")
            }
            ConfigError::InvalidDeleteAuthority => write!(
                f,
                "ADOPTION_DELETE_AUTHORITY must be one of requester, owner, either"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "ACCESS_TOKEN_SECRET",
            "ACCESS_TOKEN_TTL_MINUTES",
            "RESET_TOKEN_TTL_MINUTES",
            "MESSAGE_ENCRYPTION_KEY",
            "ADOPTION_DELETE_AUTHORITY",
            "ADMIN_EMAIL",
            "ADMIN_USERNAME",
            "ADMIN_PASSWORD",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.security.token_ttl_minutes, 1440);
        assert_eq!(config.adoption.delete_authority, DeleteAuthority::Requester);
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn production_requires_secrets() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        match AppConfig::load() {
            Err(ConfigError::Missing("ACCESS_TOKEN_SECRET")) => {}
            other => panic!("expected missing secret, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn message_key_must_decode_to_32_bytes() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MESSAGE_ENCRYPTION_KEY", STANDARD.encode([7u8; 16]));
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidMessageKey)
        ));

        env::set_var("MESSAGE_ENCRYPTION_KEY", STANDARD.encode([7u8; 32]));
        let config = AppConfig::load().expect("valid key");
        assert_eq!(config.security.message_key, [7u8; 32]);
        reset_env();
    }

    #[test]
    fn delete_authority_parses_aliases() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ADOPTION_DELETE_AUTHORITY", "owner");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.adoption.delete_authority, DeleteAuthority::PetOwner);

        env::set_var("ADOPTION_DELETE_AUTHORITY", "nobody");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidDeleteAuthority)
        ));
        reset_env();
    }
}
