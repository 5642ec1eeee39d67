/// Configuration management for the API server
///
/// Configuration is read once at startup from environment variables (a `.env`
/// file is honored in development) and injected into handlers through
/// [`crate::app::AppState`].
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `API_CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: *)
/// - `API_PRODUCTION`: Enables HSTS and stricter defaults (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: HS256 signing key, at least 32 characters (required)
/// - `JWT_ACCESS_TTL_MINUTES`: Access token lifetime (default: 1440)
/// - `JWT_REFRESH_TTL_DAYS`: Refresh token lifetime (default: 30)
/// - `ADMIN_EMAIL` / `ADMIN_PASSWORD`: Bootstrap admin account, created at
///   startup when no account with that email exists
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use memberhub_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use std::env;
use std::str::FromStr;

/// Longest accepted access token lifetime (30 days)
const MAX_ACCESS_TTL_MINUTES: i64 = 60 * 24 * 30;

/// Longest accepted refresh token lifetime
const MAX_REFRESH_TTL_DAYS: i64 = 365;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,

    /// First admin account, if configured
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS header)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

impl JwtConfig {
    pub fn access_ttl(&self) -> Duration {
        Duration::minutes(self.access_ttl_minutes)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::days(self.refresh_ttl_days)
    }
}

/// Credentials of the admin account created at startup
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port: u16 = parse_or(&lookup, "API_PORT", 8080)?;

        let cors_origins: Vec<String> = lookup("API_CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let production: bool = parse_or(&lookup, "API_PRODUCTION", false)?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections: u32 = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let access_ttl_minutes: i64 = parse_or(&lookup, "JWT_ACCESS_TTL_MINUTES", 1440)?;
        let refresh_ttl_days: i64 = parse_or(&lookup, "JWT_REFRESH_TTL_DAYS", 30)?;

        if access_ttl_minutes <= 0 || refresh_ttl_days <= 0 {
            anyhow::bail!("JWT token lifetimes must be positive");
        }

        if access_ttl_minutes > MAX_ACCESS_TTL_MINUTES {
            anyhow::bail!("JWT_ACCESS_TTL_MINUTES must be at most {MAX_ACCESS_TTL_MINUTES}");
        }

        if refresh_ttl_days > MAX_REFRESH_TTL_DAYS {
            anyhow::bail!("JWT_REFRESH_TTL_DAYS must be at most {MAX_REFRESH_TTL_DAYS}");
        }

        let bootstrap_admin = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            (None, None) => None,
            _ => anyhow::bail!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_ttl_minutes,
                refresh_ttl_days,
            },
            bootstrap_admin,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgresql://localhost/memberhub"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert!(!config.api.production);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.jwt.access_ttl(), Duration::hours(24));
        assert_eq!(config.jwt.refresh_ttl(), Duration::days(30));
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn test_explicit_values() {
        let config = Config::from_lookup(lookup_from(&[
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "3000"),
            ("API_CORS_ORIGINS", "https://asso.example.org, https://admin.example.org"),
            ("API_PRODUCTION", "true"),
            ("DATABASE_URL", "postgresql://localhost/memberhub"),
            ("DATABASE_MAX_CONNECTIONS", "25"),
            ("JWT_SECRET", SECRET),
            ("JWT_ACCESS_TTL_MINUTES", "60"),
            ("ADMIN_EMAIL", "admin@example.org"),
            ("ADMIN_PASSWORD", "bureau2024"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(
            config.api.cors_origins,
            vec!["https://asso.example.org", "https://admin.example.org"]
        );
        assert!(config.api.production);
        assert_eq!(config.database.max_connections, 25);
        assert_eq!(config.jwt.access_ttl(), Duration::hours(1));
        assert_eq!(config.bootstrap_admin.unwrap().email, "admin@example.org");
    }

    #[test]
    fn test_missing_required() {
        let err = Config::from_lookup(lookup_from(&[("JWT_SECRET", SECRET)])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let err = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgresql://localhost/db")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgresql://localhost/memberhub"),
            ("JWT_SECRET", "too-short"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("at least 32"));
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(lookup_from(&[
            ("API_PORT", "eighty"),
            ("DATABASE_URL", "postgresql://localhost/memberhub"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("API_PORT"));
    }

    #[test]
    fn test_token_lifetimes_are_bounded() {
        let with = |key: &str, value: &str| {
            Config::from_lookup(lookup_from(&[
                ("DATABASE_URL", "postgresql://localhost/memberhub"),
                ("JWT_SECRET", SECRET),
                (key, value),
            ]))
        };

        let err = with("JWT_ACCESS_TTL_MINUTES", "9223372036854775807").unwrap_err();
        assert!(err.to_string().contains("JWT_ACCESS_TTL_MINUTES"));

        let err = with("JWT_REFRESH_TTL_DAYS", "1000000000000").unwrap_err();
        assert!(err.to_string().contains("JWT_REFRESH_TTL_DAYS"));

        assert!(with("JWT_ACCESS_TTL_MINUTES", "0").is_err());

        let config = with("JWT_REFRESH_TTL_DAYS", "365").unwrap();
        assert_eq!(config.jwt.refresh_ttl(), Duration::days(365));
    }

    #[test]
    fn test_half_configured_admin_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgresql://localhost/memberhub"),
            ("JWT_SECRET", SECRET),
            ("ADMIN_EMAIL", "admin@example.org"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_bootstrap_password_not_in_debug() {
        let admin = BootstrapAdmin {
            email: "admin@example.org".to_string(),
            password: "bureau2024".to_string(),
        };
        assert!(!format!("{:?}", admin).contains("bureau2024"));
    }
}
