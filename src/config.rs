//! Environment-driven configuration, following the teacher's
//! `RuntimeConfig::resolve_sqlite_db_name` pattern (`dotenvy` + `std::env`)
//! generalized into one `GatewayConfig::from_env` with the startup
//! validation spec.md §6 requires: fatal in production, warning in
//! development.

use std::env;
use std::time::Duration;

use thiserror::Error;

/// `development` relaxes several checks that are hard requirements in
/// `production` (see spec.md §6 "Startup validation").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn from_env() -> Self {
        match env::var("ENVIRONMENT").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        }
    }

    #[must_use]
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub debug: bool,
    pub llm_provider: String,
    pub llm_cache_enabled: bool,
    pub llm_cache_ttl: Duration,
    pub llm_cache_max_entries: usize,
    /// Institution-unique secret mixed into every cache key
    /// (spec.md §4.5 "Session-scoped salting").
    pub cache_salt: Option<String>,
    pub database_url: Option<String>,
    pub rate_limit_per_minute: u32,
    pub rate_limit_per_hour: u32,
    pub jwt_secret_key: Option<String>,
    pub jwt_access_token_expire_minutes: i64,
    pub jwt_refresh_token_expire_days: i64,
    pub allowed_origins: Vec<String>,
}

/// One configuration problem found at startup. `fatal` mirrors spec.md §6:
/// the same issue is fatal in production and a warning in development.
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct ConfigIssue {
    pub message: String,
    pub fatal_in_production: bool,
}

impl GatewayConfig {
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let environment = Environment::from_env();
        let debug = env_bool("DEBUG", false);

        Self {
            environment,
            debug,
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "mock".to_string()),
            llm_cache_enabled: env_bool("LLM_CACHE_ENABLED", true),
            llm_cache_ttl: Duration::from_secs(env_u64("LLM_CACHE_TTL_SECONDS", 3600)),
            llm_cache_max_entries: env_u64("LLM_CACHE_MAX_ENTRIES", 10_000) as usize,
            cache_salt: env::var("CACHE_SALT").ok().filter(|s| !s.is_empty()),
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            rate_limit_per_minute: env_u64("RATE_LIMIT_PER_MINUTE", 60) as u32,
            rate_limit_per_hour: env_u64("RATE_LIMIT_PER_HOUR", 1000) as u32,
            jwt_secret_key: env::var("JWT_SECRET_KEY").ok().filter(|s| !s.is_empty()),
            jwt_access_token_expire_minutes: env_u64("JWT_ACCESS_TOKEN_EXPIRE_MINUTES", 30) as i64,
            jwt_refresh_token_expire_days: env_u64("JWT_REFRESH_TOKEN_EXPIRE_DAYS", 7) as i64,
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Every required configuration validated once at boot (spec.md §6).
    /// Returns all issues found; the caller decides fatal-vs-warn by
    /// combining `issue.fatal_in_production` with `self.environment`.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.cache_salt.is_none() {
            issues.push(ConfigIssue {
                message: "CACHE_SALT is unset; required in production".to_string(),
                fatal_in_production: true,
            });
        }

        match &self.jwt_secret_key {
            None => issues.push(ConfigIssue {
                message: "JWT_SECRET_KEY is unset".to_string(),
                fatal_in_production: true,
            }),
            Some(key) if key.len() < 32 => issues.push(ConfigIssue {
                message: format!(
                    "JWT_SECRET_KEY is {} chars, must be >= 32",
                    key.len()
                ),
                fatal_in_production: true,
            }),
            Some(_) => {}
        }

        if self.debug && self.environment.is_production() {
            issues.push(ConfigIssue {
                message: "DEBUG=true is forbidden when ENVIRONMENT=production".to_string(),
                fatal_in_production: true,
            });
        }

        let has_localhost_origin = self
            .allowed_origins
            .iter()
            .any(|o| o.contains("localhost") || o.contains("127.0.0.1"));
        if has_localhost_origin {
            issues.push(ConfigIssue {
                message: "ALLOWED_ORIGINS contains a localhost entry".to_string(),
                fatal_in_production: true,
            });
        }

        if self.database_url.is_none() {
            issues.push(ConfigIssue {
                message: "DATABASE_URL is unset; falling back to in-memory repositories"
                    .to_string(),
                fatal_in_production: false,
            });
        }

        issues
    }

    /// Apply the fatal-in-production / warn-in-development split and either
    /// return `Ok(())` or a startup error. Callers in `main` turn the `Err`
    /// into the non-zero exit code spec.md §6 requires.
    pub fn validate_for_startup(&self) -> Result<(), StartupValidationError> {
        let issues = self.validate();
        let fatal: Vec<ConfigIssue> = issues
            .iter()
            .filter(|i| self.environment.is_production() && i.fatal_in_production)
            .cloned()
            .collect();

        for issue in &issues {
            if self.environment.is_production() && issue.fatal_in_production {
                tracing::error!(message = %issue.message, "fatal startup configuration error");
            } else {
                tracing::warn!(message = %issue.message, "startup configuration warning");
            }
        }

        if fatal.is_empty() {
            Ok(())
        } else {
            Err(StartupValidationError { issues: fatal })
        }
    }
}

#[derive(Debug, Error)]
#[error("{} fatal configuration issue(s) at startup", issues.len())]
pub struct StartupValidationError {
    pub issues: Vec<ConfigIssue>,
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serializes tests that mutate process-wide env vars.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn missing_cache_salt_is_fatal_only_in_production() {
        let _g = ENV_LOCK.lock().unwrap();
        let cfg = GatewayConfig {
            environment: Environment::Development,
            cache_salt: None,
            ..base_config()
        };
        let issues = cfg.validate();
        assert!(issues.iter().any(|i| i.message.contains("CACHE_SALT")));
        assert!(cfg.validate_for_startup().is_ok());

        let cfg_prod = GatewayConfig {
            environment: Environment::Production,
            ..cfg
        };
        assert!(cfg_prod.validate_for_startup().is_err());
    }

    #[test]
    fn short_jwt_secret_is_flagged() {
        let _g = ENV_LOCK.lock().unwrap();
        let cfg = GatewayConfig {
            jwt_secret_key: Some("too-short".to_string()),
            ..base_config()
        };
        assert!(
            cfg.validate()
                .iter()
                .any(|i| i.message.contains("JWT_SECRET_KEY"))
        );
    }

    #[test]
    fn localhost_origin_forbidden_in_production_only() {
        let _g = ENV_LOCK.lock().unwrap();
        let cfg = GatewayConfig {
            environment: Environment::Production,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            ..base_config()
        };
        assert!(cfg.validate_for_startup().is_err());
    }

    fn base_config() -> GatewayConfig {
        GatewayConfig {
            environment: Environment::Development,
            debug: false,
            llm_provider: "mock".to_string(),
            llm_cache_enabled: true,
            llm_cache_ttl: Duration::from_secs(3600),
            llm_cache_max_entries: 1000,
            cache_salt: Some("institution-secret".to_string()),
            database_url: None,
            rate_limit_per_minute: 60,
            rate_limit_per_hour: 1000,
            jwt_secret_key: Some("x".repeat(32)),
            jwt_access_token_expire_minutes: 30,
            jwt_refresh_token_expire_days: 7,
            allowed_origins: vec![],
        }
    }
}
