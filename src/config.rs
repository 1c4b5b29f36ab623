use std::{env, str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;
use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};

use crate::db::{bootstrap::RetryPolicy, schema::SchemaPolicy};

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub database: DatabaseConfig,
    pub jwt_secret: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_account_per_min: u32,
    pub rate_protected_per_min: u32,

    /// Front-end origin used in email verification links
    pub app_origin: String,
    pub log_level: tracing::Level,
}

/// Everything the bootstrapper needs to reach MySQL.
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,

    pub pool_max: u32,
    pub pool_min: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,

    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub query_timeout: Duration,

    pub ssl: bool,
    pub schema_policy: SchemaPolicy,
    pub create_database: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests can feed a map.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars(&lookup);

        let host = vars.string("SERVER_HOST", "0.0.0.0");
        let port: u16 = vars.parse("PORT", 4000)?;

        Ok(Self {
            server_addr: format!("{host}:{port}"),
            database: DatabaseConfig {
                host: vars.string("DB_HOST", "localhost"),
                port: vars.parse("DB_PORT", 3306)?,
                user: vars.string("DB_USER", "root"),
                password: vars.string("DB_PASS", ""),
                name: vars.string("DB_NAME", "employee_management"),
                pool_max: vars.parse("DB_POOL_MAX", 5)?,
                pool_min: vars.parse("DB_POOL_MIN", 0)?,
                acquire_timeout: Duration::from_millis(vars.parse("DB_POOL_ACQUIRE_MS", 30_000)?),
                idle_timeout: Duration::from_millis(vars.parse("DB_POOL_IDLE_MS", 10_000)?),
                retry_attempts: vars.parse("DB_RETRY_ATTEMPTS", 5)?,
                retry_delay: Duration::from_millis(vars.parse("DB_RETRY_DELAY_MS", 5_000)?),
                query_timeout: Duration::from_millis(vars.parse("DB_QUERY_TIMEOUT_MS", 10_000)?),
                ssl: vars.parse("DB_SSL", false)?,
                schema_policy: vars.parse("DB_SCHEMA_POLICY", SchemaPolicy::Migrate)?,
                create_database: vars.parse("DB_CREATE_DATABASE", false)?,
            },
            jwt_secret: vars
                .get("JWT_SECRET")
                .ok_or_else(|| anyhow!("JWT_SECRET must be set"))?,
            access_token_ttl: vars.parse("ACCESS_TOKEN_TTL", 900)?, // default 15 min
            refresh_token_ttl: vars.parse("REFRESH_TOKEN_TTL", 604_800)?, // default 7 days
            rate_account_per_min: vars.parse("RATE_ACCOUNT_PER_MIN", 30)?,
            rate_protected_per_min: vars.parse("RATE_PROTECTED_PER_MIN", 1000)?,
            app_origin: vars.string("APP_ORIGIN", "http://localhost:4200"),
            log_level: vars.parse("LOG_LEVEL", tracing::Level::DEBUG)?,
        })
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> MySqlConnectOptions {
        self.server_options().database(&self.name)
    }

    /// Options without a default schema, used to create the database itself.
    pub fn server_options(&self) -> MySqlConnectOptions {
        let ssl_mode = if self.ssl {
            MySqlSslMode::Required
        } else {
            MySqlSslMode::Preferred
        };

        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .ssl_mode(ssl_mode)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            delay: self.retry_delay,
        }
    }
}

struct Vars<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| anyhow!("{e}"))
                .with_context(|| format!("invalid value for {key}: {raw:?}")),
            None => Ok(default),
        }
    }
}
