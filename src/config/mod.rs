use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub database_url: String,
    pub redis_url: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_bucket: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub session_key: [u8; 32],
    pub session_ttl_days: u64,
    pub page_size: i64,
    pub page_cache_ttl_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        SocketAddr::from_str(&http_addr).map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        Ok(Self {
            http_addr,
            database_url: env_or_err("DATABASE_URL")?,
            redis_url: env_or("REDIS_URL", "redis://127.0.0.1/"),
            s3_endpoint: env_or_err("S3_ENDPOINT")?,
            s3_region: env_or("S3_REGION", "us-east-1"),
            s3_bucket: env_or_err("S3_BUCKET")?,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            session_key: env_key_32("SESSION_KEY")?,
            session_ttl_days: env_or_parse("SESSION_TTL_DAYS", "14")?,
            page_size: env_positive(
                "PAGE_SIZE",
                env_or_parse("PAGE_SIZE", &crate::app::paginator::DEFAULT_PAGE_SIZE.to_string())?,
            )?,
            page_cache_ttl_seconds: env_or_parse("PAGE_CACHE_TTL_SECONDS", "20")?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Startup-time bound check, so a bad value fails the boot instead of the
/// first request that uses it.
fn env_positive(key: &str, value: i64) -> Result<i64> {
    if value < 1 {
        return Err(anyhow!("invalid {}: must be at least 1", key));
    }
    Ok(value)
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_key_32(key: &str) -> Result<[u8; 32]> {
    let value = env_or_err(key)?;
    let decoded = STANDARD
        .decode(value.as_bytes())
        .map_err(|err| anyhow!("invalid {}: {}", key, err))?;
    if decoded.len() != 32 {
        return Err(anyhow!("invalid {}: expected 32 bytes", key));
    }
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&decoded);
    Ok(key_bytes)
}

#[cfg(test)]
mod tests {
    use super::env_positive;

    #[test]
    fn zero_and_negative_page_sizes_are_rejected() {
        assert!(env_positive("PAGE_SIZE", 0).is_err());
        assert!(env_positive("PAGE_SIZE", -5).is_err());
        assert_eq!(env_positive("PAGE_SIZE", 10).unwrap(), 10);
    }
}
