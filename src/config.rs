use anyhow::{anyhow, Context, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

#[derive(Debug, Clone)]
pub struct Config {
    pub overpass: OverpassConfig,
    pub canvas: CanvasConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl std::str::FromStr for HttpMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            other => Err(anyhow!("unsupported HTTP method '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OverpassConfig {
    pub url: String,
    pub method: HttpMethod,
    /// Client-side cap on one HTTP exchange; the server-side limit is the
    /// `timeout` query setting
    pub http_timeout: Duration,
    pub rate_limit_per_second: u32,
    pub user_agent: String,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OVERPASS_URL.to_string(),
            method: HttpMethod::Get,
            http_timeout: Duration::from_secs(180),
            rate_limit_per_second: 1,
            user_agent: format!("skyway/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CanvasConfig {
    pub bucket: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let defaults = OverpassConfig::default();

        Ok(Config {
            overpass: OverpassConfig {
                url: env::var("OVERPASS_URL").unwrap_or(defaults.url),
                method: env::var("OVERPASS_METHOD")
                    .unwrap_or_else(|_| "GET".to_string())
                    .parse()
                    .context("OVERPASS_METHOD must be GET or POST")?,
                http_timeout: Duration::from_secs(
                    env::var("OVERPASS_HTTP_TIMEOUT_SECONDS")
                        .unwrap_or_else(|_| "180".to_string())
                        .parse()
                        .context("OVERPASS_HTTP_TIMEOUT_SECONDS must be a valid number")?,
                ),
                rate_limit_per_second: env::var("OVERPASS_RATE_LIMIT_PER_SECOND")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()
                    .context("OVERPASS_RATE_LIMIT_PER_SECOND must be a valid number")?,
                user_agent: env::var("OVERPASS_USER_AGENT").unwrap_or(defaults.user_agent),
            },
            canvas: CanvasConfig {
                bucket: env::var("CANVAS_BUCKET").ok(),
            },
        })
    }
}
