use anyhow::{Context, Result};
use std::env;
use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: IpAddr,
    pub http_port: u16,
    pub yahoo_base_url: String,
    pub asset_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .context("Failed to parse BIND_ADDR")?;

        let http_port = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()
            .context("Failed to parse HTTP_PORT")?;

        let yahoo_base_url = env::var("YAHOO_BASE_URL")
            .unwrap_or_else(|_| "https://query1.finance.yahoo.com".to_string());

        let asset_dir = env::var("ASSET_DIR").unwrap_or_else(|_| "static".to_string());

        Ok(Self {
            bind_addr,
            http_port,
            yahoo_base_url,
            asset_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.http_port, 5000);
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0");
        assert_eq!(config.yahoo_base_url, "https://query1.finance.yahoo.com");
        assert_eq!(config.asset_dir, "static");
    }
}
