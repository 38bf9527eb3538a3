use anyhow::Result;
use std::env;
use crate::constants::DEFAULT_SWEEP_INTERVAL_SECS;

#[derive(Debug, Clone)]
pub struct Config {
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let sweep_interval_secs = match env::var("SWEEP_INTERVAL_SECS") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid SWEEP_INTERVAL_SECS '{}': {}", raw, e))?,
            Err(_) => DEFAULT_SWEEP_INTERVAL_SECS,
        };
        if sweep_interval_secs == 0 {
            return Err(anyhow::anyhow!("SWEEP_INTERVAL_SECS must be greater than zero"));
        }

        Ok(Self { sweep_interval_secs })
    }
}
