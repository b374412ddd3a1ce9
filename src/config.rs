use std::env;
use std::fs;
use std::path::Path;

use dotenvy::dotenv;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Tunables for every analytics component. The defaults reproduce the
/// reference scoring scale; `roi_*_threshold` in particular depend on the
/// x10 / x15 constants in the ROI formulas and may need recalibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pareto_top_topics: usize,
    pub fatigue_bucket_size: u32,
    pub default_target_seconds: f64,

    pub panic_min_chain: usize,
    pub panic_top_events: usize,

    pub min_trend_records: usize,
    pub min_cohort_size: f64,
    pub cohort_headroom: f64,

    pub min_simulation_records: usize,
    pub simulation_runs: usize,
    pub histogram_buckets: usize,
    pub default_target_rank: u32,

    pub roi_min_attempts: usize,
    pub roi_impact_threshold: f64,
    pub roi_effort_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pareto_top_topics: 20,
            fatigue_bucket_size: 10,
            default_target_seconds: 120.0,
            panic_min_chain: 3,
            panic_top_events: 5,
            min_trend_records: 2,
            min_cohort_size: 10_000.0,
            cohort_headroom: 1.2,
            min_simulation_records: 3,
            simulation_runs: 5000,
            histogram_buckets: 40,
            default_target_rank: 1000,
            roi_min_attempts: 3,
            roi_impact_threshold: 30.0,
            roi_effort_threshold: 30.0,
        }
    }
}

impl EngineConfig {
    /// Reads a JSON file; any field left out keeps its default.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.simulation_runs == 0 {
            return Err(EngineError::InvalidInput("simulation_runs must be positive".into()));
        }
        if self.histogram_buckets == 0 {
            return Err(EngineError::InvalidInput("histogram_buckets must be positive".into()));
        }
        if self.fatigue_bucket_size == 0 {
            return Err(EngineError::InvalidInput("fatigue_bucket_size must be positive".into()));
        }
        if self.panic_min_chain == 0 {
            return Err(EngineError::InvalidInput("panic_min_chain must be positive".into()));
        }
        Ok(())
    }
}

/// Settings for the HTTP binary, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: Option<String>,
    pub engine_config: Option<String>,
    pub rust_log: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| EngineError::InvalidInput(format!("PORT is not a valid port: {raw}")))?,
            Err(_) => 8080,
        };
        let data_dir = env::var("DATA_DIR").ok();
        let engine_config = env::var("ENGINE_CONFIG").ok();
        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            host,
            port,
            data_dir,
            engine_config,
            rust_log,
        })
    }

    pub fn load_engine_config(&self) -> Result<EngineConfig> {
        match &self.engine_config {
            Some(path) => EngineConfig::from_file(path),
            None => Ok(EngineConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "roi_impact_threshold": 45.0, "simulation_runs": 1000 }}"#).unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.roi_impact_threshold, 45.0);
        assert_eq!(config.simulation_runs, 1000);
        assert_eq!(config.roi_effort_threshold, 30.0);
        assert_eq!(config.panic_min_chain, 3);
    }

    #[test]
    fn test_zero_runs_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "simulation_runs": 0 }}"#).unwrap();

        assert!(matches!(
            EngineConfig::from_file(file.path()),
            Err(EngineError::InvalidInput(_))
        ));
    }
}
