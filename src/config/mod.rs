use serde::Deserialize;
use std::time::Duration;

use crate::models::PositionOptions;
use crate::tracking::reporter::ReporterConfig;
use crate::tracking::tracker::TrackerConfig;

/// Prefix for every environment variable read by [`Config::from_env`].
pub const ENV_PREFIX: &str = "SHIFTWATCH";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Fixed containment radius of every work zone.
    pub zone_radius_m: f64,
    pub sample_interval_ms: u64,
    pub outside_violation_threshold_ms: u64,
    pub collaborator_timeout_ms: u64,
    pub high_accuracy: bool,
    pub position_timeout_ms: u64,
    pub position_max_age_ms: u64,
    pub expiry_sweep_interval_ms: u64,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .set_default("port", 8080_i64)?
            .set_default("zone_radius_m", 65.0)?
            .set_default("sample_interval_ms", 450_000_i64)?
            .set_default("outside_violation_threshold_ms", 120_000_i64)?
            .set_default("collaborator_timeout_ms", 10_000_i64)?
            .set_default("high_accuracy", true)?
            .set_default("position_timeout_ms", 30_000_i64)?
            .set_default("position_max_age_ms", 0_i64)?
            .set_default("expiry_sweep_interval_ms", 300_000_i64)?
            .set_default("log_json", false)?
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.zone_radius_m.is_finite() || self.zone_radius_m <= 0.0 {
            anyhow::bail!("zone_radius_m must be positive, got {}", self.zone_radius_m);
        }
        if self.sample_interval_ms == 0 {
            anyhow::bail!("sample_interval_ms must be greater than zero");
        }
        if self.expiry_sweep_interval_ms == 0 {
            anyhow::bail!("expiry_sweep_interval_ms must be greater than zero");
        }
        if i64::try_from(self.outside_violation_threshold_ms).is_err() {
            anyhow::bail!(
                "outside_violation_threshold_ms must be at most {}, got {}",
                i64::MAX,
                self.outside_violation_threshold_ms
            );
        }
        if self.collaborator_timeout_ms == 0 {
            anyhow::bail!("collaborator_timeout_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            zone_radius_m: self.zone_radius_m,
            outside_violation_threshold_ms: i64::try_from(self.outside_violation_threshold_ms)
                .unwrap_or(i64::MAX),
        }
    }

    pub fn reporter_config(&self) -> ReporterConfig {
        ReporterConfig {
            interval: Duration::from_millis(self.sample_interval_ms),
            position_options: PositionOptions {
                high_accuracy: self.high_accuracy,
                timeout_ms: self.position_timeout_ms,
                max_age_ms: self.position_max_age_ms,
            },
            collaborator_timeout: self.collaborator_timeout(),
        }
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }

    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.expiry_sweep_interval_ms)
    }
}
