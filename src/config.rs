//! TOML configuration for the dashboard service.
//!
//! Layered lookup: explicit path, `TAMS_CONFIG`, `/etc/tams/tams.toml`, then
//! compiled-in defaults. Every section is optional.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::scoring::CriticalityPolicy;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TAMS_CONFIG";
const SYSTEM_CONFIG_PATH: &str = "/etc/tams/tams.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scoring: CriticalityPolicy,
    #[serde(default)]
    pub kpi: KpiConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DashboardConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded dashboard configuration");
        Ok(config)
    }

    /// An explicitly requested file must load; otherwise fall back through
    /// [`Self::load_or_default`].
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Ok(Self::load_or_default()),
        }
    }

    /// Try, in order: `$TAMS_CONFIG`, `/etc/tams/tams.toml`, defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "TAMS_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP API listens on.
    pub bind: String,
    /// SQLite database file.
    pub db_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            db_path: "data/tams.db".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// KPI estimates
// ---------------------------------------------------------------------------

/// Constants behind the estimated KPIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiConfig {
    /// Scheduled capacity per maintenance-window day.
    pub hours_per_window_day: f64,
    /// Assumed work consumed by each anomaly assigned to a window.
    pub hours_per_assigned_anomaly: f64,
    /// Most recent resolved anomalies sampled for resolution time.
    pub resolution_sample_size: usize,
    /// Share of critical anomalies counted as safety incidents.
    pub safety_incident_ratio: f64,
    /// Cost of one remediation hour, in currency units.
    pub hourly_cost_rate: f64,
    /// Look-back for change statistics.
    pub change_window_days: i64,
}

impl Default for KpiConfig {
    fn default() -> Self {
        Self {
            hours_per_window_day: 8.0,
            hours_per_assigned_anomaly: 4.0,
            resolution_sample_size: 100,
            safety_incident_ratio: 0.1,
            hourly_cost_rate: 1500.0,
            change_window_days: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Rows kept per anomaly enrichment query.
    pub enrichment_limit: usize,
    /// Upcoming maintenance windows fetched.
    pub maintenance_limit: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enrichment_limit: 5,
            maintenance_limit: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the config.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
