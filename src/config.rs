use std::{env, path::PathBuf};

use anyhow::bail;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::services::penalty::PenaltyPolicy;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    pub server: ServerConfig,
    pub billing: BillingConfig,
    pub payments: PaymentConfig,
    pub scheduler: SchedulerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub rate_limit_per_second: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BillingConfig {
    pub penalty_interval_minutes: i64,
    pub penalty_per_interval: Decimal,
    /// Zero leaves penalty accrual uncapped.
    pub penalty_max_intervals: i64,
    pub suspension_after_hours: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentConfig {
    pub failure_rate: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    pub tick_interval_ms: u64,
    pub standing_sweep_interval_sec: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub data_file: Option<PathBuf>,
}

impl BillingConfig {
    pub fn penalty_policy(&self) -> PenaltyPolicy {
        PenaltyPolicy {
            interval_ms: self.penalty_interval_minutes.saturating_mul(60_000),
            amount_per_interval: self.penalty_per_interval,
            max_intervals: (self.penalty_max_intervals > 0).then_some(self.penalty_max_intervals),
        }
    }

    pub fn suspension_after(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.suspension_after_hours).unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            penalty_interval_minutes: 15,
            penalty_per_interval: Decimal::from(10),
            penalty_max_intervals: 192,
            suspension_after_hours: 48,
        }
    }
}

impl GlobalConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = BillingConfig::default();

        let config = GlobalConfig {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: lookup("PORT")
                    .or_else(|| lookup("SERVER_PORT"))
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(8080),
                cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|| "http://localhost:3000".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                rate_limit_per_second: lookup("RATE_LIMIT_PER_SECOND")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(100),
            },
            billing: BillingConfig {
                penalty_interval_minutes: lookup("PENALTY_INTERVAL_MINUTES")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.penalty_interval_minutes),
                penalty_per_interval: lookup("PENALTY_PER_INTERVAL")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.penalty_per_interval),
                penalty_max_intervals: lookup("PENALTY_MAX_INTERVALS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.penalty_max_intervals),
                suspension_after_hours: lookup("SUSPENSION_AFTER_HOURS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.suspension_after_hours),
            },
            payments: PaymentConfig {
                failure_rate: lookup("PAYMENT_FAILURE_RATE")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.0),
            },
            scheduler: SchedulerConfig {
                tick_interval_ms: lookup("TICK_INTERVAL_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1000),
                standing_sweep_interval_sec: lookup("STANDING_SWEEP_INTERVAL_SEC")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(300),
            },
            storage: StorageConfig {
                data_file: lookup("PARKEASE_DATA_FILE")
                    .filter(|v| !v.trim().is_empty())
                    .map(PathBuf::from),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.billing.penalty_interval_minutes <= 0 {
            bail!("PENALTY_INTERVAL_MINUTES must be positive");
        }
        if self.billing.penalty_per_interval < Decimal::ZERO {
            bail!("PENALTY_PER_INTERVAL must not be negative");
        }
        if self.billing.suspension_after_hours <= 0 {
            bail!("SUSPENSION_AFTER_HOURS must be positive");
        }
        if !(0.0..=1.0).contains(&self.payments.failure_rate) {
            bail!("PAYMENT_FAILURE_RATE must be between 0 and 1");
        }
        if self.scheduler.tick_interval_ms == 0 || self.scheduler.standing_sweep_interval_sec == 0 {
            bail!("Scheduler intervals must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<GlobalConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GlobalConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_reference_tariff() {
        let config = config_from(&[]).unwrap();
        let policy = config.billing.penalty_policy();

        assert_eq!(config.server.port, 8080);
        assert_eq!(policy.interval_ms, 900_000);
        assert_eq!(policy.amount_per_interval, Decimal::from(10));
        assert_eq!(policy.max_intervals, Some(192));
        assert_eq!(config.billing.suspension_after(), chrono::Duration::hours(48));
        assert!(config.storage.data_file.is_none());
    }

    #[test]
    fn port_falls_back_to_server_port() {
        let config = config_from(&[("SERVER_PORT", "9090")]).unwrap();
        assert_eq!(config.server.port, 9090);

        let config = config_from(&[("PORT", "7070"), ("SERVER_PORT", "9090")]).unwrap();
        assert_eq!(config.server.port, 7070);
    }

    #[test]
    fn zero_max_intervals_disables_cap() {
        let config = config_from(&[("PENALTY_MAX_INTERVALS", "0")]).unwrap();
        assert_eq!(config.billing.penalty_policy().max_intervals, None);
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let config = config_from(&[(
            "CORS_ALLOWED_ORIGINS",
            "http://a.test, http://b.test ,",
        )])
        .unwrap();

        assert_eq!(
            config.server.cors_allowed_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn rejects_non_positive_penalty_interval() {
        assert!(config_from(&[("PENALTY_INTERVAL_MINUTES", "0")]).is_err());
    }

    #[test]
    fn rejects_out_of_range_failure_rate() {
        assert!(config_from(&[("PAYMENT_FAILURE_RATE", "1.5")]).is_err());
    }
}
