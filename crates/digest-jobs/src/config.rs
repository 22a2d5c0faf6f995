use anyhow::{Context, Result};
use chrono_tz::Tz;
use notification_service::NotificationConfig;

#[derive(Debug, Clone)]
pub struct JobsConfig {
    pub database_url: String,
    /// Local timezone for schedules and report windows.
    pub timezone: Tz,
    pub tick_seconds: u64,
    pub win_rate_precision: u32,
    pub notification: NotificationConfig,
}

impl JobsConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), NotificationConfig::from_env())
    }

    fn from_lookup(
        get: impl Fn(&str) -> Option<String>,
        notification: NotificationConfig,
    ) -> Result<Self> {
        let var = |key: &str| get(key).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let timezone_name = var("JOBS_TIMEZONE").unwrap_or_else(|| "America/New_York".to_string());
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid JOBS_TIMEZONE: {}", timezone_name))?;

        let tick_seconds: u64 = var("SCHEDULER_TICK_SECONDS")
            .unwrap_or_else(|| "60".to_string())
            .parse()
            .context("SCHEDULER_TICK_SECONDS must be a whole number of seconds")?;
        if tick_seconds == 0 {
            anyhow::bail!("SCHEDULER_TICK_SECONDS must be greater than zero");
        }

        let win_rate_precision: u32 = var("WIN_RATE_PRECISION")
            .unwrap_or_else(|| "1".to_string())
            .parse()
            .context("WIN_RATE_PRECISION must be a non-negative integer")?;

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| "sqlite:journal.db".to_string()),
            timezone,
            tick_seconds,
            win_rate_precision,
            notification,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<JobsConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        JobsConfig::from_lookup(
            move |key: &str| map.get(key).cloned(),
            NotificationConfig::default(),
        )
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database_url, "sqlite:journal.db");
        assert_eq!(config.timezone, chrono_tz::America::New_York);
        assert_eq!(config.tick_seconds, 60);
        assert_eq!(config.win_rate_precision, 1);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("JOBS_TIMEZONE", "Europe/London"),
            ("SCHEDULER_TICK_SECONDS", "30"),
            ("WIN_RATE_PRECISION", "2"),
        ])
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.timezone, chrono_tz::Europe::London);
        assert_eq!(config.tick_seconds, 30);
        assert_eq!(config.win_rate_precision, 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(load(&[("JOBS_TIMEZONE", "Mars/Olympus")]).is_err());
        assert!(load(&[("SCHEDULER_TICK_SECONDS", "0")]).is_err());
        assert!(load(&[("WIN_RATE_PRECISION", "-1")]).is_err());
    }
}
