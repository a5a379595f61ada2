use std::env;

use crate::cli::Cli;
use crate::webhooks::resolver::EnvWebhookDefaults;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://storefront.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_SUMMARY_INTERVAL_SECONDS: u64 = 86_400;
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    /// `0` disables the scheduled daily summary.
    pub summary_interval_seconds: u64,
    pub queue_capacity: usize,
    pub webhooks: EnvWebhookDefaults,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number", name)),
        _ => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        let summary_interval_seconds =
            parse_var("DAILY_SUMMARY_INTERVAL_SECONDS", DEFAULT_SUMMARY_INTERVAL_SECONDS)?;

        let queue_capacity = parse_var("NOTIFY_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY)?;
        if queue_capacity == 0 {
            return Err("NOTIFY_QUEUE_CAPACITY must be greater than zero".to_string());
        }

        Ok(Self {
            database_url,
            bind_addr,
            summary_interval_seconds,
            queue_capacity,
            webhooks: EnvWebhookDefaults::from_env(),
        })
    }

    /// Command-line flags win over the environment.
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if let Some(url) = &cli.database_url {
            self.database_url = url.clone();
        }
        if let Some(bind) = &cli.bind {
            self.bind_addr = bind.clone();
        }
        if let Some(interval) = cli.summary_interval {
            self.summary_interval_seconds = interval;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            database_url: DEFAULT_DATABASE_URL.into(),
            bind_addr: DEFAULT_BIND_ADDR.into(),
            summary_interval_seconds: DEFAULT_SUMMARY_INTERVAL_SECONDS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            webhooks: EnvWebhookDefaults::default(),
        }
    }

    #[test]
    fn cli_flags_override_env_values() {
        let cli = Cli {
            database_url: Some("sqlite::memory:".into()),
            bind: None,
            summary_interval: Some(0),
        };
        let config = base().apply_cli(&cli);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.summary_interval_seconds, 0);
    }

    #[test]
    fn unset_variable_uses_default() {
        let value = parse_var("STOREFRONT_NOTIFY_TEST_UNSET_VARIABLE", 42u64).unwrap();
        assert_eq!(value, 42);
    }
}
