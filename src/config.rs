use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Process configuration, loaded once at startup and passed explicitly to the
/// services that need it. Commission rates are overridable through the
/// environment so rate changes never require a code change.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub processor_base_url: String,
    pub processor_key_id: String,
    pub processor_key_secret: String,
    pub payment_webhook_secret: String,
    pub notify_endpoint: String,
    pub notify_secret: String,
    pub currency: String,
    pub commission_rate_standard: i32,
    pub commission_rate_discounted: i32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present

        let config = Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")?,
            processor_base_url: env::var("PROCESSOR_BASE_URL")?,
            processor_key_id: env::var("PROCESSOR_KEY_ID")?,
            processor_key_secret: env::var("PROCESSOR_KEY_SECRET")?,
            payment_webhook_secret: env::var("PAYMENT_WEBHOOK_SECRET")?,
            notify_endpoint: env::var("NOTIFY_ENDPOINT")?,
            notify_secret: env::var("NOTIFY_SECRET")?,
            currency: env::var("CURRENCY").unwrap_or_else(|_| "INR".to_string()),
            commission_rate_standard: env::var("COMMISSION_RATE_STANDARD")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,
            commission_rate_discounted: env::var("COMMISSION_RATE_DISCOUNTED")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.is_empty() {
            anyhow::bail!("DATABASE_URL is empty");
        }
        if self.payment_webhook_secret.is_empty() {
            anyhow::bail!("PAYMENT_WEBHOOK_SECRET is empty");
        }
        if self.server_port == 0 {
            anyhow::bail!("SERVER_PORT must be greater than 0");
        }
        if self.commission_rate_standard <= 0 || self.commission_rate_standard > 100 {
            anyhow::bail!("COMMISSION_RATE_STANDARD must be between 1 and 100");
        }
        if self.commission_rate_discounted <= 0
            || self.commission_rate_discounted > self.commission_rate_standard
        {
            anyhow::bail!(
                "COMMISSION_RATE_DISCOUNTED must be positive and not exceed the standard rate"
            );
        }

        url::Url::parse(&self.processor_base_url)
            .context("PROCESSOR_BASE_URL is not a valid URL")?;
        url::Url::parse(&self.notify_endpoint).context("NOTIFY_ENDPOINT is not a valid URL")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: 3000,
            database_url: "postgres://localhost:5432/movebid".to_string(),
            processor_base_url: "https://api.processor.test/v1".to_string(),
            processor_key_id: "key_test_123".to_string(),
            processor_key_secret: "secret".to_string(),
            payment_webhook_secret: "whsec".to_string(),
            notify_endpoint: "https://notify.test/hook".to_string(),
            notify_secret: "nsec".to_string(),
            currency: "INR".to_string(),
            commission_rate_standard: 20,
            commission_rate_discounted: 5,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_empty_database_url_fails() {
        let mut config = base_config();
        config.database_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_processor_url_fails() {
        let mut config = base_config();
        config.processor_base_url = "not-a-url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discounted_rate_above_standard_fails() {
        let mut config = base_config();
        config.commission_rate_discounted = 25;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_discounted_rate_fails() {
        let mut config = base_config();
        config.commission_rate_discounted = 0;
        assert!(config.validate().is_err());
    }
}
