//! Service configuration loaded from environment variables.
//!
//! Every setting has a development default except `DATABASE_URL`. Webhook
//! URLs and API keys are only ever read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Incoming-webhook URLs for the Slack channels leads are posted to.
#[derive(Debug, Clone, Default)]
pub struct SlackWebhooks {
    pub inquiry: Option<String>,
    pub newsletter: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MailerLiteConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub from_email: String,
    pub from_name: String,
}

impl Default for MailerLiteConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://connect.mailerlite.com/api".to_string(),
            from_email: "newsletter@logbase.kr".to_string(),
            from_name: "Logbase".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectConfig {
    /// Run the daily collection in-process.
    pub scheduled: bool,
    pub timezone: Tz,
    pub schedule_hour: u32,
    /// Pause between feeds and after every batch of saved items.
    pub delay: Duration,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            scheduled: true,
            timezone: chrono_tz::Asia::Seoul,
            schedule_hour: 6,
            delay: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub storage_root: PathBuf,
    /// Base URL objects are publicly served from, without a trailing slash.
    pub storage_public_url: String,
    /// Storage runs against a local emulator; legacy image URLs are left alone.
    pub storage_emulated: bool,
    pub slack: SlackWebhooks,
    pub mailerlite: MailerLiteConfig,
    pub newsletter_test_mode: bool,
    pub newsletter_test_recipients: Vec<String>,
    /// Bearer token for admin routes. Admin routes are open when unset.
    pub admin_token: Option<String>,
    pub collect: CollectConfig,
    pub request_timeout: Duration,
}

impl Config {
    pub fn new(database_url: impl Into<String>, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_url: database_url.into(),
            storage_root: storage_root.into(),
            storage_public_url: "http://localhost:3000/storage".to_string(),
            storage_emulated: false,
            slack: SlackWebhooks::default(),
            mailerlite: MailerLiteConfig::default(),
            newsletter_test_mode: false,
            newsletter_test_recipients: Vec::new(),
            admin_token: None,
            collect: CollectConfig::default(),
            request_timeout: Duration::from_secs(120),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL`: sqlite database path
    ///
    /// Optional:
    /// - `BIND_ADDRESS` (default `0.0.0.0:3000`)
    /// - `STORAGE_ROOT` (default `./storage`), `STORAGE_PUBLIC_URL`, `STORAGE_EMULATED`
    /// - `SLACK_WEBHOOK_INQUIRY`, `SLACK_WEBHOOK_NEWSLETTER`, `SLACK_WEBHOOK_CONTACT`
    /// - `MAILERLITE_API_KEY`, `MAILERLITE_BASE_URL`, `MAILERLITE_FROM_EMAIL`, `MAILERLITE_FROM_NAME`
    /// - `NEWSLETTER_TEST_MODE`, `NEWSLETTER_TEST_RECIPIENTS` (comma-separated)
    /// - `ADMIN_TOKEN`
    /// - `COLLECT_SCHEDULED`, `COLLECT_TIMEZONE` (default `Asia/Seoul`),
    ///   `COLLECT_SCHEDULE_HOUR` (default `6`), `COLLECT_DELAY_MS` (default `200`)
    /// - `REQUEST_TIMEOUT_SECS` (default `120`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let storage_root = env("STORAGE_ROOT").unwrap_or_else(|| "./storage".to_string());

        let mut config = Config::new(database_url, storage_root);

        if let Some(bind_addr) = env("BIND_ADDRESS") {
            config.bind_addr = bind_addr;
        }
        if let Some(public_url) = env("STORAGE_PUBLIC_URL") {
            config.storage_public_url = public_url.trim_end_matches('/').to_string();
        }
        config.storage_emulated = env_bool("STORAGE_EMULATED")?.unwrap_or(false);

        config.slack = SlackWebhooks {
            inquiry: env("SLACK_WEBHOOK_INQUIRY"),
            newsletter: env("SLACK_WEBHOOK_NEWSLETTER"),
            contact: env("SLACK_WEBHOOK_CONTACT"),
        };

        config.mailerlite.api_key = env("MAILERLITE_API_KEY");
        if let Some(base_url) = env("MAILERLITE_BASE_URL") {
            config.mailerlite.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(from_email) = env("MAILERLITE_FROM_EMAIL") {
            config.mailerlite.from_email = from_email;
        }
        if let Some(from_name) = env("MAILERLITE_FROM_NAME") {
            config.mailerlite.from_name = from_name;
        }

        config.newsletter_test_mode = env_bool("NEWSLETTER_TEST_MODE")?.unwrap_or(false);
        config.newsletter_test_recipients = env("NEWSLETTER_TEST_RECIPIENTS")
            .map(|list| split_list(&list))
            .unwrap_or_default();

        config.admin_token = env("ADMIN_TOKEN");

        if let Some(scheduled) = env_bool("COLLECT_SCHEDULED")? {
            config.collect.scheduled = scheduled;
        }
        if let Some(tz) = env("COLLECT_TIMEZONE") {
            config.collect.timezone = tz.parse::<Tz>().map_err(|err| ConfigError::Invalid {
                key: "COLLECT_TIMEZONE",
                value: tz.clone(),
                reason: err.to_string(),
            })?;
        }
        if let Some(hour) = env_number::<u32>("COLLECT_SCHEDULE_HOUR")? {
            if hour > 23 {
                return Err(ConfigError::Invalid {
                    key: "COLLECT_SCHEDULE_HOUR",
                    value: hour.to_string(),
                    reason: "hour must be between 0 and 23".to_string(),
                });
            }
            config.collect.schedule_hour = hour;
        }
        if let Some(delay_ms) = env_number::<u64>("COLLECT_DELAY_MS")? {
            config.collect.delay = Duration::from_millis(delay_ms);
        }
        if let Some(secs) = env_number::<u64>("REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_bool(key: &'static str) -> Result<Option<bool>, ConfigError> {
    env(key).map(|value| parse_bool(key, &value)).transpose()
}

fn env_number<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env(key)
        .map(|value| {
            value.parse::<T>().map_err(|err| ConfigError::Invalid {
                key,
                value: value.clone(),
                reason: err.to_string(),
            })
        })
        .transpose()
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
