use aurora_addict_shared::{DEFAULT_PENDING_TTL_DAYS, DEFAULT_WAITLIST_FREEZE_LEAD_SECS};
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub cron_secret: String,
    /// Comma separated list of e-mails granted admin rights on top of the role claim
    pub admin_emails: String,
    pub pending_ttl_days: i64,
    pub waitlist_freeze_lead_secs: i64,
    /// In-process sweep cadence; the sweep only runs from the cron endpoint when unset
    pub sweep_interval_secs: Option<u64>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8080)?
            .set_default("database_max_connections", 20)?
            .set_default("admin_emails", "")?
            .set_default("pending_ttl_days", DEFAULT_PENDING_TTL_DAYS)?
            .set_default("waitlist_freeze_lead_secs", DEFAULT_WAITLIST_FREEZE_LEAD_SECS)?
            .add_source(config::Environment::default())
            .build()?;

        config.try_deserialize()
    }

    pub fn admin_email_set(&self) -> HashSet<String> {
        parse_email_list(&self.admin_emails)
    }

    pub fn sweep_interval(&self) -> Option<std::time::Duration> {
        self.sweep_interval_secs
            .filter(|secs| *secs > 0)
            .map(std::time::Duration::from_secs)
    }
}

fn parse_email_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .collect()
}
