use serde::Deserialize;

fn default_base_url() -> String {
    "https://prod-api.sleepiq.sleepnumber.com".to_string()
}

fn default_poll_interval_secs() -> u64 {
    60
}

/// Configuration for the SleepIQ integration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// SleepIQ account login (email address)
    pub username: String,

    /// SleepIQ account password
    pub password: String,

    /// Seconds between refreshes of the shared coordinator (default: 60)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Base URL of the SleepIQ service, overridable for testing
    #[serde(default = "default_base_url")]
    pub base_url: String,
}
