use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::coordinator::Side;

/// Errors surfaced by the SleepIQ REST client
#[derive(Debug, Error)]
pub enum SleepIqError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("not logged in")]
    NotLoggedIn,

    #[error("invalid sleep number {0}: must be a multiple of 5 between 5 and 100")]
    InvalidSleepNumber(u8),
}

/// A bed as returned by the `/rest/bed` endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedRecord {
    pub bed_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Per-side status as returned by the family status endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideRecord {
    pub is_in_bed: bool,
    pub sleep_number: u8,
}

/// Per-bed entry of the `/rest/bed/familyStatus` endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyStatusRecord {
    pub bed_id: String,
    pub left_side: Option<SideRecord>,
    pub right_side: Option<SideRecord>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    key: String,
}

#[derive(Debug, Deserialize)]
struct BedsResponse {
    beds: Vec<BedRecord>,
}

#[derive(Debug, Deserialize)]
struct FamilyStatusResponse {
    beds: Vec<FamilyStatusRecord>,
}

/// Check that a requested sleep number is one the service accepts.
///
/// The SleepIQ service only accepts multiples of 5 between 5 and 100.
pub fn validate_sleep_number(target: u8) -> Result<(), SleepIqError> {
    if !(5..=100).contains(&target) || target % 5 != 0 {
        return Err(SleepIqError::InvalidSleepNumber(target));
    }
    Ok(())
}

/// Trait for SleepIQ API operations
///
/// This trait allows for mocking the SleepIQ client for testing purposes
#[async_trait]
pub trait SleepIqClient: Send + Sync {
    /// Authenticate against the service and store the session key
    async fn login(&mut self) -> Result<(), SleepIqError>;

    /// Fetch the beds registered to the account
    async fn fetch_beds(&mut self) -> Result<Vec<BedRecord>, SleepIqError>;

    /// Fetch the current per-side status of every bed
    async fn fetch_family_status(&mut self) -> Result<Vec<FamilyStatusRecord>, SleepIqError>;

    /// Request a new sleep number for one side of a bed
    async fn set_sleep_number(
        &mut self,
        bed_id: &str,
        side: Side,
        target: u8,
    ) -> Result<(), SleepIqError>;
}

/// Mock SleepIQ client for testing
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockSleepIqClient {
    pub beds: Vec<BedRecord>,
    pub family_status: Vec<FamilyStatusRecord>,
    pub login_calls: usize,
    pub fail_login: bool,
    pub set_calls: Vec<(String, Side, u8)>,
}

#[cfg(test)]
#[async_trait]
impl SleepIqClient for MockSleepIqClient {
    async fn login(&mut self) -> Result<(), SleepIqError> {
        if self.fail_login {
            return Err(SleepIqError::Auth("bad credentials".to_string()));
        }
        self.login_calls += 1;
        Ok(())
    }

    async fn fetch_beds(&mut self) -> Result<Vec<BedRecord>, SleepIqError> {
        Ok(self.beds.clone())
    }

    async fn fetch_family_status(&mut self) -> Result<Vec<FamilyStatusRecord>, SleepIqError> {
        Ok(self.family_status.clone())
    }

    async fn set_sleep_number(
        &mut self,
        bed_id: &str,
        side: Side,
        target: u8,
    ) -> Result<(), SleepIqError> {
        self.set_calls.push((bed_id.to_string(), side, target));
        Ok(())
    }
}

#[cfg(test)]
impl MockSleepIqClient {
    /// Create a new mock SleepIQ client
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bed with both sides to the mock account
    pub fn add_bed(&mut self, bed_id: &str, name: &str, left: SideRecord, right: SideRecord) {
        self.beds.push(BedRecord {
            bed_id: bed_id.to_string(),
            name: Some(name.to_string()),
        });
        self.family_status.push(FamilyStatusRecord {
            bed_id: bed_id.to_string(),
            left_side: Some(left),
            right_side: Some(right),
        });
    }
}

/// Real SleepIQ client implementation using reqwest
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,

    /// Session key returned by login, sent as the `_k` query parameter
    key: Option<String>,
}

impl RestClient {
    /// Create a new RestClient from configuration
    pub fn new(config: &super::SleepIqConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            key: None,
        })
    }

    fn key(&self) -> Result<&str, SleepIqError> {
        self.key.as_deref().ok_or(SleepIqError::NotLoggedIn)
    }

    /// GET an endpoint with the session key, re-logging in once on 401.
    ///
    /// SleepIQ session keys expire server-side after a while, so an expired
    /// key is treated as a prompt to re-authenticate rather than an error.
    async fn get_with_relogin(&mut self, path: &str) -> Result<reqwest::Response, SleepIqError> {
        if self.key.is_none() {
            self.login().await?;
        }

        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .query(&[("_k", self.key()?)])
            .send()
            .await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            debug!("Session key rejected for {}, logging in again", path);
            self.login().await?;
            let resp = self
                .http
                .get(&url)
                .query(&[("_k", self.key()?)])
                .send()
                .await?;
            return Ok(resp.error_for_status()?);
        }

        Ok(resp.error_for_status()?)
    }
}

#[async_trait]
impl SleepIqClient for RestClient {
    async fn login(&mut self) -> Result<(), SleepIqError> {
        let url = format!("{}/rest/login", self.base_url);
        let resp = self
            .http
            .put(&url)
            .json(&serde_json::json!({
                "login": self.username,
                "password": self.password,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SleepIqError::Auth(format!(
                "login rejected with status {}",
                resp.status()
            )));
        }

        let login: LoginResponse = resp.json().await?;
        self.key = Some(login.key);
        Ok(())
    }

    async fn fetch_beds(&mut self) -> Result<Vec<BedRecord>, SleepIqError> {
        let resp = self.get_with_relogin("/rest/bed").await?;
        let beds: BedsResponse = resp.json().await?;
        Ok(beds.beds)
    }

    async fn fetch_family_status(&mut self) -> Result<Vec<FamilyStatusRecord>, SleepIqError> {
        let resp = self.get_with_relogin("/rest/bed/familyStatus").await?;
        let status: FamilyStatusResponse = resp.json().await?;
        Ok(status.beds)
    }

    async fn set_sleep_number(
        &mut self,
        bed_id: &str,
        side: Side,
        target: u8,
    ) -> Result<(), SleepIqError> {
        validate_sleep_number(target)?;

        if self.key.is_none() {
            self.login().await?;
        }

        let url = format!("{}/rest/bed/{}/sleepNumber", self.base_url, bed_id);
        let resp = self
            .http
            .put(&url)
            .query(&[("_k", self.key()?)])
            .json(&serde_json::json!({
                "side": side.letter(),
                "sleepNumber": target,
            }))
            .send()
            .await?;

        resp.error_for_status()?;
        Ok(())
    }
}
