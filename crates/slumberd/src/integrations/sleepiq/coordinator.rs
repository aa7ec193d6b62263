//! Shared polling coordinator for the SleepIQ integration.
//!
//! `SleepIqData` owns the cached view of every bed and side. Sensor adapters
//! never talk to the service themselves; they copy values out of this cache
//! after each refresh.

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;
use strum::Display;
use strum::EnumIter;
use tracing::debug;

use super::client::SideRecord;
use super::client::SleepIqClient;
use super::client::SleepIqError;

/// One sleeper's half of a bed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Single-letter form used by the service's command endpoints.
    pub fn letter(&self) -> &'static str {
        match self {
            Side::Left => "L",
            Side::Right => "R",
        }
    }
}

/// Latest known status of one side of a bed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideStatus {
    /// Firmness metric reported for the side (0-100).
    pub sleep_number: u8,

    /// Whether a sleeper is currently detected on the side.
    pub is_in_bed: bool,
}

impl From<SideRecord> for SideStatus {
    fn from(record: SideRecord) -> Self {
        Self {
            sleep_number: record.sleep_number,
            is_in_bed: record.is_in_bed,
        }
    }
}

/// A monitored bed with its two sides.
#[derive(Debug, Clone)]
pub struct Bed {
    pub bed_id: String,
    pub name: String,
    pub sides: HashMap<Side, SideStatus>,
}

/// Cached state for all beds known to the account.
///
/// Bed names are seeded from the bed listing on the first refresh; every
/// refresh after that only rewrites the per-side status.
#[derive(Debug, Default)]
pub struct SleepIqData {
    pub beds: HashMap<String, Bed>,
}

impl SleepIqData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Perform one fetch cycle and rewrite the cache.
    pub async fn refresh<C: SleepIqClient>(&mut self, client: &mut C) -> Result<(), SleepIqError> {
        if self.beds.is_empty() {
            for record in client.fetch_beds().await? {
                let name = record
                    .name
                    .unwrap_or_else(|| format!("Bed {}", record.bed_id));
                self.beds.insert(
                    record.bed_id.clone(),
                    Bed {
                        bed_id: record.bed_id,
                        name,
                        sides: HashMap::new(),
                    },
                );
            }
        }

        for status in client.fetch_family_status().await? {
            let Some(bed) = self.beds.get_mut(&status.bed_id) else {
                debug!("Family status for unknown bed {}, ignoring", status.bed_id);
                continue;
            };

            if let Some(left) = status.left_side {
                bed.sides.insert(Side::Left, SideStatus::from(left));
            }
            if let Some(right) = status.right_side {
                bed.sides.insert(Side::Right, SideStatus::from(right));
            }
        }

        Ok(())
    }

    /// Look up the latest status of one side of a bed.
    pub fn side_status(&self, bed_id: &str, side: Side) -> Option<&SideStatus> {
        self.beds.get(bed_id).and_then(|bed| bed.sides.get(&side))
    }
}
