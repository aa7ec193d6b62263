use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

/// State of a sleep number sensor entity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SleepNumberState {
    /// Firmness metric reported for the bed side (0-100).
    pub sleep_number: u8,
}

/// State of a bed presence (binary sensor) entity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BedPresenceState {
    /// Whether a sleeper is currently detected on the bed side.
    pub in_bed: bool,
}

/// Registry entry for a discovered entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub name: String,
    pub platform: String,
    pub icon: String,
    pub integration: String,
}

/// Centralized snapshot of the entire engine state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct State {
    /// Discovered entities, keyed by entity id.
    pub entities: HashMap<String, EntityInfo>,
    pub sleep_numbers: HashMap<String, SleepNumberState>,
    pub bed_presence: HashMap<String, BedPresenceState>,
}
