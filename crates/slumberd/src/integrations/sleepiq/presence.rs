use tracing::debug;

use super::coordinator::Side;
use super::coordinator::SleepIqData;
use crate::engine::Entity;

/// Icon used for bed presence sensors in frontends
pub const ICON: &str = "mdi:sleep";

/// Display label for the bed presence sensor type
pub const BED_PRESENCE_LABEL: &str = "IsInBed";

/// Binary sensor exposing whether a sleeper is on one side of a bed.
#[derive(Debug, Clone)]
pub struct BedPresenceSensor {
    id: String,
    name: String,
    bed_id: String,
    side: Side,
    state: Option<bool>,
}

impl BedPresenceSensor {
    pub fn new(data: &SleepIqData, bed_id: String, side: Side) -> Self {
        let bed_name = data
            .beds
            .get(&bed_id)
            .map(|bed| bed.name.clone())
            .unwrap_or_else(|| format!("Bed {}", bed_id));

        let id = format!("binary_sensor.{}_{}_is_in_bed", bed_id, side);
        let name = format!("{} {} {}", bed_name, side, BED_PRESENCE_LABEL);

        Self {
            id,
            name,
            bed_id,
            side,
            state: None,
        }
    }

    /// Last cached presence; None before the first update.
    pub fn state(&self) -> Option<bool> {
        self.state
    }

    /// Copy the side's current presence out of the coordinator cache.
    pub fn update(&mut self, data: &SleepIqData) {
        match data.side_status(&self.bed_id, self.side) {
            Some(status) => self.state = Some(status.is_in_bed),
            None => debug!(
                "No status for bed {} side {}, keeping last state",
                self.bed_id, self.side
            ),
        }
    }
}

impl Entity for BedPresenceSensor {
    fn entity_id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn platform(&self) -> &'static str {
        "binary_sensor"
    }

    fn icon(&self) -> &'static str {
        ICON
    }

    fn state_json(&self) -> serde_json::Value {
        serde_json::json!({ "in_bed": self.state })
    }
}
