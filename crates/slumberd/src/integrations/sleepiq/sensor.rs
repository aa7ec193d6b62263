use tracing::debug;

use super::coordinator::Side;
use super::coordinator::SleepIqData;
use crate::engine::Entity;

/// Icon used for sleep number sensors in frontends
pub const ICON: &str = "mdi:hotel";

/// Display label for the sleep number sensor type
pub const SLEEP_NUMBER_LABEL: &str = "SleepNumber";

/// Read-only sensor exposing one side's sleep number (firmness, 0-100).
///
/// One sensor exists per (bed, side) pair discovered at setup time. The
/// sensor holds no connection of its own; `update` copies the value out of
/// the shared coordinator cache.
#[derive(Debug, Clone)]
pub struct SleepNumberSensor {
    id: String,
    name: String,
    bed_id: String,
    side: Side,
    state: Option<u8>,
}

impl SleepNumberSensor {
    /// Create the sensor for one side of a bed known to the coordinator.
    pub fn new(data: &SleepIqData, bed_id: String, side: Side) -> Self {
        let bed_name = data
            .beds
            .get(&bed_id)
            .map(|bed| bed.name.clone())
            .unwrap_or_else(|| format!("Bed {}", bed_id));

        let id = format!("sensor.{}_{}_sleep_number", bed_id, side);
        let name = format!("{} {} {}", bed_name, side, SLEEP_NUMBER_LABEL);

        Self {
            id,
            name,
            bed_id,
            side,
            state: None,
        }
    }

    pub fn bed_id(&self) -> &str {
        &self.bed_id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Last cached sleep number; None before the first update.
    pub fn state(&self) -> Option<u8> {
        self.state
    }

    /// Copy the side's current sleep number out of the coordinator cache.
    ///
    /// A side missing from the cache (bed dropped from a later refresh)
    /// keeps its last value.
    pub fn update(&mut self, data: &SleepIqData) {
        match data.side_status(&self.bed_id, self.side) {
            Some(status) => self.state = Some(status.sleep_number),
            None => debug!(
                "No status for bed {} side {}, keeping last state",
                self.bed_id, self.side
            ),
        }
    }
}

impl Entity for SleepNumberSensor {
    fn entity_id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn platform(&self) -> &'static str {
        "sensor"
    }

    fn icon(&self) -> &'static str {
        ICON
    }

    fn state_json(&self) -> serde_json::Value {
        serde_json::json!({ "sleep_number": self.state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::sleepiq::client::MockSleepIqClient;
    use crate::integrations::sleepiq::client::SideRecord;

    async fn fixture() -> SleepIqData {
        let mut client = MockSleepIqClient::new();
        client.add_bed(
            "b1",
            "Master Bedroom",
            SideRecord {
                sleep_number: 40,
                is_in_bed: false,
            },
            SideRecord {
                sleep_number: 55,
                is_in_bed: true,
            },
        );

        let mut data = SleepIqData::new();
        data.refresh(&mut client).await.unwrap();
        data
    }

    #[tokio::test]
    async fn test_state_unset_before_first_update() {
        let data = fixture().await;
        let mut sensor = SleepNumberSensor::new(&data, "b1".to_string(), Side::Left);

        assert_eq!(sensor.state(), None);
        assert_eq!(sensor.state_json()["sleep_number"], serde_json::Value::Null);

        sensor.update(&data);
        assert_eq!(sensor.state(), Some(40));
        assert_eq!(sensor.state_json()["sleep_number"], 40);
    }

    #[tokio::test]
    async fn test_one_value_per_side() {
        let data = fixture().await;

        let mut left = SleepNumberSensor::new(&data, "b1".to_string(), Side::Left);
        let mut right = SleepNumberSensor::new(&data, "b1".to_string(), Side::Right);
        left.update(&data);
        right.update(&data);

        assert_eq!(left.state(), Some(40));
        assert_eq!(right.state(), Some(55));
    }

    #[tokio::test]
    async fn test_name_carries_sensor_type_label() {
        let data = fixture().await;
        let sensor = SleepNumberSensor::new(&data, "b1".to_string(), Side::Left);

        assert_eq!(sensor.name(), "Master Bedroom left SleepNumber");
        assert_eq!(sensor.entity_id(), "sensor.b1_left_sleep_number");
    }

    #[tokio::test]
    async fn test_icon_is_constant() {
        let data = fixture().await;
        let mut sensor = SleepNumberSensor::new(&data, "b1".to_string(), Side::Left);

        assert_eq!(sensor.icon(), "mdi:hotel");
        sensor.update(&data);
        assert_eq!(sensor.icon(), "mdi:hotel");
    }

    #[tokio::test]
    async fn test_update_keeps_last_state_for_missing_bed() {
        let data = fixture().await;
        let mut sensor = SleepNumberSensor::new(&data, "b1".to_string(), Side::Left);
        sensor.update(&data);
        assert_eq!(sensor.state(), Some(40));

        let empty = SleepIqData::new();
        sensor.update(&empty);
        assert_eq!(sensor.state(), Some(40));
    }
}
