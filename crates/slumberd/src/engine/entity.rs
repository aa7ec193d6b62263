/// Entity abstraction for slumberd
///
/// All entities (sleep number sensors, bed presence sensors, etc.) implement
/// the Entity trait.
///
/// Base trait that all entities must implement
pub trait Entity: Send + Sync {
    /// Entity ID (e.g. "sensor.b1_left_sleep_number")
    fn entity_id(&self) -> &str;

    /// Human-readable name shown in frontends
    fn name(&self) -> &str;

    /// Return the platform type of this entity (e.g. "sensor", "binary_sensor")
    fn platform(&self) -> &'static str;

    /// Iconographic identifier for frontends (e.g. "mdi:hotel")
    fn icon(&self) -> &'static str;

    /// Serialize current state to JSON for Engine storage
    fn state_json(&self) -> serde_json::Value;
}
