use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strum::IntoEnumIterator;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;
use tracing::warn;

use super::SleepIqConfig;
use super::client::SleepIqClient;
use super::client::validate_sleep_number;
use super::coordinator::Side;
use super::coordinator::SleepIqData;
use super::presence::BedPresenceSensor;
use super::sensor::SleepNumberSensor;
use crate::engine::Entity;
use crate::engine::FromIntegrationMessage;
use crate::engine::FromIntegrationSender;
use crate::engine::Integration;
use crate::engine::ToIntegrationMessage;

const INTEGRATION_NAME: &str = "sleepiq";

/// Type alias for the shared sleep number sensors map
type SensorsMap = Arc<Mutex<HashMap<String, Arc<Mutex<SleepNumberSensor>>>>>;

/// Type alias for the shared bed presence sensors map
type PresenceMap = Arc<Mutex<HashMap<String, Arc<Mutex<BedPresenceSensor>>>>>;

/// SleepIQ integration for slumberd
///
/// Polls the SleepIQ cloud API through a shared coordinator and exposes one
/// sleep number sensor and one bed presence sensor per (bed, side) pair. The
/// entity set is fixed at setup time; beds added to the account later are
/// picked up on the next daemon restart.
pub struct SleepIqIntegration<C: SleepIqClient> {
    client: Arc<Mutex<C>>,
    config: SleepIqConfig,
    data: Arc<Mutex<SleepIqData>>,
    sensors: SensorsMap,
    presence: PresenceMap,
    /// Handle to the background poll task
    _poll_task: Option<JoinHandle<()>>,
}

impl<C: SleepIqClient> SleepIqIntegration<C> {
    /// Create a new SleepIQ integration
    pub fn new(client: C, config: &SleepIqConfig) -> Self {
        Self {
            client: Arc::new(Mutex::new(client)),
            config: config.clone(),
            data: Arc::new(Mutex::new(SleepIqData::new())),
            sensors: Arc::new(Mutex::new(HashMap::new())) as SensorsMap,
            presence: Arc::new(Mutex::new(HashMap::new())) as PresenceMap,
            _poll_task: None,
        }
    }

    /// Refresh the coordinator and push new adapter states to the engine
    ///
    /// This runs in a background task on the poll interval so that
    /// handle_message() can process commands concurrently.
    async fn poll_task(
        client: Arc<Mutex<C>>,
        data: Arc<Mutex<SleepIqData>>,
        sensors: SensorsMap,
        presence: PresenceMap,
        to_engine: FromIntegrationSender,
        poll_interval: Duration,
    ) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; setup already refreshed.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let refreshed = {
                let mut client_guard = client.lock().await;
                let mut data_guard = data.lock().await;
                data_guard.refresh(&mut *client_guard).await
            };

            if let Err(e) = refreshed {
                warn!("SleepIQ refresh failed: {}", e);
                continue;
            }

            Self::update_entities(&data, &sensors, &presence, &to_engine).await;
        }
    }

    /// Run every adapter's update against the coordinator cache and report
    /// changed values to the engine.
    async fn update_entities(
        data: &Arc<Mutex<SleepIqData>>,
        sensors: &SensorsMap,
        presence: &PresenceMap,
        to_engine: &FromIntegrationSender,
    ) {
        let data_guard = data.lock().await;

        {
            let sensors_guard = sensors.lock().await;
            for (entity_id, sensor_arc) in sensors_guard.iter() {
                let mut sensor = sensor_arc.lock().await;
                let previous = sensor.state();
                sensor.update(&data_guard);
                if let Some(sleep_number) = sensor.state() {
                    if previous != Some(sleep_number) {
                        Self::report_sleep_number(entity_id, sleep_number, to_engine).await;
                    }
                }
            }
        }

        {
            let presence_guard = presence.lock().await;
            for (entity_id, sensor_arc) in presence_guard.iter() {
                let mut sensor = sensor_arc.lock().await;
                let previous = sensor.state();
                sensor.update(&data_guard);
                if let Some(in_bed) = sensor.state() {
                    if previous != Some(in_bed) {
                        Self::report_bed_presence(entity_id, in_bed, to_engine).await;
                    }
                }
            }
        }
    }

    /// Register an entity with the engine
    async fn register_entity(entity: &dyn Entity, to_engine: &FromIntegrationSender) {
        let msg = FromIntegrationMessage::EntityDiscovered {
            entity_id: entity.entity_id().to_string(),
            name: entity.name().to_string(),
            platform: entity.platform().to_string(),
            icon: entity.icon().to_string(),
            integration_name: INTEGRATION_NAME.to_string(),
        };
        if let Err(e) = to_engine.send(msg).await {
            warn!("Failed to send EntityDiscovered message: {}", e);
        } else {
            info!("Registered entity: {}", entity.entity_id());
        }
    }

    /// Report a sleep number change to the engine
    async fn report_sleep_number(
        entity_id: &str,
        sleep_number: u8,
        to_engine: &FromIntegrationSender,
    ) {
        let msg = FromIntegrationMessage::SleepNumberChanged {
            entity_id: entity_id.to_string(),
            sleep_number,
        };
        if let Err(e) = to_engine.send(msg).await {
            warn!("Failed to send SleepNumberChanged message: {}", e);
        }
    }

    /// Report a bed presence change to the engine
    async fn report_bed_presence(entity_id: &str, in_bed: bool, to_engine: &FromIntegrationSender) {
        let msg = FromIntegrationMessage::BedPresenceChanged {
            entity_id: entity_id.to_string(),
            in_bed,
        };
        if let Err(e) = to_engine.send(msg).await {
            warn!("Failed to send BedPresenceChanged message: {}", e);
        }
    }

    /// Send a sleep number command for a sensor entity to the service
    pub async fn send_sleep_number_command(
        &self,
        entity_id: &str,
        target: u8,
    ) -> Result<(), Box<dyn Error + Send>> {
        validate_sleep_number(target).map_err(|e| -> Box<dyn Error + Send> { Box::new(e) })?;

        let sensor_arc = {
            let sensors_guard = self.sensors.lock().await;
            sensors_guard
                .get(entity_id)
                .ok_or_else(|| -> Box<dyn Error + Send> {
                    Box::new(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("Sleep number sensor not found: {}", entity_id),
                    ))
                })?
                .clone()
        };

        let (bed_id, side) = {
            let sensor = sensor_arc.lock().await;
            (sensor.bed_id().to_string(), sensor.side())
        };

        {
            let mut client = self.client.lock().await;
            client
                .set_sleep_number(&bed_id, side, target)
                .await
                .map_err(|e| -> Box<dyn Error + Send> { Box::new(e) })?;
        }

        info!(
            "Requested sleep number {} for {} ({} {})",
            target, entity_id, bed_id, side
        );

        Ok(())
    }
}

#[async_trait]
impl<C: SleepIqClient + 'static> Integration for SleepIqIntegration<C> {
    fn name(&self) -> &str {
        INTEGRATION_NAME
    }

    async fn setup(&mut self, tx: FromIntegrationSender) -> Result<(), Box<dyn Error + Send>> {
        info!("Logging in to SleepIQ as {}", self.config.username);
        {
            let mut client = self.client.lock().await;
            client
                .login()
                .await
                .map_err(|e| -> Box<dyn Error + Send> { Box::new(e) })?;
        }

        // One immediate refresh so discovery sees the full set of beds
        {
            let mut client = self.client.lock().await;
            let mut data = self.data.lock().await;
            data.refresh(&mut *client)
                .await
                .map_err(|e| -> Box<dyn Error + Send> { Box::new(e) })?;
        }

        // One adapter per (bed, side) pair known right now; the set stays
        // fixed until teardown.
        {
            let data = self.data.lock().await;
            let mut sensors = self.sensors.lock().await;
            let mut presence = self.presence.lock().await;

            for bed_id in data.beds.keys() {
                for side in Side::iter() {
                    let sensor = SleepNumberSensor::new(&data, bed_id.clone(), side);
                    Self::register_entity(&sensor, &tx).await;
                    sensors.insert(
                        sensor.entity_id().to_string(),
                        Arc::new(Mutex::new(sensor)),
                    );

                    let in_bed = BedPresenceSensor::new(&data, bed_id.clone(), side);
                    Self::register_entity(&in_bed, &tx).await;
                    presence.insert(
                        in_bed.entity_id().to_string(),
                        Arc::new(Mutex::new(in_bed)),
                    );
                }
            }

            info!(
                "SleepIQ integration discovered {} beds ({} entities)",
                data.beds.len(),
                sensors.len() + presence.len()
            );
        }

        // Push the initial states to the engine
        Self::update_entities(&self.data, &self.sensors, &self.presence, &tx).await;

        // Spawn background task to refresh on the poll interval
        let client = self.client.clone();
        let data = self.data.clone();
        let sensors = self.sensors.clone();
        let presence = self.presence.clone();
        let poll_interval = Duration::from_secs(self.config.poll_interval_secs);

        let task = tokio::spawn(async move {
            Self::poll_task(client, data, sensors, presence, tx, poll_interval).await;
        });
        self._poll_task = Some(task);

        info!("SleepIQ integration ready");
        Ok(())
    }

    async fn handle_message(
        &mut self,
        msg: ToIntegrationMessage,
    ) -> Result<(), Box<dyn Error + Send>> {
        match msg {
            ToIntegrationMessage::SetSleepNumber { entity_id, target } => {
                info!(
                    "Handling sleep number command for {}: target={}",
                    entity_id, target
                );
                self.send_sleep_number_command(&entity_id, target).await?;
            }
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), Box<dyn Error + Send>> {
        info!("SleepIQ integration shutting down");
        if let Some(task) = self._poll_task.take() {
            task.abort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::integrations::sleepiq::client::MockSleepIqClient;
    use crate::integrations::sleepiq::client::SideRecord;

    fn test_config() -> SleepIqConfig {
        SleepIqConfig {
            username: "sleeper@example.com".to_string(),
            password: "hunter2".to_string(),
            poll_interval_secs: 60,
            base_url: "http://localhost:0".to_string(),
        }
    }

    fn one_bed_client() -> MockSleepIqClient {
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
        client
    }

    #[tokio::test]
    async fn test_sleepiq_integration_creation() {
        let integration = SleepIqIntegration::new(MockSleepIqClient::new(), &test_config());

        let sensors = integration.sensors.lock().await;
        assert_eq!(sensors.len(), 0);

        let presence = integration.presence.lock().await;
        assert_eq!(presence.len(), 0);
    }

    #[tokio::test]
    async fn test_setup_creates_one_adapter_per_bed_side() {
        let mut integration = SleepIqIntegration::new(one_bed_client(), &test_config());
        let (tx, mut rx) = mpsc::channel(64);

        integration.setup(tx).await.unwrap();

        let sensors = integration.sensors.lock().await;
        assert_eq!(sensors.len(), 2);
        assert!(sensors.contains_key("sensor.b1_left_sleep_number"));
        assert!(sensors.contains_key("sensor.b1_right_sleep_number"));

        let presence = integration.presence.lock().await;
        assert_eq!(presence.len(), 2);
        drop(sensors);
        drop(presence);

        let mut discovered = 0;
        while let Ok(msg) = rx.try_recv() {
            if matches!(msg, FromIntegrationMessage::EntityDiscovered { .. }) {
                discovered += 1;
            }
        }
        assert_eq!(discovered, 4);
    }

    #[tokio::test]
    async fn test_setup_reports_initial_states() {
        let mut integration = SleepIqIntegration::new(one_bed_client(), &test_config());
        let (tx, mut rx) = mpsc::channel(64);

        integration.setup(tx).await.unwrap();

        {
            let sensors = integration.sensors.lock().await;
            let left = sensors.get("sensor.b1_left_sleep_number").unwrap();
            assert_eq!(left.lock().await.state(), Some(40));
            let right = sensors.get("sensor.b1_right_sleep_number").unwrap();
            assert_eq!(right.lock().await.state(), Some(55));
        }

        let mut sleep_numbers = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let FromIntegrationMessage::SleepNumberChanged { sleep_number, .. } = msg {
                sleep_numbers.push(sleep_number);
            }
        }
        sleep_numbers.sort_unstable();
        assert_eq!(sleep_numbers, vec![40, 55]);
    }

    #[tokio::test]
    async fn test_setup_fails_on_bad_credentials() {
        let client = MockSleepIqClient {
            fail_login: true,
            ..Default::default()
        };
        let mut integration = SleepIqIntegration::new(client, &test_config());
        let (tx, _rx) = mpsc::channel(64);

        assert!(integration.setup(tx).await.is_err());
    }

    #[tokio::test]
    async fn test_handle_message_sets_sleep_number() {
        let mut integration = SleepIqIntegration::new(one_bed_client(), &test_config());
        let (tx, _rx) = mpsc::channel(64);
        integration.setup(tx).await.unwrap();

        integration
            .handle_message(ToIntegrationMessage::SetSleepNumber {
                entity_id: "sensor.b1_left_sleep_number".to_string(),
                target: 60,
            })
            .await
            .unwrap();

        let client = integration.client.lock().await;
        assert_eq!(
            client.set_calls,
            vec![("b1".to_string(), Side::Left, 60)]
        );
    }

    #[tokio::test]
    async fn test_handle_message_rejects_invalid_target() {
        let mut integration = SleepIqIntegration::new(one_bed_client(), &test_config());
        let (tx, _rx) = mpsc::channel(64);
        integration.setup(tx).await.unwrap();

        let result = integration
            .handle_message(ToIntegrationMessage::SetSleepNumber {
                entity_id: "sensor.b1_left_sleep_number".to_string(),
                target: 42,
            })
            .await;
        assert!(result.is_err());

        let client = integration.client.lock().await;
        assert!(client.set_calls.is_empty());
    }

    #[tokio::test]
    async fn test_command_for_unknown_entity() {
        let mut integration = SleepIqIntegration::new(one_bed_client(), &test_config());
        let (tx, _rx) = mpsc::channel(64);
        integration.setup(tx).await.unwrap();

        let result = integration
            .send_sleep_number_command("sensor.unknown_left_sleep_number", 50)
            .await;
        assert!(result.is_err());
    }
}
