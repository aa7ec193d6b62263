mod client;
mod config;
mod coordinator;
mod integration;
mod presence;
mod sensor;

use anyhow::Context;
pub use config::Config as SleepIqConfig;
pub use integration::SleepIqIntegration;
use linkme::distributed_slice;

use crate::engine;

#[distributed_slice(engine::INTEGRATION_REGISTRY)]
fn init_sleepiq(ctx: &engine::IntegrationContext) -> engine::IntegrationFactoryResult {
    let sleepiq_config = if let Some(c) = &ctx.config.integrations.sleepiq {
        c
    } else {
        return Ok(None);
    };

    let client =
        client::RestClient::new(sleepiq_config).context("Failed to create SleepIQ client")?;
    Ok(Some(Box::new(SleepIqIntegration::new(
        client,
        sleepiq_config,
    ))))
}
