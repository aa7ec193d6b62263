#[cfg(feature = "integration_sleepiq")]
pub mod sleepiq;
