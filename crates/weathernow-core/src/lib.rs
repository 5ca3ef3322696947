pub mod config;
pub mod error;

pub use config::{
    AdvisoryConfig, Config, EndpointsConfig, SearchConfig, TemperatureUnit, ValidationResult,
    WeatherConfig, WindSpeedUnit,
};
pub use error::{
    AppError, CapabilityError, ConfigError, NetworkError, ReqwestErrorExt, WeatherError,
};

use anyhow::Result;

/// Initialize logging. Safe to call more than once; later calls are ignored.
pub fn init() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    tracing::info!("Weather Now core initialized");
    Ok(())
}
