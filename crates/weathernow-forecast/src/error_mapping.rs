//! Maps collaborator errors to weathernow_core::AppError for consistent status messages.

use weathernow_core::{AppError, CapabilityError, NetworkError, ReqwestErrorExt, WeatherError};

use crate::types::{FetchError, LocationError};

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Network(e) => AppError::Network(e.into_network_error()),
            FetchError::Status(status) => AppError::Network(NetworkError::ServerError {
                status,
                message: format!("upstream returned {status}"),
            }),
            FetchError::Parse(s) => AppError::Weather(WeatherError::Malformed(s)),
        }
    }
}

impl From<LocationError> for AppError {
    fn from(e: LocationError) -> Self {
        AppError::Capability(CapabilityError::Location(e.to_string()))
    }
}

impl FetchError {
    /// Failure of a place search, as shown in the status line
    pub fn into_search_error(self) -> AppError {
        AppError::Weather(WeatherError::SearchFailed(self.to_string()))
    }

    /// Failure of a forecast refresh; the last reading stays on screen
    pub fn into_forecast_error(self) -> AppError {
        AppError::Weather(WeatherError::ForecastFailed(self.to_string()))
    }
}
