//! Centralized error types for Weather Now.
//!
//! None of these are fatal to a session. Every failure degrades to the last
//! good state or a default, and `user_message()` gives the non-blocking status
//! text shown to the user.

use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Capability unavailable: {0}")]
    Capability(#[from] CapabilityError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for a status line.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Capability(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The server is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Weather lookup errors.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Place search failed: {0}")]
    SearchFailed(String),

    #[error("Forecast unavailable: {0}")]
    ForecastFailed(String),

    #[error("Malformed upstream data: {0}")]
    Malformed(String),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::SearchFailed(_) => "Place search is unavailable right now.",
            WeatherError::ForecastFailed(_) => {
                "Couldn't refresh the weather. Showing the last reading."
            }
            WeatherError::Malformed(_) => "The weather service sent unexpected data.",
        }
    }
}

/// Optional capabilities (advisory engine, device location) that are missing
/// or failed to start. The rest of the app keeps working.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("Location unavailable: {0}")]
    Location(String),

    #[error("Advisory engine unavailable: {0}")]
    Advisory(String),
}

impl CapabilityError {
    pub fn user_message(&self) -> &'static str {
        match self {
            CapabilityError::Location(_) => "Location isn't available on this device.",
            CapabilityError::Advisory(_) => {
                "AI unavailable. You can still use the weather features."
            }
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_are_non_empty() {
        let errors = vec![
            AppError::from(NetworkError::Timeout),
            AppError::from(ConfigError::Invalid("test".into())),
            AppError::from(WeatherError::ForecastFailed("test".into())),
            AppError::from(CapabilityError::Advisory("test".into())),
            AppError::from(anyhow::anyhow!("boom")),
        ];

        for err in errors {
            assert!(!err.user_message().is_empty(), "empty message for {err}");
        }
    }

    #[test]
    fn test_app_error_conversion() {
        let err: AppError = CapabilityError::Location("unsupported".into()).into();
        assert!(matches!(err, AppError::Capability(CapabilityError::Location(_))));
    }

    #[test]
    fn test_server_error_message_depends_on_status() {
        let upstream = NetworkError::ServerError {
            status: 503,
            message: "down".into(),
        };
        let client = NetworkError::ServerError {
            status: 400,
            message: "bad".into(),
        };
        assert!(upstream.user_message().contains("experiencing issues"));
        assert_eq!(client.user_message(), "The request failed. Please try again.");
    }

    #[test]
    fn test_user_message_propagation() {
        let err = AppError::Weather(WeatherError::ForecastFailed("500".into()));
        assert_eq!(
            err.user_message(),
            "Couldn't refresh the weather. Showing the last reading."
        );
    }
}
