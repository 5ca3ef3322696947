//! Device position for the "use my location" action.
//!
//! There is no portable system location API, so the stock providers are
//! "unsupported" and a fixed position taken from configuration.

use async_trait::async_trait;

use crate::types::{Coordinates, LocationError};

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;

    /// Whether asking for a position can ever succeed
    fn is_available(&self) -> bool {
        true
    }
}

/// No location source on this device
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

#[async_trait]
impl LocationProvider for Unsupported {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::Unsupported)
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Always reports the same coordinates
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinates);

#[async_trait]
impl LocationProvider for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_reports_unavailable() {
        let provider = Unsupported;
        assert!(!provider.is_available());
        assert!(matches!(
            provider.current_position().await,
            Err(LocationError::Unsupported)
        ));
    }

    #[tokio::test]
    async fn test_fixed_position_returns_coordinates() {
        let here = Coordinates {
            latitude: 39.74,
            longitude: -104.98,
        };
        let provider = FixedPosition(here);
        assert!(provider.is_available());
        assert_eq!(provider.current_position().await.unwrap(), here);
    }
}
