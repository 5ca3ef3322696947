use crate::advisory::AdvisoryError;
use weathernow_core::{AppError, CapabilityError};

impl From<AdvisoryError> for AppError {
    fn from(e: AdvisoryError) -> Self {
        AppError::Capability(CapabilityError::Advisory(e.to_string()))
    }
}
