//! Maps session errors to weathernow_core::AppError for consistent status messages.
//! Forecast collaborator errors are mapped in weathernow-forecast.

mod advisory;

#[cfg(test)]
mod tests {
    use crate::advisory::AdvisoryError;
    use weathernow_core::AppError;

    #[test]
    fn test_advisory_maps_to_capability() {
        let err: AppError = AdvisoryError::ModelMissing("tiny".into()).into();
        assert!(matches!(err, AppError::Capability(_)));
        assert_eq!(
            err.user_message(),
            "AI unavailable. You can still use the weather features."
        );
    }

    #[test]
    fn test_not_configured_message() {
        let err: AppError = AdvisoryError::NotConfigured.into();
        assert!(err.to_string().contains("not configured"));
    }
}
