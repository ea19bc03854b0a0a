use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("No price history available for {ticker}")]
    DataUnavailable { ticker: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Analyzer task failed: {0}")]
    TaskFailed(String),
}

impl AnalysisError {
    /// Soft errors are resolved to an analyzer's neutral default instead of
    /// failing the whole prediction.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            AnalysisError::InsufficientData(_)
                | AnalysisError::ProviderUnavailable(_)
                | AnalysisError::InvalidData(_)
        )
    }

    /// Substitute `fallback` for a soft error; hard errors are returned unchanged.
    pub fn recover<T>(
        result: Result<T, AnalysisError>,
        analyzer: &str,
        fallback: impl FnOnce(&AnalysisError) -> T,
    ) -> Result<T, AnalysisError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) if e.is_soft() => {
                tracing::debug!(analyzer, error = %e, "analyzer degraded to neutral default");
                Ok(fallback(&e))
            }
            Err(e) => Err(e),
        }
    }
}
