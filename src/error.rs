use chrono::NaiveDate;

/// Application-level error: a message plus the process exit code it maps to.
///
/// Exit codes:
/// - `2` usage / input problems
/// - `3` analysis errors and empty inputs
/// - `4` runtime failures (network, terminal, file writes)
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Errors raised by the analysis core.
///
/// Each one aborts only the trajectory or risk series that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// The price series has no rows.
    EmptySeries,
    /// The resolved start date falls after the resolved end date.
    InvalidRange { start: NaiveDate, end: NaiveDate },
    /// The resolved range selects no rows.
    EmptyRange { start: NaiveDate, end: NaiveDate },
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::EmptySeries => write!(f, "Price series is empty."),
            AnalysisError::InvalidRange { start, end } => {
                write!(f, "Invalid range: resolved start {start} is after resolved end {end}.")
            }
            AnalysisError::EmptyRange { start, end } => {
                write!(f, "Empty range: no observations between {start} and {end}.")
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        AppError::new(3, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_errors_map_to_exit_code_three() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let err: AppError = AnalysisError::InvalidRange { start: d, end: d }.into();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("2024-01-02"));

        let err: AppError = AnalysisError::EmptySeries.into();
        assert_eq!(err.exit_code(), 3);
    }
}
