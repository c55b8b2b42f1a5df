use thiserror::Error;

use crate::domain::Category;

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

/// Failure of a single remote lookup.
///
/// The `Display` form is what ends up in a category's `error` string. It leaves
/// the category out; the dashboard notice already names it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport failure or a non-success response status.
    #[error("{reason}")]
    FetchFailed { category: Category, reason: String },

    /// The response body is not a JSON array of rows.
    #[error("unreadable response: {reason}")]
    ParseFailed { category: Category, reason: String },
}

impl FetchError {
    pub fn category(&self) -> Category {
        match self {
            FetchError::FetchFailed { category, .. } | FetchError::ParseFailed { category, .. } => *category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_message_leaves_the_category_to_the_caller() {
        let err = FetchError::FetchFailed {
            category: Category::Parking,
            reason: "status 503 Service Unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "status 503 Service Unavailable");
        assert_eq!(err.category(), Category::Parking);

        let err = FetchError::ParseFailed {
            category: Category::Weather,
            reason: "expected a JSON array, got an object".to_string(),
        };
        assert_eq!(err.to_string(), "unreadable response: expected a JSON array, got an object");
    }

    #[test]
    fn app_error_keeps_exit_code() {
        let err = AppError::new(2, "bad date");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "bad date");
    }
}
