use sea_orm::DbErr;
use thiserror::Error;

/// Errors that can occur during graph store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No profile is stored under the given username.
    #[error("Profile not found: {username}")]
    NotFound { username: String },

    /// The database rejected or failed an operation.
    #[error("Failed to {operation}: {message}")]
    Persistence {
        operation: &'static str,
        message: String,
        #[source]
        source: DbErr,
    },

    /// Invalid input data.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl StoreError {
    /// Create a NotFound error for a username lookup.
    pub fn not_found(username: &str) -> Self {
        Self::NotFound {
            username: username.to_string(),
        }
    }

    /// Wrap a database error with the operation that failed.
    pub fn persistence(operation: &'static str, source: DbErr) -> Self {
        Self::Persistence {
            operation,
            message: source.to_string(),
            source,
        }
    }

    /// Whether this is a lookup miss rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_error_carries_operation_and_source() {
        let err = StoreError::persistence(
            "save profiles",
            DbErr::Custom("UNIQUE constraint failed: profiles.external_id".into()),
        );

        let msg = err.to_string();
        assert!(msg.starts_with("Failed to save profiles"));
        assert!(msg.contains("external_id"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_display() {
        let err = StoreError::not_found("doesnotexist");
        assert_eq!(err.to_string(), "Profile not found: doesnotexist");
        assert!(err.is_not_found());
    }
}
