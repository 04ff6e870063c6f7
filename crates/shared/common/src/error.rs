//! Unified error handling for gRPC services.
//!
//! Provides a single error type that repositories, use cases and transport
//! adapters share, plus its conversion to Tonic gRPC status codes.

use domain::DomainError;
use thiserror::Error;
use tonic::{metadata::MetadataValue, Status};

/// Metadata key carrying the machine-readable error reason
pub const ERROR_REASON_METADATA_KEY: &str = "x-error-reason";

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Domain errors
    #[error("User does not exist")]
    UserNotFound,

    #[error("User is frozen, please contact the administrator")]
    UserIsFrozen,

    // Validation
    #[error("{0}")]
    Validation(String),

    // External service errors
    #[cfg(feature = "database")]
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[cfg(feature = "cache")]
    #[error("Cache error")]
    Cache(#[from] redis::RedisError),

    #[error("Deadline exceeded")]
    Timeout,

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Get error reason for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::UserIsFrozen => "USER_IS_FROZEN",
            AppError::Validation(_) => "VALIDATION_ERROR",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            #[cfg(feature = "cache")]
            AppError::Cache(_) => "CACHE_ERROR",
            AppError::Timeout => "DEADLINE_EXCEEDED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get gRPC status code
    pub fn grpc_code(&self) -> tonic::Code {
        match self {
            AppError::UserNotFound => tonic::Code::NotFound,
            AppError::UserIsFrozen => tonic::Code::FailedPrecondition,
            AppError::Validation(_) => tonic::Code::InvalidArgument,
            AppError::Timeout => tonic::Code::DeadlineExceeded,
            _ => tonic::Code::Internal,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),

            #[cfg(feature = "database")]
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            #[cfg(feature = "cache")]
            AppError::Cache(e) => {
                tracing::error!("Cache error: {:?}", e);
                "A cache error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            _ => self.to_string(),
        }
    }
}

// =============================================================================
// gRPC Status (Tonic)
// =============================================================================

impl From<AppError> for Status {
    fn from(err: AppError) -> Self {
        let mut status = Status::new(err.grpc_code(), err.user_message());
        status.metadata_mut().insert(
            ERROR_REASON_METADATA_KEY,
            MetadataValue::from_static(err.code()),
        );
        status
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::UserNotFound => AppError::UserNotFound,
            DomainError::UserIsFrozen => AppError::UserIsFrozen,
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::Password(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_user_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_user_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::UserNotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
