use std::fmt::{Display, Formatter};

use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppErrorType {
    NotFoundError,
    PayloadValidationError,
    IllegalTransition,
    AlreadyRated,
    ForbiddenError,
    StorageError,
    StorageCorrupt,
    SerializationError,
    InternalServerError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppError {
    pub error_type: AppErrorType,
    pub message: Option<String>,
    pub cause: Option<String>,
}

impl AppError {
    pub fn message(&self) -> String {
        match self {
            AppError {
                message: Some(message),
                ..
            } => message.clone(),

            AppError {
                message: None,
                error_type: AppErrorType::NotFoundError,
                ..
            } => "The requested item was not found".to_string(),
            AppError {
                message: None,
                error_type: AppErrorType::AlreadyRated,
                ..
            } => "This session has already been rated".to_string(),
            _ => "An unexpected error has occurred".to_string(),
        }
    }

    pub fn not_found(error: impl ToString) -> AppError {
        AppError {
            cause: None,
            error_type: AppErrorType::NotFoundError,
            message: Some(error.to_string()),
        }
    }

    pub fn validation_error(error: impl ToString) -> AppError {
        AppError {
            cause: None,
            error_type: AppErrorType::PayloadValidationError,
            message: Some(error.to_string()),
        }
    }

    pub fn illegal_transition(error: impl ToString) -> AppError {
        AppError {
            cause: None,
            error_type: AppErrorType::IllegalTransition,
            message: Some(error.to_string()),
        }
    }

    pub fn already_rated(request_id: &str) -> AppError {
        AppError {
            cause: None,
            error_type: AppErrorType::AlreadyRated,
            message: Some(format!("Request {} has already been rated", request_id)),
        }
    }

    pub fn forbidden_error(error: impl ToString) -> AppError {
        AppError {
            cause: None,
            error_type: AppErrorType::ForbiddenError,
            message: Some(error.to_string()),
        }
    }

    pub fn storage_error(error: impl ToString) -> AppError {
        AppError {
            cause: Some(error.to_string()),
            error_type: AppErrorType::StorageError,
            message: Some("The persistence backend could not be reached".to_string()),
        }
    }

    pub fn internal_error(error: impl ToString) -> AppError {
        AppError {
            cause: Some(error.to_string()),
            error_type: AppErrorType::InternalServerError,
            message: Some(error.to_string()),
        }
    }

    pub fn is(&self, error_type: AppErrorType) -> bool {
        self.error_type == error_type
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Corrupt { .. } => AppError {
                cause: Some(error.to_string()),
                error_type: AppErrorType::StorageCorrupt,
                message: Some("Stored data could not be parsed".to_string()),
            },
            StoreError::Serialization(e) => AppError {
                cause: Some(e.to_string()),
                error_type: AppErrorType::SerializationError,
                message: Some(format!("Failed to serialize data: {}", e)),
            },
            other => AppError::storage_error(other),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError {
            cause: Some(error.to_string()),
            error_type: AppErrorType::SerializationError,
            message: Some(format!("Failed to (de)serialize data: {}", error)),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError {
            cause: None,
            error_type: AppErrorType::PayloadValidationError,
            message: Some(errors.to_string()),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.error_type, self.message())
    }
}

impl std::error::Error for AppError {}
