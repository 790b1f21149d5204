//! Error taxonomy shared by the store and every derived catalog operation.

use crate::model::ServiceId;
use crate::schema::SchemaVariant;
use thiserror::Error;

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("service tree cycle detected at service {service_id}")]
    CycleDetected { service_id: ServiceId },

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("operation requires the {required} schema, store uses {actual}")]
    UnsupportedSchema {
        required: SchemaVariant,
        actual: SchemaVariant,
    },

    #[error("catalog store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Response codes the adapters map errors onto. NotFound and StoreUnavailable
/// never share a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotFound,
    InvalidArgument,
    FailedPrecondition,
    Conflict,
    Unimplemented,
    Unavailable,
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::FailedPrecondition => "FAILED_PRECONDITION",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::Unimplemented => "UNIMPLEMENTED",
            ErrorCode::Unavailable => "UNAVAILABLE",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CatalogError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            CatalogError::NotFound { .. } => ErrorCode::NotFound,
            CatalogError::InvalidInput(_) => ErrorCode::InvalidArgument,
            CatalogError::CycleDetected { .. } => ErrorCode::FailedPrecondition,
            CatalogError::Constraint(_) => ErrorCode::Conflict,
            CatalogError::UnsupportedSchema { .. } => ErrorCode::Unimplemented,
            CatalogError::StoreUnavailable(_) => ErrorCode::Unavailable,
            CatalogError::Config(_) => ErrorCode::Internal,
        }
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                CatalogError::Constraint(e.to_string())
            }
            other => CatalogError::StoreUnavailable(other.to_string()),
        }
    }
}
