//! Domain-level errors (no external dependencies)

use thiserror::Error;

use super::EntityId;

/// Domain errors represent violations of the allocation contract.
/// Out-of-range share values are never errors; they get clamped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("entity set is empty")]
    EmptyEntitySet,

    #[error("entity listed more than once: {0}")]
    DuplicateEntity(EntityId),

    #[error("entity not part of this allocation: {0}")]
    UnknownEntity(EntityId),

    #[error("invalid share bounds: min {min}, max {max} (need 0 <= min < max <= 100)")]
    InvalidBounds { min: f64, max: f64 },

    #[error("sum must be exactly 100%, current sum is {total}%")]
    TotalMismatch { total: f64 },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
