use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backing store for slot configuration could not be read.
    #[error("Data access error: {0}")]
    DataAccess(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
