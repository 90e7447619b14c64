//! Domain-level error types raised by the persistence layer.
//!
//! Low-level [`PersistenceFailure`]s are translated into these once, by the
//! exception converter the persistence helper is built with. DAOs return
//! them unchanged.

use std::collections::BTreeMap;

use pagination::PageError;

use super::failure::PersistenceFailure;

/// Identifying values attached to a conflict, such as `userId`.
pub type EntityKeys = BTreeMap<String, String>;

/// Errors surfaced by DAOs and the persistence helper.
///
/// # Examples
/// ```
/// use bridge_backend::domain::BridgeError;
///
/// let err = BridgeError::not_found("Study");
/// assert_eq!(err.to_string(), "Study not found.");
/// assert_eq!(err.status_code(), 404);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// A unique key collided with an existing entity.
    #[error("{message}")]
    EntityAlreadyExists {
        /// Type name of the conflicting entity.
        entity_type: String,
        /// User-facing message.
        message: String,
        /// Keys identifying the existing entity.
        entity_keys: EntityKeys,
    },
    /// The entity was changed by someone else since it was read.
    #[error("{message}")]
    ConcurrentModification {
        /// Type name of the stale entity.
        entity_type: String,
        /// User-facing message.
        message: String,
    },
    /// A constraint rejected the write for a reason the caller can correct.
    #[error("{message}")]
    ConstraintViolation {
        /// User-facing message.
        message: String,
        /// Keys identifying the entities involved.
        entity_keys: EntityKeys,
    },
    /// The addressed entity does not exist.
    #[error("{message}")]
    EntityNotFound {
        /// Type name of the missing entity.
        entity_type: String,
        /// User-facing message.
        message: String,
    },
    /// The request itself was invalid.
    #[error("{message}")]
    BadRequest {
        /// User-facing message.
        message: String,
    },
    /// A failure with no domain meaning.
    #[error("{message}")]
    Persistence {
        /// Summary of the failure.
        message: String,
        /// The untranslated failure.
        #[source]
        source: PersistenceFailure,
    },
}

impl BridgeError {
    /// Build an already-exists error.
    pub fn already_exists(
        entity_type: impl Into<String>,
        message: impl Into<String>,
        entity_keys: EntityKeys,
    ) -> Self {
        Self::EntityAlreadyExists {
            entity_type: entity_type.into(),
            message: message.into(),
            entity_keys,
        }
    }

    /// Build the standard concurrent-modification error for an entity type.
    pub fn concurrent_modification(entity_type: impl Into<String>) -> Self {
        let entity_type = entity_type.into();
        let message = format!(
            "{entity_type} has the wrong version number; it may have been saved in the background."
        );
        Self::ConcurrentModification {
            entity_type,
            message,
        }
    }

    /// Build a concurrent-modification error with a custom message.
    pub fn concurrent_modification_with_message(
        entity_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ConcurrentModification {
            entity_type: entity_type.into(),
            message: message.into(),
        }
    }

    /// Build a constraint violation without entity keys.
    pub fn constraint_violation(message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            message: message.into(),
            entity_keys: EntityKeys::new(),
        }
    }

    /// Build the standard not-found error for an entity type.
    pub fn not_found(entity_type: impl Into<String>) -> Self {
        let entity_type = entity_type.into();
        let message = format!("{entity_type} not found.");
        Self::EntityNotFound {
            entity_type,
            message,
        }
    }

    /// Build a not-found error with a custom message.
    pub fn not_found_with_message(
        entity_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::EntityNotFound {
            entity_type: entity_type.into(),
            message: message.into(),
        }
    }

    /// Build a bad-request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Wrap a failure no converter recognised.
    pub fn persistence(source: PersistenceFailure) -> Self {
        Self::Persistence {
            message: format!("Persistence failure: {source}"),
            source,
        }
    }

    /// Attach an identifying key to an already-exists or constraint error.
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn with_entity_key(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self {
            Self::EntityAlreadyExists { entity_keys, .. }
            | Self::ConstraintViolation { entity_keys, .. } => {
                entity_keys.insert(key.into(), value.into());
            }
            _ => {}
        }
        self
    }

    /// User-facing message.
    pub fn message(&self) -> &str {
        match self {
            Self::EntityAlreadyExists { message, .. }
            | Self::ConcurrentModification { message, .. }
            | Self::ConstraintViolation { message, .. }
            | Self::EntityNotFound { message, .. }
            | Self::BadRequest { message }
            | Self::Persistence { message, .. } => message,
        }
    }

    /// Entity keys carried by the error; empty for variants without keys.
    pub fn entity_keys(&self) -> Option<&EntityKeys> {
        match self {
            Self::EntityAlreadyExists { entity_keys, .. }
            | Self::ConstraintViolation { entity_keys, .. } => Some(entity_keys),
            _ => None,
        }
    }

    /// HTTP-style status an outer layer should report.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::EntityAlreadyExists { .. }
            | Self::ConcurrentModification { .. }
            | Self::ConstraintViolation { .. } => 409,
            Self::EntityNotFound { .. } => 404,
            Self::BadRequest { .. } => 400,
            Self::Persistence { .. } => 500,
        }
    }
}

impl From<PageError> for BridgeError {
    fn from(err: PageError) -> Self {
        Self::bad_request(err.to_string())
    }
}
