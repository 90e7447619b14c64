//! Low-level persistence failures reported by the session layer.
//!
//! A [`PersistenceFailure`] is what the database driver, the session adapter
//! or a column converter raises before any domain meaning is attached. It
//! may wrap a cause, mirroring how drivers nest a constraint violation
//! inside a statement error. Exception converters walk that chain to find
//! the violation they recognise.

use std::fmt;

/// Category of a constraint violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Unique index or primary key collision.
    Unique,
    /// Foreign key reference missing or still in use.
    ForeignKey,
    /// Check, not-null or any other constraint.
    Other,
}

/// Category of a persistence failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A database constraint rejected the statement.
    ConstraintViolation(ConstraintKind),
    /// A versioned update matched no row at the expected version.
    OptimisticLock,
    /// The addressed row does not exist.
    NotFound,
    /// No connection could be obtained or the connection dropped.
    Connection,
    /// Stored data could not be decoded into its in-memory form.
    MalformedData,
    /// Any other statement failure.
    Query,
}

/// A failure raised below the domain layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceFailure {
    kind: FailureKind,
    message: String,
    constraint: Option<String>,
    entity_type: Option<String>,
    cause: Option<Box<PersistenceFailure>>,
}

impl PersistenceFailure {
    /// Create a failure of the given kind.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            constraint: None,
            entity_type: None,
            cause: None,
        }
    }

    /// Unique index or primary key violation.
    pub fn unique_violation(message: impl Into<String>) -> Self {
        Self::new(
            FailureKind::ConstraintViolation(ConstraintKind::Unique),
            message,
        )
    }

    /// Foreign key violation.
    pub fn foreign_key_violation(message: impl Into<String>) -> Self {
        Self::new(
            FailureKind::ConstraintViolation(ConstraintKind::ForeignKey),
            message,
        )
    }

    /// Optimistic-lock conflict on a versioned entity.
    pub fn optimistic_lock(entity_type: impl Into<String>) -> Self {
        let entity_type = entity_type.into();
        Self::new(
            FailureKind::OptimisticLock,
            format!("{entity_type} row was updated or deleted by another transaction"),
        )
        .with_entity_type(entity_type)
    }

    /// Row addressed by key does not exist.
    pub fn not_found(entity_type: impl Into<String>) -> Self {
        let entity_type = entity_type.into();
        Self::new(FailureKind::NotFound, format!("{entity_type} row not found"))
            .with_entity_type(entity_type)
    }

    /// Connection checkout or transport failure.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Connection, message)
    }

    /// Stored value could not be decoded.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FailureKind::MalformedData, message)
    }

    /// Generic statement failure.
    pub fn query(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Query, message)
    }

    /// Attach the failure that caused this one.
    #[must_use]
    pub fn with_cause(mut self, cause: PersistenceFailure) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Attach the name of the violated constraint.
    #[must_use]
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    /// Attach the type name of the entity being persisted.
    #[must_use]
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Failure category.
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Raw driver or adapter message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Constraint name reported by the driver, if any.
    pub fn constraint(&self) -> Option<&str> {
        self.constraint.as_deref()
    }

    /// Entity type name recorded on this failure or the nearest cause.
    pub fn entity_type(&self) -> Option<&str> {
        self.chain().find_map(|failure| failure.entity_type.as_deref())
    }

    /// Immediate cause.
    pub fn cause(&self) -> Option<&PersistenceFailure> {
        self.cause.as_deref()
    }

    /// Iterate over this failure followed by each nested cause.
    pub fn chain(&self) -> impl Iterator<Item = &PersistenceFailure> {
        std::iter::successors(Some(self), |failure| failure.cause())
    }

    /// Find the first constraint violation in the cause chain.
    pub fn constraint_violation(&self) -> Option<&PersistenceFailure> {
        self.chain()
            .find(|failure| matches!(failure.kind, FailureKind::ConstraintViolation(_)))
    }

    /// Whether any failure in the chain has the given kind.
    pub fn has_kind(&self, kind: FailureKind) -> bool {
        self.chain().any(|failure| failure.kind == kind)
    }
}

impl fmt::Display for PersistenceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PersistenceFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}
