//! Default conversion for failures without entity-specific meaning.

use async_trait::async_trait;

use crate::domain::{BridgeEntity, BridgeError, FailureKind, PersistenceFailure};

use super::{Conversion, PersistenceExceptionConverter};

/// Converts optimistic-lock and not-found failures; returns everything
/// else unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicPersistenceExceptionConverter;

#[async_trait]
impl PersistenceExceptionConverter for BasicPersistenceExceptionConverter {
    async fn convert(
        &self,
        failure: PersistenceFailure,
        subject: Option<&dyn BridgeEntity>,
    ) -> Conversion {
        convert_basic(failure, subject)
    }
}

/// The basic conversion as a plain function.
///
/// # Examples
/// ```
/// use bridge_backend::domain::{BridgeError, PersistenceFailure};
/// use bridge_backend::outbound::persistence::{Conversion, convert_basic};
///
/// let converted = convert_basic(PersistenceFailure::optimistic_lock("Study"), None);
/// assert_eq!(
///     converted,
///     Conversion::Converted(BridgeError::concurrent_modification("Study"))
/// );
/// ```
pub fn convert_basic(
    failure: PersistenceFailure,
    subject: Option<&dyn BridgeEntity>,
) -> Conversion {
    let entity_type = || {
        subject
            .map(|s| s.type_name().to_owned())
            .or_else(|| failure.entity_type().map(str::to_owned))
            .unwrap_or_else(|| "Entity".to_owned())
    };
    if failure.has_kind(FailureKind::OptimisticLock) {
        return Conversion::Converted(BridgeError::concurrent_modification(entity_type()));
    }
    if failure.has_kind(FailureKind::NotFound) {
        return Conversion::Converted(BridgeError::not_found(entity_type()));
    }
    Conversion::Unconverted(failure)
}
