//! Type identity shared by every persisted entity.
//!
//! Exception converters receive the entity being written as a
//! `&dyn BridgeEntity` so they can interpolate its type name into messages
//! and, for the entity families they own, downcast to read identifying
//! values.

use std::any::Any;

/// Static type name used in user-facing messages and JSON `type` fields.
pub trait BridgeTypeName {
    /// Name such as `"Account"` or `"Schedule"`.
    const TYPE_NAME: &'static str;
}

/// Object-safe view of a persisted entity.
///
/// Implemented for every [`BridgeTypeName`] type.
///
/// # Examples
/// ```
/// use bridge_backend::domain::{BridgeEntity, Schedule2};
///
/// let schedule = Schedule2::default();
/// let subject: &dyn BridgeEntity = &schedule;
/// assert_eq!(subject.type_name(), "Schedule");
/// assert!(subject.downcast_ref::<Schedule2>().is_some());
/// ```
pub trait BridgeEntity: Any + Send + Sync + 'static {
    /// Entity type name.
    fn type_name(&self) -> &'static str;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

impl<T> BridgeEntity for T
where
    T: BridgeTypeName + Any + Send + Sync,
{
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn BridgeEntity {
    /// Borrow the entity as `T` when it is one.
    pub fn downcast_ref<T: BridgeEntity>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}
