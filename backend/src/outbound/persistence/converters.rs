//! Attribute converters between rich values and their column form.
//!
//! Every converter is stateless and null-safe: `None` in gives `None` out.
//! JSON-backed converters write text columns and surface unparseable
//! stored text as a malformed-data failure rather than reading it as null.

use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::PersistenceFailure;
use crate::domain::time_zone::{format_offset, parse_offset};

/// Bidirectional conversion between an attribute `A` and a column `C`.
pub trait AttributeConverter<A, C> {
    /// Column value for an attribute.
    ///
    /// # Errors
    ///
    /// Fails when the attribute cannot be represented in the column.
    fn to_column(&self, attribute: Option<&A>) -> Result<Option<C>, PersistenceFailure>;

    /// Attribute value for a stored column.
    ///
    /// # Errors
    ///
    /// Fails with a malformed-data failure when the stored value cannot be
    /// decoded.
    fn to_attribute(&self, column: Option<C>) -> Result<Option<A>, PersistenceFailure>;
}

fn to_json<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String, PersistenceFailure> {
    serde_json::to_string(value).map_err(|err| {
        PersistenceFailure::malformed(format!("{what} could not be serialized: {err}"))
    })
}

fn from_json<T: DeserializeOwned>(text: &str, what: &str) -> Result<T, PersistenceFailure> {
    serde_json::from_str(text)
        .map_err(|err| PersistenceFailure::malformed(format!("stored {what} is not valid: {err}")))
}

/// Instant to epoch milliseconds.
///
/// # Examples
/// ```
/// use chrono::{DateTime, Utc};
/// use bridge_backend::outbound::persistence::{
///     AttributeConverter, DateTimeToLongAttributeConverter,
/// };
///
/// let instant: DateTime<Utc> = "2016-04-13T10:10:00.000Z".parse().expect("valid instant");
/// let millis = DateTimeToLongAttributeConverter.to_column(Some(&instant)).expect("converts");
/// assert_eq!(millis, Some(1_460_542_200_000));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeToLongAttributeConverter;

impl AttributeConverter<DateTime<Utc>, i64> for DateTimeToLongAttributeConverter {
    fn to_column(
        &self,
        attribute: Option<&DateTime<Utc>>,
    ) -> Result<Option<i64>, PersistenceFailure> {
        Ok(attribute.map(DateTime::timestamp_millis))
    }

    fn to_attribute(
        &self,
        column: Option<i64>,
    ) -> Result<Option<DateTime<Utc>>, PersistenceFailure> {
        column
            .map(|millis| {
                Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
                    PersistenceFailure::malformed(format!("timestamp {millis} is out of range"))
                })
            })
            .transpose()
    }
}

/// Fixed offset to `+HH:MM` text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeZoneAttributeConverter;

impl AttributeConverter<FixedOffset, String> for DateTimeZoneAttributeConverter {
    fn to_column(
        &self,
        attribute: Option<&FixedOffset>,
    ) -> Result<Option<String>, PersistenceFailure> {
        Ok(attribute.map(format_offset))
    }

    fn to_attribute(
        &self,
        column: Option<String>,
    ) -> Result<Option<FixedOffset>, PersistenceFailure> {
        column
            .map(|text| {
                parse_offset(&text).ok_or_else(|| {
                    PersistenceFailure::malformed(format!(
                        "stored time zone '{text}' is not an offset"
                    ))
                })
            })
            .transpose()
    }
}

/// JSON tree to text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonNodeAttributeConverter;

impl AttributeConverter<Value, String> for JsonNodeAttributeConverter {
    fn to_column(&self, attribute: Option<&Value>) -> Result<Option<String>, PersistenceFailure> {
        attribute.map(|value| to_json(value, "JSON node")).transpose()
    }

    fn to_attribute(&self, column: Option<String>) -> Result<Option<Value>, PersistenceFailure> {
        column.map(|text| from_json(&text, "JSON node")).transpose()
    }
}

/// String map to JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringMapAttributeConverter;

impl AttributeConverter<BTreeMap<String, String>, String> for StringMapAttributeConverter {
    fn to_column(
        &self,
        attribute: Option<&BTreeMap<String, String>>,
    ) -> Result<Option<String>, PersistenceFailure> {
        attribute.map(|map| to_json(map, "string map")).transpose()
    }

    fn to_attribute(
        &self,
        column: Option<String>,
    ) -> Result<Option<BTreeMap<String, String>>, PersistenceFailure> {
        column.map(|text| from_json(&text, "string map")).transpose()
    }
}

macro_rules! generic_json_converter {
    (
        $(#[$meta:meta])*
        $name:ident<$($param:ident),+> for $attribute:ty where [$($bounds:tt)*], $what:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name<$($param),+>(PhantomData<fn() -> ($($param,)+)>);

        impl<$($param),+> $name<$($param),+> {
            /// Converter instance.
            pub const fn new() -> Self {
                Self(PhantomData)
            }
        }

        impl<$($param),+> Default for $name<$($param),+> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<$($param),+> Clone for $name<$($param),+> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<$($param),+> Copy for $name<$($param),+> {}

        impl<$($param),+> AttributeConverter<$attribute, String> for $name<$($param),+>
        where
            $($bounds)*
        {
            fn to_column(
                &self,
                attribute: Option<&$attribute>,
            ) -> Result<Option<String>, PersistenceFailure> {
                attribute.map(|value| to_json(value, $what)).transpose()
            }

            fn to_attribute(
                &self,
                column: Option<String>,
            ) -> Result<Option<$attribute>, PersistenceFailure> {
                column.map(|text| from_json(&text, $what)).transpose()
            }
        }
    };
}

generic_json_converter! {
    /// List to JSON array text.
    JsonListAttributeConverter<T> for Vec<T>
        where [T: Serialize + DeserializeOwned],
        "JSON list"
}

generic_json_converter! {
    /// Ordered set to JSON array text.
    JsonSetAttributeConverter<T> for BTreeSet<T>
        where [T: Serialize + DeserializeOwned + Ord],
        "JSON set"
}

generic_json_converter! {
    /// `Map<K, Set<V>>` to JSON object text.
    SetMapAttributeConverter<K, V> for BTreeMap<K, BTreeSet<V>>
        where [K: Serialize + DeserializeOwned + Ord, V: Serialize + DeserializeOwned + Ord],
        "set map"
}

generic_json_converter! {
    /// Enum list to JSON array of variant names.
    EnumListAttributeConverter<E> for Vec<E>
        where [E: Serialize + DeserializeOwned + Copy],
        "enum list"
}

generic_json_converter! {
    /// Fixed-layout record to JSON object text, fields in declared order.
    JsonObjectAttributeConverter<T> for T
        where [T: Serialize + DeserializeOwned],
        "JSON object"
}
