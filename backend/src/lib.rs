//! Bridge persistence layer.
//!
//! Domain records and DAO ports live in [`domain`]; their PostgreSQL
//! adapters, the persistence helper and the exception converters live in
//! [`outbound::persistence`]. Database settings are loaded by [`config`].

pub mod config;
pub mod domain;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
