//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! Only persistence lives here: PostgreSQL-backed DAOs built on
//! `diesel-async`. Adapters translate between domain records and rows and
//! contain no business logic.

pub mod persistence;
