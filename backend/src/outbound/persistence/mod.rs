//! PostgreSQL persistence adapters for the Bridge domain.
//!
//! Adapters implement the DAO ports in [`crate::domain::ports`] on top of a
//! small session abstraction backed by `diesel-async` and `bb8` pooling.
//!
//! # Architecture
//!
//! - **Sessions**: [`SessionFactory`] runs each unit of work on one pooled
//!   connection inside `AsyncConnection::transaction`. The work receives a
//!   [`Session`]. Query-string statements use named `:param` placeholders
//!   and load [`QueryableByName`](diesel::QueryableByName) rows.
//! - **Entities**: Diesel row structs in `models`, checked against
//!   `schema`, map each domain record onto its table through the
//!   [`AttributeConverter`]s. Each row is a [`StoredRow`] with typed
//!   insert, update, find and delete operations.
//! - **Helper**: [`PersistenceHelper`] runs every operation as one unit of
//!   work and is the only place a [`PersistenceFailure`] becomes a
//!   [`BridgeError`], through the DAO's
//!   [`PersistenceExceptionConverter`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use bridge_backend::outbound::persistence::{
//!     DbPool, DieselStudyDao, PgSessionFactory, PoolConfig,
//! };
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/bridge")).await?;
//! let studies = DieselStudyDao::new(Arc::new(PgSessionFactory::new(pool)));
//! ```
//!
//! [`PersistenceFailure`]: crate::domain::PersistenceFailure
//! [`BridgeError`]: crate::domain::BridgeError

pub mod converters;
pub(crate) mod entity;
pub mod exceptions;
mod helper;
mod models;
mod pg_session;
mod pool;
mod query_builder;
mod schema;
pub(crate) mod session;
pub(crate) mod statement;

mod diesel_account_dao;
mod diesel_alert_dao;
mod diesel_assessment_dao;
mod diesel_demographic_dao;
mod diesel_enrollment_dao;
mod diesel_organization_dao;
mod diesel_schedule_dao;
mod diesel_study_dao;
mod diesel_substudy_dao;
mod diesel_survey_dao;
mod diesel_template_dao;

pub use converters::{
    AttributeConverter, DateTimeToLongAttributeConverter, DateTimeZoneAttributeConverter,
    EnumListAttributeConverter, JsonListAttributeConverter, JsonNodeAttributeConverter,
    JsonObjectAttributeConverter, JsonSetAttributeConverter, SetMapAttributeConverter,
    StringMapAttributeConverter,
};
pub use entity::{Entity, Key, StoredRow};
pub use exceptions::{
    AccountPersistenceExceptionConverter, BasicPersistenceExceptionConverter, Conversion,
    MySqlPersistenceExceptionConverter, OrganizationPersistenceExceptionConverter,
    PersistenceExceptionConverter, SponsorPersistenceExceptionConverter,
    StudyPersistenceExceptionConverter, SubstudyPersistenceExceptionConverter,
    TemplatePersistenceExceptionConverter, TemplateRevisionPersistenceExceptionConverter,
    convert_basic,
};
pub use helper::PersistenceHelper;
pub use pg_session::PgSessionFactory;
pub use pool::{DbPool, PoolConfig, PoolError};
pub use query_builder::{DataGroupOperator, QueryBuilder};
pub use session::{CountRow, Session, SessionFactory};
pub use statement::{Params, SqlValue, Statement};

pub use diesel_account_dao::{DieselAccountDao, DieselAccountLookup};
pub use diesel_alert_dao::DieselAlertDao;
pub use diesel_assessment_dao::{
    DieselAssessmentConfigDao, DieselAssessmentDao, DieselAssessmentResourceDao,
};
pub use diesel_demographic_dao::DieselDemographicDao;
pub use diesel_enrollment_dao::DieselEnrollmentDao;
pub use diesel_organization_dao::{DieselOrganizationDao, DieselSponsorDao};
pub use diesel_schedule_dao::DieselScheduleDao;
pub use diesel_study_dao::DieselStudyDao;
pub use diesel_substudy_dao::DieselSubstudyDao;
pub use diesel_survey_dao::DieselSurveyDao;
pub use diesel_template_dao::{DieselTemplateDao, DieselTemplateRevisionDao};
