//! Domain entities, errors and ports of the Bridge persistence layer.
//!
//! Entities are plain records with public fields and serde contracts
//! (camelCase, nulls omitted, a `type` discriminator where Bridge emits
//! one). Ports in [`ports`] describe the DAOs; adapters live in
//! `outbound::persistence`.

pub mod account;
pub mod alert;
pub mod assessment;
pub mod context;
pub mod demographic;
pub mod enrollment;
pub mod entity;
pub mod error;
pub mod failure;
pub mod organization;
pub mod ports;
pub mod schedule;
pub mod study;
pub mod substudy;
pub mod survey;
pub mod template;
pub mod time_zone;

pub use self::account::{
    Account, AccountId, AccountRef, AccountStatus, AccountSummary, AccountSummarySearch,
    ConsentSignature, NO_ORGANIZATION, Phone,
};
pub use self::alert::{
    Alert, AlertCategoriesAndCounts, AlertCategory, AlertCategoryAndCount, AlertFilter,
};
pub use self::assessment::{
    Assessment, AssessmentConfig, AssessmentResource, Label, PropertyInfo, ResourceCategory,
};
pub use self::context::{RequestContext, Role, StudyScope};
pub use self::demographic::{Demographic, DemographicUser, DemographicValue};
pub use self::enrollment::{Enrollment, EnrollmentDetail, EnrollmentFilter, EnrollmentInfo};
pub use self::entity::{BridgeEntity, BridgeTypeName};
pub use self::error::{BridgeError, EntityKeys};
pub use self::failure::{ConstraintKind, FailureKind, PersistenceFailure};
pub use self::organization::{Organization, Sponsor};
pub use self::schedule::Schedule2;
pub use self::study::{
    Address, ColorScheme, Contact, ContactRole, EventUpdateType, Exporter3Configuration,
    IrbDecisionType, Study, StudyCustomEvent, StudyDetail, StudyPhase,
};
pub use self::substudy::Substudy;
pub use self::survey::Survey;
pub use self::template::{MimeType, Template, TemplateRevision, TemplateType};
