//! Domain ports for the hexagonal boundary.
//!
//! Each DAO is an async trait implemented by a Diesel adapter in
//! `outbound::persistence`. Every method reports failures as
//! [`BridgeError`](crate::domain::BridgeError), already translated.

mod account_dao;
mod alert_dao;
mod assessment_dao;
mod demographic_dao;
mod enrollment_dao;
mod organization_dao;
mod schedule_dao;
mod study_dao;
mod substudy_dao;
mod survey_dao;
mod template_dao;

pub use account_dao::{AccountDao, AccountLookup};
#[cfg(test)]
pub use account_dao::{MockAccountDao, MockAccountLookup};
pub use alert_dao::AlertDao;
#[cfg(test)]
pub use alert_dao::MockAlertDao;
pub use assessment_dao::{AssessmentConfigDao, AssessmentDao, AssessmentResourceDao, ResourceQuery};
#[cfg(test)]
pub use assessment_dao::{MockAssessmentConfigDao, MockAssessmentDao, MockAssessmentResourceDao};
pub use demographic_dao::DemographicDao;
#[cfg(test)]
pub use demographic_dao::MockDemographicDao;
pub use enrollment_dao::EnrollmentDao;
#[cfg(test)]
pub use enrollment_dao::MockEnrollmentDao;
#[cfg(test)]
pub use organization_dao::{MockOrganizationDao, MockSponsorDao};
pub use organization_dao::{OrganizationDao, SponsorDao};
#[cfg(test)]
pub use schedule_dao::MockSchedule2Dao;
pub use schedule_dao::Schedule2Dao;
#[cfg(test)]
pub use study_dao::MockStudyDao;
pub use study_dao::StudyDao;
#[cfg(test)]
pub use substudy_dao::MockSubstudyDao;
pub use substudy_dao::SubstudyDao;
#[cfg(test)]
pub use survey_dao::MockSurveyDao;
pub use survey_dao::SurveyDao;
#[cfg(test)]
pub use template_dao::{MockTemplateDao, MockTemplateRevisionDao};
pub use template_dao::{TemplateDao, TemplateRevisionDao};
