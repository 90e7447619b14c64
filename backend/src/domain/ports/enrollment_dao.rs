//! Port for enrollment listings.

use async_trait::async_trait;
use pagination::{PageRequest, PagedResourceList};

use crate::domain::{BridgeError, EnrollmentDetail, EnrollmentFilter, RequestContext};

/// Read access to enrollments. Writes go through the account store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentDao: Send + Sync {
    /// Page through a study's enrollments.
    ///
    /// Accounts in the `test_user` data group are skipped unless
    /// `include_testers` is set.
    async fn get_enrollments_for_study(
        &self,
        app_id: &str,
        study_id: &str,
        filter: EnrollmentFilter,
        include_testers: bool,
        page: PageRequest,
    ) -> Result<PagedResourceList<EnrollmentDetail>, BridgeError>;

    /// Every enrollment of one account in studies the caller can see.
    async fn get_enrollments_for_user(
        &self,
        ctx: &RequestContext,
        app_id: &str,
        user_id: &str,
    ) -> Result<Vec<EnrollmentDetail>, BridgeError>;
}
