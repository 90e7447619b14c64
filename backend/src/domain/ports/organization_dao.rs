//! Ports for organizations and study sponsorship.

use async_trait::async_trait;
use pagination::{PageRequest, PagedResourceList};

use crate::domain::{BridgeError, Organization, Study};

/// Organization store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrganizationDao: Send + Sync {
    /// Page through an app's organizations, optionally matching
    /// `search_term` against name and identifier.
    async fn get_organizations(
        &self,
        app_id: &str,
        search_term: Option<String>,
        page: PageRequest,
    ) -> Result<PagedResourceList<Organization>, BridgeError>;

    /// Load an organization.
    async fn get_organization(
        &self,
        app_id: &str,
        identifier: &str,
    ) -> Result<Option<Organization>, BridgeError>;

    /// Insert an organization.
    async fn create_organization(&self, org: Organization) -> Result<Organization, BridgeError>;

    /// Versioned update.
    async fn update_organization(&self, org: Organization) -> Result<Organization, BridgeError>;

    /// Remove an organization row.
    async fn delete_organization(&self, app_id: &str, identifier: &str)
    -> Result<(), BridgeError>;
}

/// Study sponsorship store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SponsorDao: Send + Sync {
    /// Page through the organizations sponsoring a study.
    async fn get_study_sponsors(
        &self,
        app_id: &str,
        study_id: &str,
        page: PageRequest,
    ) -> Result<PagedResourceList<Organization>, BridgeError>;

    /// Page through the undeleted studies an organization sponsors.
    async fn get_sponsored_studies(
        &self,
        app_id: &str,
        org_id: &str,
        page: PageRequest,
    ) -> Result<PagedResourceList<Study>, BridgeError>;

    /// Record that `org_id` sponsors `study_id`.
    async fn add_study_sponsor(
        &self,
        app_id: &str,
        study_id: &str,
        org_id: &str,
    ) -> Result<(), BridgeError>;

    /// Remove a sponsorship.
    async fn remove_study_sponsor(
        &self,
        app_id: &str,
        study_id: &str,
        org_id: &str,
    ) -> Result<(), BridgeError>;

    /// Whether `org_id` sponsors `study_id`.
    async fn does_organization_sponsor_study(
        &self,
        app_id: &str,
        study_id: &str,
        org_id: &str,
    ) -> Result<bool, BridgeError>;
}
