//! PostgreSQL-backed `OrganizationDao` and `SponsorDao`.
//!
//! Sponsorship is a join table between organizations and studies; both
//! sides cascade when a study or organization row is removed.

use std::sync::Arc;

use async_trait::async_trait;
use pagination::{PageRequest, PagedResourceList};

use crate::domain::ports::{OrganizationDao, SponsorDao};
use crate::domain::{BridgeError, Organization, Sponsor, Study};

use super::exceptions::{
    OrganizationPersistenceExceptionConverter, SponsorPersistenceExceptionConverter,
};
use super::helper::PersistenceHelper;
use super::pg_session::PgSessionFactory;
use super::query_builder::QueryBuilder;
use super::session::SessionFactory;
use super::statement::{Params, SqlValue};

const STUDY_SPONSORS: &str = "SELECT o.* FROM organizations o \
     JOIN organizations_studies os ON os.app_id = o.app_id AND os.org_id = o.identifier \
     WHERE os.app_id = :appId AND os.study_id = :studyId ORDER BY o.name, o.identifier";
const SPONSORED_STUDIES: &str = "SELECT s.* FROM studies s \
     JOIN organizations_studies os ON os.app_id = s.app_id AND os.study_id = s.identifier \
     WHERE os.app_id = :appId AND os.org_id = :orgId AND s.deleted = FALSE \
     ORDER BY s.name, s.identifier";
const SPONSORSHIP_COUNT: &str = "SELECT COUNT(*) AS count FROM organizations_studies \
     WHERE app_id = :appId AND study_id = :studyId AND org_id = :orgId";

fn organizations_query(app_id: &str, search_term: Option<&str>) -> QueryBuilder {
    let mut builder = QueryBuilder::new();
    builder.append_param("SELECT * FROM organizations WHERE app_id = :appId", "appId", app_id);
    if let Some(term) = search_term.filter(|term| !term.trim().is_empty()) {
        builder.append_param(
            "AND (name ILIKE :searchTerm OR identifier ILIKE :searchTerm)",
            "searchTerm",
            format!("%{}%", term.trim()),
        );
    }
    builder.append("ORDER BY name, identifier");
    builder
}

fn sponsorship_params(app_id: &str, study_id: &str, org_id: &str) -> Params {
    Params::from([
        ("appId".to_owned(), SqlValue::from(app_id)),
        ("studyId".to_owned(), SqlValue::from(study_id)),
        ("orgId".to_owned(), SqlValue::from(org_id)),
    ])
}

/// Diesel-backed implementation of the `OrganizationDao` port.
#[derive(Clone)]
pub struct DieselOrganizationDao<S = PgSessionFactory> {
    helper: PersistenceHelper<S>,
}

impl<S: SessionFactory> DieselOrganizationDao<S> {
    /// Create a DAO over the given sessions.
    pub fn new(sessions: Arc<S>) -> Self {
        Self {
            helper: PersistenceHelper::new(
                sessions,
                Arc::new(OrganizationPersistenceExceptionConverter),
            ),
        }
    }
}

#[async_trait]
impl<S: SessionFactory> OrganizationDao for DieselOrganizationDao<S> {
    async fn get_organizations(
        &self,
        app_id: &str,
        search_term: Option<String>,
        page: PageRequest,
    ) -> Result<PagedResourceList<Organization>, BridgeError> {
        let builder = organizations_query(app_id, search_term.as_deref());
        let list = self
            .helper
            .query_page::<Organization>(&builder.query(), builder.parameters().clone(), page)
            .await?;
        Ok(match search_term {
            Some(term) => list.with_request_param("searchTerm", term),
            None => list,
        })
    }

    async fn get_organization(
        &self,
        app_id: &str,
        identifier: &str,
    ) -> Result<Option<Organization>, BridgeError> {
        self.helper
            .get_by_id::<Organization>((app_id.to_owned(), identifier.to_owned()))
            .await
    }

    async fn create_organization(&self, org: Organization) -> Result<Organization, BridgeError> {
        self.helper.create(org).await
    }

    async fn update_organization(&self, org: Organization) -> Result<Organization, BridgeError> {
        self.helper.update(org).await
    }

    async fn delete_organization(
        &self,
        app_id: &str,
        identifier: &str,
    ) -> Result<(), BridgeError> {
        let org = Organization {
            app_id: app_id.to_owned(),
            identifier: identifier.to_owned(),
            ..Organization::default()
        };
        self.helper.delete(&org).await
    }
}

/// Diesel-backed implementation of the `SponsorDao` port.
#[derive(Clone)]
pub struct DieselSponsorDao<S = PgSessionFactory> {
    helper: PersistenceHelper<S>,
}

impl<S: SessionFactory> DieselSponsorDao<S> {
    /// Create a DAO over the given sessions.
    pub fn new(sessions: Arc<S>) -> Self {
        Self {
            helper: PersistenceHelper::new(
                sessions,
                Arc::new(SponsorPersistenceExceptionConverter),
            ),
        }
    }
}

#[async_trait]
impl<S: SessionFactory> SponsorDao for DieselSponsorDao<S> {
    async fn get_study_sponsors(
        &self,
        app_id: &str,
        study_id: &str,
        page: PageRequest,
    ) -> Result<PagedResourceList<Organization>, BridgeError> {
        let params = Params::from([
            ("appId".to_owned(), SqlValue::from(app_id)),
            ("studyId".to_owned(), SqlValue::from(study_id)),
        ]);
        self.helper
            .query_page::<Organization>(STUDY_SPONSORS, params, page)
            .await
    }

    async fn get_sponsored_studies(
        &self,
        app_id: &str,
        org_id: &str,
        page: PageRequest,
    ) -> Result<PagedResourceList<Study>, BridgeError> {
        let params = Params::from([
            ("appId".to_owned(), SqlValue::from(app_id)),
            ("orgId".to_owned(), SqlValue::from(org_id)),
        ]);
        self.helper
            .query_page::<Study>(SPONSORED_STUDIES, params, page)
            .await
    }

    async fn add_study_sponsor(
        &self,
        app_id: &str,
        study_id: &str,
        org_id: &str,
    ) -> Result<(), BridgeError> {
        self.helper
            .create(Sponsor::new(app_id, study_id, org_id))
            .await
            .map(|_| ())
    }

    async fn remove_study_sponsor(
        &self,
        app_id: &str,
        study_id: &str,
        org_id: &str,
    ) -> Result<(), BridgeError> {
        self.helper
            .delete(&Sponsor::new(app_id, study_id, org_id))
            .await
    }

    async fn does_organization_sponsor_study(
        &self,
        app_id: &str,
        study_id: &str,
        org_id: &str,
    ) -> Result<bool, BridgeError> {
        let count = self
            .helper
            .native_query_count(SPONSORSHIP_COUNT, sponsorship_params(app_id, study_id, org_id))
            .await?;
        Ok(count > 0)
    }
}
