//! Organization, sponsor and substudy rows.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::{Organization, PersistenceFailure, Sponsor, Substudy};
use crate::outbound::persistence::entity::Entity;
use crate::outbound::persistence::schema::{organizations, organizations_studies, substudies};

use super::{instant, millis};

/// Row of the `organizations` table.
#[derive(
    Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = organizations, check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct OrganizationRow {
    pub app_id: String,
    pub identifier: String,
    pub name: String,
    pub description: Option<String>,
    pub created_on: i64,
    pub modified_on: i64,
    pub version: i64,
}

stored_row! {
    OrganizationRow => organizations,
    key: (String, String) = [app_id, identifier],
    versioned: true,
    soft_delete: false,
}

impl Entity for Organization {
    type Row = OrganizationRow;

    fn key(&self) -> (String, String) {
        (self.app_id.clone(), self.identifier.clone())
    }

    fn to_row(&self) -> Result<OrganizationRow, PersistenceFailure> {
        Ok(OrganizationRow {
            app_id: self.app_id.clone(),
            identifier: self.identifier.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            created_on: millis(&self.created_on),
            modified_on: millis(&self.modified_on),
            version: self.version,
        })
    }

    fn from_row(row: OrganizationRow) -> Result<Self, PersistenceFailure> {
        Ok(Self {
            app_id: row.app_id,
            identifier: row.identifier,
            name: row.name,
            description: row.description,
            created_on: instant(row.created_on)?,
            modified_on: instant(row.modified_on)?,
            version: row.version,
        })
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

/// Row of the `organizations_studies` table.
#[derive(
    Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = organizations_studies, check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct SponsorRow {
    pub app_id: String,
    pub study_id: String,
    pub org_id: String,
}

stored_row! {
    SponsorRow => organizations_studies,
    key: (String, String, String) = [app_id, study_id, org_id],
    versioned: false,
    soft_delete: false,
}

impl Entity for Sponsor {
    type Row = SponsorRow;

    fn key(&self) -> (String, String, String) {
        (self.app_id.clone(), self.study_id.clone(), self.org_id.clone())
    }

    fn to_row(&self) -> Result<SponsorRow, PersistenceFailure> {
        Ok(SponsorRow {
            app_id: self.app_id.clone(),
            study_id: self.study_id.clone(),
            org_id: self.org_id.clone(),
        })
    }

    fn from_row(row: SponsorRow) -> Result<Self, PersistenceFailure> {
        Ok(Self::new(row.app_id, row.study_id, row.org_id))
    }
}

/// Row of the `substudies` table.
#[derive(
    Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = substudies, check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct SubstudyRow {
    pub app_id: String,
    pub id: String,
    pub name: String,
    pub deleted: bool,
    pub created_on: i64,
    pub modified_on: i64,
    pub version: i64,
}

stored_row! {
    SubstudyRow => substudies,
    key: (String, String) = [app_id, id],
    versioned: true,
    soft_delete: true,
}

impl Entity for Substudy {
    type Row = SubstudyRow;

    fn key(&self) -> (String, String) {
        (self.app_id.clone(), self.id.clone())
    }

    fn to_row(&self) -> Result<SubstudyRow, PersistenceFailure> {
        Ok(SubstudyRow {
            app_id: self.app_id.clone(),
            id: self.id.clone(),
            name: self.name.clone(),
            deleted: self.deleted,
            created_on: millis(&self.created_on),
            modified_on: millis(&self.modified_on),
            version: self.version,
        })
    }

    fn from_row(row: SubstudyRow) -> Result<Self, PersistenceFailure> {
        Ok(Self {
            app_id: row.app_id,
            id: row.id,
            name: row.name,
            deleted: row.deleted,
            created_on: instant(row.created_on)?,
            modified_on: instant(row.modified_on)?,
            version: row.version,
        })
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}
