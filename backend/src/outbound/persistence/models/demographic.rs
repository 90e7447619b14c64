//! Demographic user and demographic rows.
//!
//! A demographic user's demographics live in their own table; the user row
//! maps to a [`DemographicUser`] with an empty map that the DAO fills.

use std::collections::BTreeMap;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::{Demographic, DemographicUser, DemographicValue, PersistenceFailure};
use crate::outbound::persistence::converters::{AttributeConverter, JsonListAttributeConverter};
use crate::outbound::persistence::entity::Entity;
use crate::outbound::persistence::schema::{demographics, demographics_users};

const VALUES: JsonListAttributeConverter<DemographicValue> = JsonListAttributeConverter::new();

/// Row of the `demographics_users` table.
#[derive(
    Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = demographics_users, check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct DemographicUserRow {
    pub id: String,
    pub app_id: String,
    pub study_id: Option<String>,
    pub user_id: String,
}

stored_row! {
    DemographicUserRow => demographics_users,
    key: String = [id],
    versioned: false,
    soft_delete: false,
}

impl Entity for DemographicUser {
    type Row = DemographicUserRow;

    fn key(&self) -> String {
        self.id.clone()
    }

    fn to_row(&self) -> Result<DemographicUserRow, PersistenceFailure> {
        Ok(DemographicUserRow {
            id: self.id.clone(),
            app_id: self.app_id.clone(),
            study_id: self.study_id.clone(),
            user_id: self.user_id.clone(),
        })
    }

    fn from_row(row: DemographicUserRow) -> Result<Self, PersistenceFailure> {
        Ok(Self {
            id: row.id,
            app_id: row.app_id,
            study_id: row.study_id,
            user_id: row.user_id,
            demographics: BTreeMap::new(),
        })
    }
}

/// Row of the `demographics` table.
#[derive(
    Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = demographics, check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct DemographicRow {
    pub id: String,
    pub demographic_user_id: String,
    pub category_name: String,
    pub multiple_select: bool,
    pub values: Option<String>,
    pub units: Option<String>,
}

stored_row! {
    DemographicRow => demographics,
    key: String = [id],
    versioned: false,
    soft_delete: false,
}

impl Entity for Demographic {
    type Row = DemographicRow;

    fn key(&self) -> String {
        self.id.clone()
    }

    fn to_row(&self) -> Result<DemographicRow, PersistenceFailure> {
        Ok(DemographicRow {
            id: self.id.clone(),
            demographic_user_id: self.demographic_user_id.clone(),
            category_name: self.category_name.clone(),
            multiple_select: self.multiple_select,
            values: VALUES.to_column(Some(&self.values))?,
            units: self.units.clone(),
        })
    }

    fn from_row(row: DemographicRow) -> Result<Self, PersistenceFailure> {
        Ok(Self {
            id: row.id,
            demographic_user_id: row.demographic_user_id,
            category_name: row.category_name,
            multiple_select: row.multiple_select,
            values: VALUES.to_attribute(row.values)?.unwrap_or_default(),
            units: row.units,
        })
    }
}
