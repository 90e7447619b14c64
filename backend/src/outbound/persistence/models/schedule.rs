//! Schedule rows.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::Value;

use crate::domain::{PersistenceFailure, Schedule2};
use crate::outbound::persistence::converters::{
    AttributeConverter, JsonListAttributeConverter, JsonNodeAttributeConverter,
};
use crate::outbound::persistence::entity::Entity;
use crate::outbound::persistence::schema::schedules;

use super::{instant, millis};

const SESSIONS: JsonListAttributeConverter<Value> = JsonListAttributeConverter::new();

/// Row of the `schedules` table.
#[derive(
    Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = schedules, check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct ScheduleRow {
    pub guid: String,
    pub app_id: String,
    pub owner_id: String,
    pub name: String,
    pub duration: String,
    pub published: bool,
    pub deleted: bool,
    pub sessions: Option<String>,
    pub client_data: Option<String>,
    pub created_on: i64,
    pub modified_on: i64,
    pub version: i64,
}

stored_row! {
    ScheduleRow => schedules,
    key: String = [guid],
    versioned: true,
    soft_delete: true,
}

impl Entity for Schedule2 {
    type Row = ScheduleRow;

    fn key(&self) -> String {
        self.guid.clone()
    }

    fn to_row(&self) -> Result<ScheduleRow, PersistenceFailure> {
        Ok(ScheduleRow {
            guid: self.guid.clone(),
            app_id: self.app_id.clone(),
            owner_id: self.owner_id.clone(),
            name: self.name.clone(),
            duration: self.duration.clone(),
            published: self.published,
            deleted: self.deleted,
            sessions: SESSIONS.to_column(Some(&self.sessions))?,
            client_data: JsonNodeAttributeConverter.to_column(self.client_data.as_ref())?,
            created_on: millis(&self.created_on),
            modified_on: millis(&self.modified_on),
            version: self.version,
        })
    }

    fn from_row(row: ScheduleRow) -> Result<Self, PersistenceFailure> {
        Ok(Self {
            guid: row.guid,
            app_id: row.app_id,
            owner_id: row.owner_id,
            name: row.name,
            duration: row.duration,
            published: row.published,
            deleted: row.deleted,
            sessions: SESSIONS.to_attribute(row.sessions)?.unwrap_or_default(),
            client_data: JsonNodeAttributeConverter.to_attribute(row.client_data)?,
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
