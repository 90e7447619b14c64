//! Survey rows.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::Value;

use crate::domain::{PersistenceFailure, Survey};
use crate::outbound::persistence::converters::{AttributeConverter, JsonListAttributeConverter};
use crate::outbound::persistence::entity::Entity;
use crate::outbound::persistence::schema::surveys;

use super::{instant, millis};

const ELEMENTS: JsonListAttributeConverter<Value> = JsonListAttributeConverter::new();

/// Row of the `surveys` table.
#[derive(
    Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = surveys, check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct SurveyRow {
    pub guid: String,
    pub created_on: i64,
    pub app_id: String,
    pub identifier: String,
    pub name: String,
    pub copyright_notice: Option<String>,
    pub module_id: Option<String>,
    pub published: bool,
    pub deleted: bool,
    pub schema_revision: Option<i32>,
    pub elements: Option<String>,
    pub modified_on: i64,
    pub version: i64,
}

stored_row! {
    SurveyRow => surveys,
    key: (String, i64) = [guid, created_on],
    versioned: true,
    soft_delete: true,
}

impl Entity for Survey {
    type Row = SurveyRow;

    fn key(&self) -> (String, i64) {
        (self.guid.clone(), millis(&self.created_on))
    }

    fn to_row(&self) -> Result<SurveyRow, PersistenceFailure> {
        Ok(SurveyRow {
            guid: self.guid.clone(),
            created_on: millis(&self.created_on),
            app_id: self.app_id.clone(),
            identifier: self.identifier.clone(),
            name: self.name.clone(),
            copyright_notice: self.copyright_notice.clone(),
            module_id: self.module_id.clone(),
            published: self.published,
            deleted: self.deleted,
            schema_revision: self.schema_revision,
            elements: ELEMENTS.to_column(Some(&self.elements))?,
            modified_on: millis(&self.modified_on),
            version: self.version,
        })
    }

    fn from_row(row: SurveyRow) -> Result<Self, PersistenceFailure> {
        Ok(Self {
            guid: row.guid,
            created_on: instant(row.created_on)?,
            app_id: row.app_id,
            identifier: row.identifier,
            name: row.name,
            copyright_notice: row.copyright_notice,
            module_id: row.module_id,
            published: row.published,
            deleted: row.deleted,
            schema_revision: row.schema_revision,
            elements: ELEMENTS.to_attribute(row.elements)?.unwrap_or_default(),
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
