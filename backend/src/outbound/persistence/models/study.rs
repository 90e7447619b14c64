//! Study rows.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use crate::domain::{
    ColorScheme, Contact, Exporter3Configuration, PersistenceFailure, Study, StudyCustomEvent,
};
use crate::outbound::persistence::converters::{
    AttributeConverter, JsonListAttributeConverter, JsonObjectAttributeConverter,
    JsonSetAttributeConverter,
};
use crate::outbound::persistence::entity::Entity;
use crate::outbound::persistence::schema::studies;

use super::{
    column_text, from_column_text, instant, millis, opt_from_column_text, opt_instant, opt_millis,
};

const STRINGS: JsonSetAttributeConverter<String> = JsonSetAttributeConverter::new();
const CONTACTS: JsonListAttributeConverter<Contact> = JsonListAttributeConverter::new();
const EVENTS: JsonListAttributeConverter<StudyCustomEvent> = JsonListAttributeConverter::new();
const COLORS: JsonObjectAttributeConverter<ColorScheme> = JsonObjectAttributeConverter::new();
const EXPORTER: JsonObjectAttributeConverter<Exporter3Configuration> =
    JsonObjectAttributeConverter::new();

/// Row of the `studies` table.
#[derive(
    Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = studies, check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct StudyRow {
    pub app_id: String,
    pub identifier: String,
    pub name: String,
    pub details: Option<String>,
    pub phase: String,
    pub study_logo_url: Option<String>,
    pub color_scheme: Option<String>,
    pub institution_id: Option<String>,
    pub irb_name: Option<String>,
    pub irb_protocol_name: Option<String>,
    pub irb_protocol_id: Option<String>,
    pub irb_decision_on: Option<NaiveDate>,
    pub irb_expires_on: Option<NaiveDate>,
    pub irb_decision_type: Option<String>,
    pub keywords: Option<String>,
    pub diseases: Option<String>,
    pub study_designs: Option<String>,
    pub contacts: Option<String>,
    pub custom_events: Option<String>,
    pub exporter3_configuration: Option<String>,
    pub exporter3_enabled: bool,
    pub schedule_guid: Option<String>,
    pub created_by: Option<String>,
    pub launched_on: Option<i64>,
    pub closeout_on: Option<i64>,
    pub created_on: i64,
    pub modified_on: i64,
    pub deleted: bool,
    pub version: i64,
}

stored_row! {
    StudyRow => studies,
    key: (String, String) = [app_id, identifier],
    versioned: true,
    soft_delete: true,
}

impl Entity for Study {
    type Row = StudyRow;

    fn key(&self) -> (String, String) {
        (self.app_id.clone(), self.identifier.clone())
    }

    fn to_row(&self) -> Result<StudyRow, PersistenceFailure> {
        Ok(StudyRow {
            app_id: self.app_id.clone(),
            identifier: self.identifier.clone(),
            name: self.name.clone(),
            details: self.details.clone(),
            phase: column_text(&self.phase),
            study_logo_url: self.study_logo_url.clone(),
            color_scheme: COLORS.to_column(self.color_scheme.as_ref())?,
            institution_id: self.institution_id.clone(),
            irb_name: self.irb_name.clone(),
            irb_protocol_name: self.irb_protocol_name.clone(),
            irb_protocol_id: self.irb_protocol_id.clone(),
            irb_decision_on: self.irb_decision_on,
            irb_expires_on: self.irb_expires_on,
            irb_decision_type: self.irb_decision_type.as_ref().map(column_text),
            keywords: self.keywords.clone(),
            diseases: STRINGS.to_column(Some(&self.diseases))?,
            study_designs: STRINGS.to_column(Some(&self.study_designs))?,
            contacts: CONTACTS.to_column(Some(&self.contacts))?,
            custom_events: EVENTS.to_column(Some(&self.custom_events))?,
            exporter3_configuration: EXPORTER.to_column(self.exporter3_configuration.as_ref())?,
            exporter3_enabled: self.exporter3_enabled,
            schedule_guid: self.schedule_guid.clone(),
            created_by: self.created_by.clone(),
            launched_on: opt_millis(self.launched_on.as_ref()),
            closeout_on: opt_millis(self.closeout_on.as_ref()),
            created_on: millis(&self.created_on),
            modified_on: millis(&self.modified_on),
            deleted: self.deleted,
            version: self.version,
        })
    }

    fn from_row(row: StudyRow) -> Result<Self, PersistenceFailure> {
        Ok(Self {
            app_id: row.app_id,
            identifier: row.identifier,
            name: row.name,
            details: row.details,
            phase: from_column_text(row.phase)?,
            study_logo_url: row.study_logo_url,
            color_scheme: COLORS.to_attribute(row.color_scheme)?,
            institution_id: row.institution_id,
            irb_name: row.irb_name,
            irb_protocol_name: row.irb_protocol_name,
            irb_protocol_id: row.irb_protocol_id,
            irb_decision_on: row.irb_decision_on,
            irb_expires_on: row.irb_expires_on,
            irb_decision_type: opt_from_column_text(row.irb_decision_type)?,
            keywords: row.keywords,
            diseases: strings(row.diseases)?,
            study_designs: strings(row.study_designs)?,
            contacts: CONTACTS.to_attribute(row.contacts)?.unwrap_or_default(),
            custom_events: EVENTS.to_attribute(row.custom_events)?.unwrap_or_default(),
            exporter3_configuration: EXPORTER.to_attribute(row.exporter3_configuration)?,
            exporter3_enabled: row.exporter3_enabled,
            schedule_guid: row.schedule_guid,
            created_by: row.created_by,
            launched_on: opt_instant(row.launched_on)?,
            closeout_on: opt_instant(row.closeout_on)?,
            created_on: instant(row.created_on)?,
            modified_on: instant(row.modified_on)?,
            deleted: row.deleted,
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

fn strings(column: Option<String>) -> Result<BTreeSet<String>, PersistenceFailure> {
    Ok(STRINGS.to_attribute(column)?.unwrap_or_default())
}
