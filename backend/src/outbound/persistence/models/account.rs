//! Account and enrollment rows.

use std::collections::{BTreeMap, BTreeSet};

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::{Account, ConsentSignature, Enrollment, Phone, PersistenceFailure, Role};
use crate::outbound::persistence::converters::{
    AttributeConverter, DateTimeZoneAttributeConverter, JsonListAttributeConverter,
    JsonObjectAttributeConverter, JsonSetAttributeConverter, StringMapAttributeConverter,
};
use crate::outbound::persistence::entity::Entity;
use crate::outbound::persistence::schema::{accounts, enrollments};

use super::{column_text, from_column_text, instant, millis, opt_instant, opt_millis};

type ConsentHistories = BTreeMap<String, Vec<ConsentSignature>>;

const STRINGS: JsonSetAttributeConverter<String> = JsonSetAttributeConverter::new();
const ROLES: JsonSetAttributeConverter<Role> = JsonSetAttributeConverter::new();
const LANGUAGES: JsonListAttributeConverter<String> = JsonListAttributeConverter::new();
const HISTORIES: JsonObjectAttributeConverter<ConsentHistories> =
    JsonObjectAttributeConverter::new();

/// Row of the `accounts` table.
#[derive(
    Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = accounts, check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct AccountRow {
    pub id: String,
    pub app_id: String,
    pub org_membership: Option<String>,
    pub email: Option<String>,
    pub email_verified: bool,
    pub phone_number: Option<String>,
    pub phone_region: Option<String>,
    pub phone_verified: bool,
    pub synapse_user_id: Option<String>,
    pub health_code: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub attributes: Option<String>,
    pub password_hash: Option<String>,
    pub roles: Option<String>,
    pub data_groups: Option<String>,
    pub languages: Option<String>,
    pub status: String,
    pub time_zone: Option<String>,
    pub client_time_zone: Option<String>,
    pub note: Option<String>,
    pub created_on: i64,
    pub modified_on: i64,
    pub version: i64,
    pub consent_signature_histories: Option<String>,
}

stored_row! {
    AccountRow => accounts,
    key: String = [id],
    versioned: true,
    soft_delete: false,
}

/// Enrollments are written separately; accounts load without them.
impl Entity for Account {
    type Row = AccountRow;

    fn key(&self) -> String {
        self.id.clone()
    }

    fn to_row(&self) -> Result<AccountRow, PersistenceFailure> {
        Ok(AccountRow {
            id: self.id.clone(),
            app_id: self.app_id.clone(),
            org_membership: self.org_membership.clone(),
            email: self.email.clone(),
            email_verified: self.email_verified,
            phone_number: self.phone.as_ref().map(|p| p.number.clone()),
            phone_region: self.phone.as_ref().map(|p| p.region_code.clone()),
            phone_verified: self.phone_verified,
            synapse_user_id: self.synapse_user_id.clone(),
            health_code: self.health_code.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            attributes: StringMapAttributeConverter.to_column(Some(&self.attributes))?,
            password_hash: self.password_hash.clone(),
            roles: ROLES.to_column(Some(&self.roles))?,
            data_groups: STRINGS.to_column(Some(&self.data_groups))?,
            languages: LANGUAGES.to_column(Some(&self.languages))?,
            status: column_text(&self.status),
            time_zone: DateTimeZoneAttributeConverter.to_column(self.time_zone.as_ref())?,
            client_time_zone: self.client_time_zone.clone(),
            note: self.note.clone(),
            created_on: millis(&self.created_on),
            modified_on: millis(&self.modified_on),
            version: self.version,
            consent_signature_histories: HISTORIES
                .to_column(Some(&self.consent_signature_histories))?,
        })
    }

    fn from_row(row: AccountRow) -> Result<Self, PersistenceFailure> {
        let phone = match (row.phone_number, row.phone_region) {
            (Some(number), Some(region)) => Some(Phone::new(number, region)),
            _ => None,
        };
        Ok(Self {
            id: row.id,
            app_id: row.app_id,
            org_membership: row.org_membership,
            email: row.email,
            email_verified: row.email_verified,
            phone,
            phone_verified: row.phone_verified,
            synapse_user_id: row.synapse_user_id,
            health_code: row.health_code,
            first_name: row.first_name,
            last_name: row.last_name,
            attributes: StringMapAttributeConverter
                .to_attribute(row.attributes)?
                .unwrap_or_default(),
            password_hash: row.password_hash,
            roles: ROLES.to_attribute(row.roles)?.unwrap_or_default(),
            data_groups: STRINGS.to_attribute(row.data_groups)?.unwrap_or_default(),
            languages: LANGUAGES.to_attribute(row.languages)?.unwrap_or_default(),
            status: from_column_text(row.status)?,
            time_zone: DateTimeZoneAttributeConverter.to_attribute(row.time_zone)?,
            client_time_zone: row.client_time_zone,
            note: row.note,
            created_on: instant(row.created_on)?,
            modified_on: instant(row.modified_on)?,
            version: row.version,
            enrollments: Vec::new(),
            consent_signature_histories: HISTORIES
                .to_attribute(row.consent_signature_histories)?
                .unwrap_or_default(),
        })
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

/// Row of the `enrollments` table.
#[derive(
    Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = enrollments, check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct EnrollmentRow {
    pub app_id: String,
    pub study_id: String,
    pub account_id: String,
    pub external_id: Option<String>,
    pub enrolled_on: Option<i64>,
    pub enrolled_by: Option<String>,
    pub withdrawn_on: Option<i64>,
    pub withdrawn_by: Option<String>,
    pub withdrawal_note: Option<String>,
    pub consent_required: bool,
    pub note: Option<String>,
}

stored_row! {
    EnrollmentRow => enrollments,
    key: (String, String, String) = [app_id, study_id, account_id],
    versioned: false,
    soft_delete: false,
}

impl Entity for Enrollment {
    type Row = EnrollmentRow;

    fn key(&self) -> (String, String, String) {
        (
            self.app_id.clone(),
            self.study_id.clone(),
            self.account_id.clone(),
        )
    }

    fn to_row(&self) -> Result<EnrollmentRow, PersistenceFailure> {
        Ok(EnrollmentRow {
            app_id: self.app_id.clone(),
            study_id: self.study_id.clone(),
            account_id: self.account_id.clone(),
            external_id: self.external_id.clone(),
            enrolled_on: opt_millis(self.enrolled_on.as_ref()),
            enrolled_by: self.enrolled_by.clone(),
            withdrawn_on: opt_millis(self.withdrawn_on.as_ref()),
            withdrawn_by: self.withdrawn_by.clone(),
            withdrawal_note: self.withdrawal_note.clone(),
            consent_required: self.consent_required,
            note: self.note.clone(),
        })
    }

    fn from_row(row: EnrollmentRow) -> Result<Self, PersistenceFailure> {
        Ok(Self {
            app_id: row.app_id,
            study_id: row.study_id,
            account_id: row.account_id,
            external_id: row.external_id,
            enrolled_on: opt_instant(row.enrolled_on)?,
            enrolled_by: row.enrolled_by,
            withdrawn_on: opt_instant(row.withdrawn_on)?,
            withdrawn_by: row.withdrawn_by,
            withdrawal_note: row.withdrawal_note,
            consent_required: row.consent_required,
            note: row.note,
        })
    }
}

/// Account ids referenced by a set of enrollments, participants first.
pub(crate) fn referenced_account_ids(enrollments: &[Enrollment]) -> BTreeSet<String> {
    enrollments
        .iter()
        .flat_map(|e| {
            std::iter::once(e.account_id.clone())
                .chain(e.enrolled_by.clone())
                .chain(e.withdrawn_by.clone())
        })
        .collect()
}
