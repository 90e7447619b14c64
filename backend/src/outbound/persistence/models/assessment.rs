//! Assessment, assessment resource and assessment config rows.

use std::collections::BTreeSet;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::{
    Assessment, AssessmentConfig, AssessmentResource, ColorScheme, Label, PersistenceFailure,
    PropertyInfo,
};
use crate::outbound::persistence::converters::{
    AttributeConverter, JsonListAttributeConverter, JsonNodeAttributeConverter,
    JsonObjectAttributeConverter, JsonSetAttributeConverter, SetMapAttributeConverter,
};
use crate::outbound::persistence::entity::Entity;
use crate::outbound::persistence::schema::{assessment_configs, assessment_resources, assessments};

use super::{column_text, from_column_text, instant, millis};

const TAGS: JsonSetAttributeConverter<String> = JsonSetAttributeConverter::new();
const LABELS: JsonListAttributeConverter<Label> = JsonListAttributeConverter::new();
const COLORS: JsonObjectAttributeConverter<ColorScheme> = JsonObjectAttributeConverter::new();
const FIELDS: SetMapAttributeConverter<String, PropertyInfo> = SetMapAttributeConverter::new();
const NAMES: JsonListAttributeConverter<String> = JsonListAttributeConverter::new();

/// Row of the `assessments` table.
#[derive(
    Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = assessments, check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct AssessmentRow {
    pub guid: String,
    pub app_id: String,
    pub identifier: String,
    pub revision: i64,
    pub owner_id: String,
    pub title: String,
    pub summary: Option<String>,
    pub validation_status: Option<String>,
    pub normalization_status: Option<String>,
    pub os_name: String,
    pub original_guid: Option<String>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub minutes_to_complete: Option<i32>,
    pub tags: Option<String>,
    pub labels: Option<String>,
    pub color_scheme: Option<String>,
    pub customization_fields: Option<String>,
    pub created_on: i64,
    pub modified_on: i64,
    pub deleted: bool,
    pub version: i64,
}

stored_row! {
    AssessmentRow => assessments,
    key: String = [guid],
    versioned: true,
    soft_delete: true,
}

impl Entity for Assessment {
    type Row = AssessmentRow;

    fn key(&self) -> String {
        self.guid.clone()
    }

    fn to_row(&self) -> Result<AssessmentRow, PersistenceFailure> {
        Ok(AssessmentRow {
            guid: self.guid.clone(),
            app_id: self.app_id.clone(),
            identifier: self.identifier.clone(),
            revision: self.revision,
            owner_id: self.owner_id.clone(),
            title: self.title.clone(),
            summary: self.summary.clone(),
            validation_status: self.validation_status.clone(),
            normalization_status: self.normalization_status.clone(),
            os_name: self.os_name.clone(),
            original_guid: self.original_guid.clone(),
            min_age: self.min_age,
            max_age: self.max_age,
            minutes_to_complete: self.minutes_to_complete,
            tags: TAGS.to_column(Some(&self.tags))?,
            labels: LABELS.to_column(Some(&self.labels))?,
            color_scheme: COLORS.to_column(self.color_scheme.as_ref())?,
            customization_fields: FIELDS.to_column(Some(&self.customization_fields))?,
            created_on: millis(&self.created_on),
            modified_on: millis(&self.modified_on),
            deleted: self.deleted,
            version: self.version,
        })
    }

    fn from_row(row: AssessmentRow) -> Result<Self, PersistenceFailure> {
        Ok(Self {
            guid: row.guid,
            app_id: row.app_id,
            identifier: row.identifier,
            revision: row.revision,
            owner_id: row.owner_id,
            title: row.title,
            summary: row.summary,
            validation_status: row.validation_status,
            normalization_status: row.normalization_status,
            os_name: row.os_name,
            original_guid: row.original_guid,
            min_age: row.min_age,
            max_age: row.max_age,
            minutes_to_complete: row.minutes_to_complete,
            tags: TAGS.to_attribute(row.tags)?.unwrap_or_else(BTreeSet::new),
            labels: LABELS.to_attribute(row.labels)?.unwrap_or_default(),
            color_scheme: COLORS.to_attribute(row.color_scheme)?,
            customization_fields: FIELDS
                .to_attribute(row.customization_fields)?
                .unwrap_or_default(),
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

/// Row of the `assessment_resources` table.
#[derive(
    Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = assessment_resources, check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct AssessmentResourceRow {
    pub guid: String,
    pub app_id: String,
    pub assessment_id: String,
    pub title: String,
    pub category: String,
    pub url: String,
    pub format: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub contributors: Option<String>,
    pub creators: Option<String>,
    pub publishers: Option<String>,
    pub language: Option<String>,
    pub min_revision: Option<i64>,
    pub max_revision: Option<i64>,
    pub created_at_revision: i64,
    pub created_on: i64,
    pub modified_on: i64,
    pub deleted: bool,
    pub version: i64,
}

stored_row! {
    AssessmentResourceRow => assessment_resources,
    key: String = [guid],
    versioned: true,
    soft_delete: true,
}

impl Entity for AssessmentResource {
    type Row = AssessmentResourceRow;

    fn key(&self) -> String {
        self.guid.clone()
    }

    fn to_row(&self) -> Result<AssessmentResourceRow, PersistenceFailure> {
        Ok(AssessmentResourceRow {
            guid: self.guid.clone(),
            app_id: self.app_id.clone(),
            assessment_id: self.assessment_id.clone(),
            title: self.title.clone(),
            category: column_text(&self.category),
            url: self.url.clone(),
            format: self.format.clone(),
            date: self.date.clone(),
            description: self.description.clone(),
            contributors: NAMES.to_column(Some(&self.contributors))?,
            creators: NAMES.to_column(Some(&self.creators))?,
            publishers: NAMES.to_column(Some(&self.publishers))?,
            language: self.language.clone(),
            min_revision: self.min_revision,
            max_revision: self.max_revision,
            created_at_revision: self.created_at_revision,
            created_on: millis(&self.created_on),
            modified_on: millis(&self.modified_on),
            deleted: self.deleted,
            version: self.version,
        })
    }

    fn from_row(row: AssessmentResourceRow) -> Result<Self, PersistenceFailure> {
        Ok(Self {
            guid: row.guid,
            app_id: row.app_id,
            assessment_id: row.assessment_id,
            title: row.title,
            category: from_column_text(row.category)?,
            url: row.url,
            format: row.format,
            date: row.date,
            description: row.description,
            contributors: NAMES.to_attribute(row.contributors)?.unwrap_or_default(),
            creators: NAMES.to_attribute(row.creators)?.unwrap_or_default(),
            publishers: NAMES.to_attribute(row.publishers)?.unwrap_or_default(),
            language: row.language,
            min_revision: row.min_revision,
            max_revision: row.max_revision,
            created_at_revision: row.created_at_revision,
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

/// Row of the `assessment_configs` table.
#[derive(
    Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = assessment_configs, check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct AssessmentConfigRow {
    pub guid: String,
    pub config: Option<String>,
    pub created_on: i64,
    pub modified_on: i64,
    pub version: i64,
}

stored_row! {
    AssessmentConfigRow => assessment_configs,
    key: String = [guid],
    versioned: true,
    soft_delete: false,
}

impl Entity for AssessmentConfig {
    type Row = AssessmentConfigRow;

    fn key(&self) -> String {
        self.guid.clone()
    }

    fn to_row(&self) -> Result<AssessmentConfigRow, PersistenceFailure> {
        Ok(AssessmentConfigRow {
            guid: self.guid.clone(),
            config: JsonNodeAttributeConverter.to_column(Some(&self.config))?,
            created_on: millis(&self.created_on),
            modified_on: millis(&self.modified_on),
            version: self.version,
        })
    }

    fn from_row(row: AssessmentConfigRow) -> Result<Self, PersistenceFailure> {
        Ok(Self {
            guid: row.guid,
            config: JsonNodeAttributeConverter
                .to_attribute(row.config)?
                .unwrap_or_default(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::domain::ResourceCategory;

    use rstest::rstest;

    #[rstest]
    fn customization_fields_are_stored_as_a_set_map() {
        let assessment = Assessment {
            guid: "a1".into(),
            customization_fields: BTreeMap::from([(
                "node".to_owned(),
                BTreeSet::from([PropertyInfo {
                    prop_name: "title".into(),
                    label: None,
                    description: None,
                    prop_type: None,
                }]),
            )]),
            labels: vec![Label::new("en", "Walk")],
            ..Assessment::default()
        };

        let row = assessment.to_row().expect("row builds");

        assert_eq!(
            row.customization_fields.as_deref(),
            Some(r#"{"node":[{"propName":"title"}]}"#)
        );
        assert_eq!(Assessment::from_row(row).expect("maps"), assessment);
    }

    #[rstest]
    fn null_configs_load_as_json_null() {
        let row = AssessmentConfigRow {
            guid: "a1".into(),
            config: None,
            created_on: 0,
            modified_on: 0,
            version: 1,
        };
        let config = AssessmentConfig::from_row(row).expect("maps");
        assert!(config.config.is_null());
    }

    #[rstest]
    fn resource_categories_are_stored_as_text() {
        let row = AssessmentResourceRow {
            guid: "r1".into(),
            app_id: "api".into(),
            assessment_id: "walk".into(),
            title: "Protocol".into(),
            category: "science_documentation".into(),
            url: "https://example.org/walk".into(),
            format: None,
            date: None,
            description: None,
            contributors: Some(r#"["Ada"]"#.into()),
            creators: Some("[]".into()),
            publishers: Some("[]".into()),
            language: None,
            min_revision: Some(2),
            max_revision: None,
            created_at_revision: 2,
            created_on: 0,
            modified_on: 0,
            deleted: false,
            version: 1,
        };

        let resource = AssessmentResource::from_row(row.clone()).expect("maps");

        assert_eq!(resource.category, ResourceCategory::ScienceDocumentation);
        assert_eq!(resource.contributors, vec!["Ada".to_owned()]);
        assert_eq!(resource.to_row().expect("row builds"), row);
    }

    #[rstest]
    fn unknown_resource_categories_fail_the_load() {
        let row = AssessmentResourceRow {
            category: "brochure".into(),
            ..AssessmentResource {
                guid: "r1".into(),
                app_id: "api".into(),
                assessment_id: "walk".into(),
                title: "Protocol".into(),
                category: ResourceCategory::License,
                url: "https://example.org/walk".into(),
                format: None,
                date: None,
                description: None,
                contributors: Vec::new(),
                creators: Vec::new(),
                publishers: Vec::new(),
                language: None,
                min_revision: None,
                max_revision: None,
                created_at_revision: 1,
                created_on: chrono::DateTime::default(),
                modified_on: chrono::DateTime::default(),
                deleted: false,
                version: 0,
            }
            .to_row()
            .expect("row builds")
        };

        let failure = AssessmentResource::from_row(row).expect_err("unknown category");
        assert_eq!(failure.kind(), crate::domain::FailureKind::MalformedData);
    }
}
