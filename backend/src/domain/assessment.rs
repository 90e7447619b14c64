//! Shared assessments, their documentation resources and their
//! configuration documents.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::BridgeTypeName;
use super::study::ColorScheme;

/// Localized label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    /// Language code.
    pub lang: String,
    /// Label text.
    pub value: String,
}

impl Label {
    /// Create a label.
    pub fn new(lang: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            value: value.into(),
        }
    }
}

/// Describes one customizable property of an assessment's configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyInfo {
    /// Property name.
    pub prop_name: String,
    /// Display label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Help text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Value type hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prop_type: Option<String>,
}

/// A versioned, revisioned assessment definition.
///
/// `(app_id, identifier, revision)` is unique; `guid` identifies one
/// revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "Assessment")]
pub struct Assessment {
    /// Revision guid.
    pub guid: String,
    /// Owning app.
    pub app_id: String,
    /// Identifier shared by every revision.
    pub identifier: String,
    /// Revision number.
    pub revision: i64,
    /// Owning organization.
    pub owner_id: String,
    /// Display title.
    pub title: String,
    /// Summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Validation state description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_status: Option<String>,
    /// Normalization state description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalization_status: Option<String>,
    /// Target operating system.
    pub os_name: String,
    /// Guid of the shared assessment this was imported from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_guid: Option<String>,
    /// Minimum participant age.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_age: Option<i32>,
    /// Maximum participant age.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i32>,
    /// Estimated completion time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_to_complete: Option<i32>,
    /// Search tags.
    pub tags: BTreeSet<String>,
    /// Localized labels.
    pub labels: Vec<Label>,
    /// Branding colors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_scheme: Option<ColorScheme>,
    /// Customizable properties keyed by configuration node guid.
    pub customization_fields: BTreeMap<String, BTreeSet<PropertyInfo>>,
    /// Creation time.
    pub created_on: DateTime<Utc>,
    /// Last modification time.
    pub modified_on: DateTime<Utc>,
    /// Soft-delete flag.
    pub deleted: bool,
    /// Optimistic-lock version.
    pub version: i64,
}

impl BridgeTypeName for Assessment {
    const TYPE_NAME: &'static str = "Assessment";
}

/// Kind of documentation a resource points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    /// Customization guidance.
    CustomizationOptions,
    /// Data repository.
    DataRepository,
    /// Scientific documentation.
    ScienceDocumentation,
    /// Developer documentation.
    DeveloperDocumentation,
    /// License.
    License,
    /// Publication.
    Publication,
    /// Release notes.
    Release,
    /// Sample data.
    Sample,
    /// Screenshot.
    Screenshot,
    /// Related material.
    SeeAlso,
    /// Study that used the assessment.
    UsedIn,
    /// Website.
    Website,
    /// Anything else.
    Other,
}

/// External documentation attached to an assessment identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "AssessmentResource")]
pub struct AssessmentResource {
    /// Resource guid.
    pub guid: String,
    /// Owning app.
    pub app_id: String,
    /// Identifier of the assessment the resource documents.
    pub assessment_id: String,
    /// Title.
    pub title: String,
    /// Category.
    pub category: ResourceCategory,
    /// Location.
    pub url: String,
    /// MIME type or format name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Publication date as text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Contributors.
    pub contributors: Vec<String>,
    /// Creators.
    pub creators: Vec<String>,
    /// Publishers.
    pub publishers: Vec<String>,
    /// Language code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// First assessment revision the resource applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_revision: Option<i64>,
    /// Last assessment revision the resource applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_revision: Option<i64>,
    /// Assessment revision current when the resource was written.
    pub created_at_revision: i64,
    /// Creation time.
    pub created_on: DateTime<Utc>,
    /// Last modification time.
    pub modified_on: DateTime<Utc>,
    /// Soft-delete flag.
    pub deleted: bool,
    /// Optimistic-lock version.
    pub version: i64,
}

impl BridgeTypeName for AssessmentResource {
    const TYPE_NAME: &'static str = "AssessmentResource";
}

impl AssessmentResource {
    /// Whether the resource applies to the given assessment revision.
    pub fn covers_revision(&self, revision: i64) -> bool {
        self.min_revision.is_none_or(|min| revision >= min)
            && self.max_revision.is_none_or(|max| revision <= max)
    }
}

/// Configuration document of one assessment revision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "AssessmentConfig")]
pub struct AssessmentConfig {
    /// Guid of the assessment revision.
    pub guid: String,
    /// Configuration tree.
    pub config: Value,
    /// Creation time.
    pub created_on: DateTime<Utc>,
    /// Last modification time.
    pub modified_on: DateTime<Utc>,
    /// Optimistic-lock version.
    pub version: i64,
}

impl BridgeTypeName for AssessmentConfig {
    const TYPE_NAME: &'static str = "AssessmentConfig";
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn resource(min: Option<i64>, max: Option<i64>) -> AssessmentResource {
        AssessmentResource {
            guid: "r".into(),
            app_id: "api".into(),
            assessment_id: "a".into(),
            title: "t".into(),
            category: ResourceCategory::License,
            url: "https://example.org".into(),
            format: None,
            date: None,
            description: None,
            contributors: Vec::new(),
            creators: Vec::new(),
            publishers: Vec::new(),
            language: None,
            min_revision: min,
            max_revision: max,
            created_at_revision: 1,
            created_on: DateTime::<Utc>::default(),
            modified_on: DateTime::<Utc>::default(),
            deleted: false,
            version: 0,
        }
    }

    #[rstest]
    #[case(None, None, 7, true)]
    #[case(Some(2), None, 1, false)]
    #[case(Some(2), Some(4), 4, true)]
    #[case(None, Some(4), 5, false)]
    fn revision_bounds_are_inclusive(
        #[case] min: Option<i64>,
        #[case] max: Option<i64>,
        #[case] revision: i64,
        #[case] expected: bool,
    ) {
        assert_eq!(resource(min, max).covers_revision(revision), expected);
    }
}
