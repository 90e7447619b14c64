//! Self-reported demographics.
//!
//! A [`DemographicUser`] owns one [`Demographic`] per category. The
//! collection is plain data: the demographic DAO replaces stored rows with
//! explicit deletes and inserts when a user is saved.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entity::BridgeTypeName;

/// One reported value, with the reason it failed validation if it did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicValue {
    /// Reported value as text.
    pub value: String,
    /// Validation failure message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidity: Option<String>,
}

impl DemographicValue {
    /// Wrap a reported value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            invalidity: None,
        }
    }
}

/// Values reported for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "Demographic")]
pub struct Demographic {
    /// Demographic id.
    pub id: String,
    /// Owning demographic user id.
    pub demographic_user_id: String,
    /// Category such as `ethnicity`.
    pub category_name: String,
    /// Whether several values may be chosen.
    pub multiple_select: bool,
    /// Reported values.
    pub values: Vec<DemographicValue>,
    /// Units for numeric values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

impl BridgeTypeName for Demographic {
    const TYPE_NAME: &'static str = "Demographic";
}

/// A user's demographics in one study, or app-wide when `study_id` is
/// `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "DemographicUser")]
pub struct DemographicUser {
    /// Demographic user id.
    pub id: String,
    /// Owning app.
    pub app_id: String,
    /// Study scope; app-level when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_id: Option<String>,
    /// Account the values belong to.
    pub user_id: String,
    /// Demographics keyed by category name.
    pub demographics: BTreeMap<String, Demographic>,
}

impl BridgeTypeName for DemographicUser {
    const TYPE_NAME: &'static str = "DemographicUser";
}

impl DemographicUser {
    /// Add a demographic, pointing it at this user and replacing any
    /// demographic already held for the category.
    pub fn put(&mut self, mut demographic: Demographic) {
        demographic.demographic_user_id = self.id.clone();
        self.demographics
            .insert(demographic.category_name.clone(), demographic);
    }
}
