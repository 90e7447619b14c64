//! Study alerts raised for coordinators.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::BridgeTypeName;

/// Why an alert was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    /// A participant enrolled.
    NewEnrollment,
    /// A participant opened their timeline.
    TimelineAccessed,
    /// Adherence dropped below the study threshold.
    LowAdherence,
    /// A study burst is about to start.
    UpcomingStudyBurst,
    /// A study burst schedule changed.
    StudyBurstChange,
}

impl AlertCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::NewEnrollment,
        Self::TimelineAccessed,
        Self::LowAdherence,
        Self::UpcomingStudyBurst,
        Self::StudyBurstChange,
    ];

    /// Column representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewEnrollment => "new_enrollment",
            Self::TimelineAccessed => "timeline_accessed",
            Self::LowAdherence => "low_adherence",
            Self::UpcomingStudyBurst => "upcoming_study_burst",
            Self::StudyBurstChange => "study_burst_change",
        }
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown alert category text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown alert category: {0}")]
pub struct UnknownAlertCategory(pub String);

impl FromStr for AlertCategory {
    type Err = UnknownAlertCategory;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == text)
            .ok_or_else(|| UnknownAlertCategory(text.to_owned()))
    }
}

/// An alert about a participant in a study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "Alert")]
pub struct Alert {
    /// Alert id.
    pub id: String,
    /// When the alert was raised.
    pub created_on: DateTime<Utc>,
    /// Owning app.
    pub app_id: String,
    /// Study the alert concerns.
    pub study_id: String,
    /// Participant the alert concerns.
    pub user_id: String,
    /// Alert category.
    pub category: AlertCategory,
    /// Category-specific payload.
    pub data: Value,
    /// Whether a coordinator has read the alert.
    pub read: bool,
}

impl BridgeTypeName for Alert {
    const TYPE_NAME: &'static str = "Alert";
}

impl Alert {
    /// Raise a new unread alert with a fresh id.
    pub fn new(
        app_id: impl Into<String>,
        study_id: impl Into<String>,
        user_id: impl Into<String>,
        category: AlertCategory,
        data: Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_on: Utc::now(),
            app_id: app_id.into(),
            study_id: study_id.into(),
            user_id: user_id.into(),
            category,
            data,
            read: false,
        }
    }
}

/// Categories an alert listing is restricted to. Empty means all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertFilter {
    /// Categories to include.
    pub alert_categories: BTreeSet<AlertCategory>,
}

/// Number of alerts in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertCategoryAndCount {
    /// Category.
    pub category: AlertCategory,
    /// Alerts in the category.
    pub count: u64,
}

/// Per-category alert counts for a study.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "AlertCategoriesAndCounts")]
pub struct AlertCategoriesAndCounts {
    /// Counts, one entry per category with at least one alert.
    pub alert_categories_and_counts: Vec<AlertCategoryAndCount>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn categories_parse_from_column_text() {
        for category in AlertCategory::ALL {
            assert_eq!(category.as_str().parse::<AlertCategory>(), Ok(category));
        }
        assert!("unknown".parse::<AlertCategory>().is_err());
    }

    #[rstest]
    fn column_text_matches_json() {
        let json = serde_json::to_value(AlertCategory::UpcomingStudyBurst).expect("serializable");
        assert_eq!(json, AlertCategory::UpcomingStudyBurst.as_str());
    }

    #[rstest]
    fn new_alerts_are_unread() {
        let alert = Alert::new(
            "api",
            "study",
            "user",
            AlertCategory::NewEnrollment,
            Value::Null,
        );
        assert!(!alert.read);
        assert!(!alert.id.is_empty());
    }
}
