//! Alert rows.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::{Alert, PersistenceFailure};
use crate::outbound::persistence::converters::{AttributeConverter, JsonNodeAttributeConverter};
use crate::outbound::persistence::entity::Entity;
use crate::outbound::persistence::schema::alerts;

use super::{column_text, from_column_text, instant, millis};

/// Row of the `alerts` table.
#[derive(
    Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = alerts, check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct AlertRow {
    pub id: String,
    pub created_on: i64,
    pub app_id: String,
    pub study_id: String,
    pub user_id: String,
    pub category: String,
    pub data: Option<String>,
    pub read: bool,
}

stored_row! {
    AlertRow => alerts,
    key: String = [id],
    versioned: false,
    soft_delete: false,
}

impl Entity for Alert {
    type Row = AlertRow;

    fn key(&self) -> String {
        self.id.clone()
    }

    fn to_row(&self) -> Result<AlertRow, PersistenceFailure> {
        Ok(AlertRow {
            id: self.id.clone(),
            created_on: millis(&self.created_on),
            app_id: self.app_id.clone(),
            study_id: self.study_id.clone(),
            user_id: self.user_id.clone(),
            category: column_text(&self.category),
            data: JsonNodeAttributeConverter.to_column(Some(&self.data))?,
            read: self.read,
        })
    }

    fn from_row(row: AlertRow) -> Result<Self, PersistenceFailure> {
        Ok(Self {
            id: row.id,
            created_on: instant(row.created_on)?,
            app_id: row.app_id,
            study_id: row.study_id,
            user_id: row.user_id,
            category: from_column_text(row.category)?,
            data: JsonNodeAttributeConverter
                .to_attribute(row.data)?
                .unwrap_or_default(),
            read: row.read,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AlertCategory;
    use chrono::DateTime;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn alerts_survive_the_row_mapping() {
        let mut alert = Alert::new(
            "api",
            "study-a",
            "user-1",
            AlertCategory::LowAdherence,
            json!({"adherence": 40}),
        );
        alert.created_on = DateTime::from_timestamp_millis(1_700_000_000_000).expect("valid");

        let row = alert.to_row().expect("row builds");

        assert_eq!(row.category, "low_adherence");
        assert_eq!(row.data.as_deref(), Some(r#"{"adherence":40}"#));
        assert_eq!(Alert::from_row(row).expect("maps"), alert);
    }
}
