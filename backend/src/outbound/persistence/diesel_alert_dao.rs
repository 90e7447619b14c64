//! PostgreSQL-backed `AlertDao` implementation.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::QueryableByName;
use diesel::sql_types::{BigInt, Text};
use pagination::{PageRequest, PagedResourceList};

use crate::domain::ports::AlertDao;
use crate::domain::{
    Alert, AlertCategoriesAndCounts, AlertCategory, AlertCategoryAndCount, AlertFilter,
    BridgeError, PersistenceFailure,
};

use super::exceptions::BasicPersistenceExceptionConverter;
use super::helper::PersistenceHelper;
use super::models::from_column_text;
use super::pg_session::PgSessionFactory;
use super::query_builder::QueryBuilder;
use super::session::SessionFactory;
use super::statement::{Params, SqlValue};

const STUDY_SCOPE: &str = "app_id = :appId AND study_id = :studyId";

#[derive(Debug, QueryableByName)]
struct CategoryCountRow {
    #[diesel(sql_type = Text)]
    category: String,
    #[diesel(sql_type = BigInt)]
    count: i64,
}

fn study_params(app_id: &str, study_id: &str) -> Params {
    Params::from([
        ("appId".to_owned(), SqlValue::from(app_id)),
        ("studyId".to_owned(), SqlValue::from(study_id)),
    ])
}

fn alerts_query(app_id: &str, study_id: &str, filter: &AlertFilter) -> QueryBuilder {
    let mut builder = QueryBuilder::new();
    builder.append_params(
        format!("SELECT * FROM alerts WHERE {STUDY_SCOPE}"),
        [("appId", app_id), ("studyId", study_id)],
    );
    if !filter.alert_categories.is_empty() {
        let categories: Vec<String> = filter
            .alert_categories
            .iter()
            .map(|category| category.as_str().to_owned())
            .collect();
        builder.append_param("AND category = ANY(:categories)", "categories", categories);
    }
    builder.append("ORDER BY created_on DESC, id");
    builder
}

/// Diesel-backed implementation of the `AlertDao` port.
#[derive(Clone)]
pub struct DieselAlertDao<S = PgSessionFactory> {
    helper: PersistenceHelper<S>,
}

impl<S: SessionFactory> DieselAlertDao<S> {
    /// Create a DAO over the given sessions.
    pub fn new(sessions: Arc<S>) -> Self {
        Self {
            helper: PersistenceHelper::new(sessions, Arc::new(BasicPersistenceExceptionConverter)),
        }
    }

    async fn delete_where(&self, condition: &str, params: Params) -> Result<(), BridgeError> {
        self.helper
            .query_update::<Alert>(&format!("DELETE FROM alerts WHERE {condition}"), params)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl<S: SessionFactory> AlertDao for DieselAlertDao<S> {
    async fn create_alert(&self, alert: Alert) -> Result<Alert, BridgeError> {
        self.helper.create(alert).await
    }

    async fn delete_alerts(
        &self,
        app_id: &str,
        study_id: &str,
        alert_ids: &[String],
    ) -> Result<(), BridgeError> {
        if alert_ids.is_empty() {
            return Ok(());
        }
        let mut params = study_params(app_id, study_id);
        params.insert("alertIds".to_owned(), SqlValue::from(alert_ids.to_vec()));
        self.delete_where(&format!("{STUDY_SCOPE} AND id = ANY(:alertIds)"), params)
            .await
    }

    async fn get_alerts(
        &self,
        app_id: &str,
        study_id: &str,
        page: PageRequest,
        filter: &AlertFilter,
    ) -> Result<PagedResourceList<Alert>, BridgeError> {
        let builder = alerts_query(app_id, study_id, filter);
        Ok(self
            .helper
            .query_page::<Alert>(&builder.query(), builder.parameters().clone(), page)
            .await?
            .with_request_param("alertCategories", &filter.alert_categories))
    }

    async fn get_alert(
        &self,
        app_id: &str,
        study_id: &str,
        user_id: &str,
        category: AlertCategory,
    ) -> Result<Option<Alert>, BridgeError> {
        let mut params = study_params(app_id, study_id);
        params.insert("userId".to_owned(), SqlValue::from(user_id));
        params.insert("category".to_owned(), SqlValue::from(category.as_str()));
        let alerts = self
            .helper
            .query_get::<Alert>(
                &format!(
                    "SELECT * FROM alerts WHERE {STUDY_SCOPE} AND user_id = :userId \
                     AND category = :category ORDER BY created_on DESC"
                ),
                params,
                None,
                Some(1),
            )
            .await?;
        Ok(alerts.into_iter().next())
    }

    async fn get_alert_by_id(&self, alert_id: &str) -> Result<Option<Alert>, BridgeError> {
        self.helper.get_by_id::<Alert>(alert_id.to_owned()).await
    }

    async fn get_alert_categories_and_counts(
        &self,
        app_id: &str,
        study_id: &str,
    ) -> Result<AlertCategoriesAndCounts, BridgeError> {
        let rows: Vec<CategoryCountRow> = self
            .helper
            .native_query_get(
                &format!(
                    "SELECT category, COUNT(*) AS count FROM alerts \
                     WHERE {STUDY_SCOPE} GROUP BY category"
                ),
                study_params(app_id, study_id),
                None,
                None,
            )
            .await?;
        let mut counts = rows
            .into_iter()
            .map(|row| {
                Ok(AlertCategoryAndCount {
                    category: from_column_text(row.category)?,
                    count: u64::try_from(row.count).unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, PersistenceFailure>>()
            .map_err(BridgeError::persistence)?;
        counts.sort_by_key(|entry| entry.category);
        Ok(AlertCategoriesAndCounts {
            alert_categories_and_counts: counts,
        })
    }

    async fn set_alerts_read_state(
        &self,
        app_id: &str,
        study_id: &str,
        alert_ids: &[String],
        read: bool,
    ) -> Result<(), BridgeError> {
        if alert_ids.is_empty() {
            return Ok(());
        }
        let mut params = study_params(app_id, study_id);
        params.insert("alertIds".to_owned(), SqlValue::from(alert_ids.to_vec()));
        params.insert("read".to_owned(), SqlValue::from(read));
        self.helper
            .query_update::<Alert>(
                &format!(
                    "UPDATE alerts SET read = :read WHERE {STUDY_SCOPE} AND id = ANY(:alertIds)"
                ),
                params,
            )
            .await
            .map(|_| ())
    }

    async fn delete_alerts_for_study(
        &self,
        app_id: &str,
        study_id: &str,
    ) -> Result<(), BridgeError> {
        self.delete_where(STUDY_SCOPE, study_params(app_id, study_id))
            .await
    }

    async fn delete_alerts_for_user_in_app(
        &self,
        app_id: &str,
        user_id: &str,
    ) -> Result<(), BridgeError> {
        let params = Params::from([
            ("appId".to_owned(), SqlValue::from(app_id)),
            ("userId".to_owned(), SqlValue::from(user_id)),
        ]);
        self.delete_where("app_id = :appId AND user_id = :userId", params)
            .await
    }

    async fn delete_alerts_for_user_in_study(
        &self,
        app_id: &str,
        study_id: &str,
        user_id: &str,
    ) -> Result<(), BridgeError> {
        let mut params = study_params(app_id, study_id);
        params.insert("userId".to_owned(), SqlValue::from(user_id));
        self.delete_where(&format!("{STUDY_SCOPE} AND user_id = :userId"), params)
            .await
    }
}
