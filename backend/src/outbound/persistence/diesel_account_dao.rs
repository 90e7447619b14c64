//! PostgreSQL-backed `AccountDao` and `AccountLookup`.
//!
//! Accounts and their enrollments live in separate tables. Reads load both
//! in one unit of work; writes replace the enrollment rows alongside the
//! versioned account row, so a stale version leaves both untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use diesel::QueryableByName;
use diesel::sql_types::Text;
use diesel_async::scoped_futures::ScopedFutureExt;
use pagination::PagedResourceList;
use tracing::debug;

use crate::domain::ports::{AccountDao, AccountLookup};
use crate::domain::{
    Account, AccountId, AccountSummary, AccountSummarySearch, BridgeError, Enrollment,
    NO_ORGANIZATION, PersistenceFailure, RequestContext, StudyScope,
};

use super::entity;
use super::exceptions::{AccountPersistenceExceptionConverter, BasicPersistenceExceptionConverter};
use super::helper::PersistenceHelper;
use super::pg_session::PgSessionFactory;
use super::models::column_text;
use super::query_builder::{DataGroupOperator, QueryBuilder};
use super::session::{Session, SessionFactory};
use super::statement::{Params, SqlValue, Statement};

const ENROLLMENTS_FOR_ACCOUNT: &str =
    "SELECT * FROM enrollments WHERE account_id = :accountId ORDER BY enrolled_on, study_id";
const ENROLLMENTS_FOR_ACCOUNTS: &str =
    "SELECT * FROM enrollments WHERE account_id = ANY(:accountIds) ORDER BY enrolled_on, study_id";
const DELETE_ENROLLMENTS: &str = "DELETE FROM enrollments WHERE account_id = :accountId";
const DELETE_ACCOUNT: &str = "DELETE FROM accounts WHERE app_id = :appId AND id = :id";
const APP_IDS_FOR_USER: &str =
    "SELECT DISTINCT app_id FROM accounts WHERE synapse_user_id = :synapseUserId ORDER BY app_id";

/// Account query for each way an account can be identified.
fn account_query(account_id: &AccountId) -> Statement {
    match account_id {
        AccountId::Id { app_id, id } => {
            Statement::new("SELECT * FROM accounts WHERE app_id = :appId AND id = :id")
                .bind("appId", app_id)
                .bind("id", id)
        }
        AccountId::Email { app_id, email } => {
            Statement::new("SELECT * FROM accounts WHERE app_id = :appId AND email = :email")
                .bind("appId", app_id)
                .bind("email", email)
        }
        AccountId::Phone { app_id, phone } => Statement::new(
            "SELECT * FROM accounts WHERE app_id = :appId \
             AND phone_number = :number AND phone_region = :region",
        )
        .bind("appId", app_id)
        .bind("number", &phone.number)
        .bind("region", &phone.region_code),
        AccountId::ExternalId {
            app_id,
            external_id,
        } => Statement::new(
            "SELECT acct.* FROM accounts acct JOIN enrollments en ON en.account_id = acct.id \
             WHERE acct.app_id = :appId AND en.external_id = :externalId \
             ORDER BY en.enrolled_on LIMIT 1",
        )
        .bind("appId", app_id)
        .bind("externalId", external_id),
        AccountId::SynapseUserId {
            app_id,
            synapse_user_id,
        } => Statement::new(
            "SELECT * FROM accounts WHERE app_id = :appId AND synapse_user_id = :synapseUserId",
        )
        .bind("appId", app_id)
        .bind("synapseUserId", synapse_user_id),
        AccountId::HealthCode {
            app_id,
            health_code,
        } => Statement::new(
            "SELECT * FROM accounts WHERE app_id = :appId AND health_code = :healthCode",
        )
        .bind("appId", app_id)
        .bind("healthCode", health_code),
    }
}

async fn load_account<S: Session>(
    session: &mut S,
    statement: &Statement,
) -> Result<Option<Account>, PersistenceFailure> {
    let Some(mut account) = entity::query::<Account, _>(session, statement)
        .await?
        .into_iter()
        .next()
    else {
        return Ok(None);
    };
    let enrollments = Statement::new(ENROLLMENTS_FOR_ACCOUNT).bind("accountId", &account.id);
    account.enrollments = entity::query::<Enrollment, _>(session, &enrollments).await?;
    Ok(Some(account))
}

async fn insert_enrollments<S: Session>(
    session: &mut S,
    account: &Account,
) -> Result<(), PersistenceFailure> {
    for enrollment in &account.enrollments {
        entity::insert(session, enrollment).await?;
    }
    Ok(())
}

/// `'%term%'` for substring filters.
fn contains(term: &str) -> String {
    format!("%{term}%")
}

fn summary_query(
    scope: &StudyScope,
    app_id: &str,
    search: &AccountSummarySearch,
) -> QueryBuilder {
    let mut builder = QueryBuilder::new();
    builder.append_param(
        "SELECT acct.* FROM accounts acct WHERE acct.app_id = :appId",
        "appId",
        app_id,
    );
    if let Some(email) = &search.email_filter {
        builder.append_param("AND acct.email ILIKE :email", "email", contains(email));
    }
    if let Some(phone) = &search.phone_filter {
        builder.append_param("AND acct.phone_number LIKE :number", "number", contains(phone));
    }
    if let Some(external_id) = &search.external_id_filter {
        builder.append_param(
            "AND EXISTS (SELECT 1 FROM enrollments en WHERE en.account_id = acct.id \
             AND en.external_id ILIKE :externalId)",
            "externalId",
            contains(external_id),
        );
    }
    match search.org_membership.as_deref() {
        Some(NO_ORGANIZATION) => {
            builder.append("AND acct.org_membership IS NULL");
        }
        Some(org_id) => {
            builder.append_param("AND acct.org_membership = :orgId", "orgId", org_id);
        }
        None => {}
    }
    match search.admin_only {
        Some(true) => {
            builder.append("AND jsonb_array_length(COALESCE(acct.roles, '[]')::jsonb) > 0");
        }
        Some(false) => {
            builder.append("AND jsonb_array_length(COALESCE(acct.roles, '[]')::jsonb) = 0");
        }
        None => {}
    }
    if let Some(study_id) = &search.enrolled_in_study {
        builder.append_param(
            "AND EXISTS (SELECT 1 FROM enrollments en WHERE en.account_id = acct.id \
             AND en.study_id = :enrolledInStudyId)",
            "enrolledInStudyId",
            study_id,
        );
    }
    if let Some(status) = &search.status {
        builder.append_param("AND acct.status = :status", "status", column_text(status));
    }
    if let Some(language) = &search.language {
        builder.append_param(
            "AND :language IN (SELECT jsonb_array_elements_text(acct.languages::jsonb))",
            "language",
            language,
        );
    }
    builder.data_groups(&search.all_of_groups, DataGroupOperator::In);
    builder.data_groups(&search.none_of_groups, DataGroupOperator::NotIn);
    if let Some(start) = search.start_time {
        builder.append_param("AND acct.created_on >= :startTime", "startTime", start);
    }
    if let Some(end) = search.end_time {
        builder.append_param("AND acct.created_on <= :endTime", "endTime", end);
    }
    if let Some(study_ids) = scope.study_ids() {
        builder.append_param(
            "AND EXISTS (SELECT 1 FROM enrollments en WHERE en.account_id = acct.id \
             AND en.study_id = ANY(:callerStudyIds))",
            "callerStudyIds",
            study_ids,
        );
    }
    builder.append("ORDER BY acct.created_on DESC");
    builder
}

#[derive(Debug, QueryableByName)]
struct AppIdRow {
    #[diesel(sql_type = Text)]
    app_id: String,
}

/// Finds accounts by any [`AccountId`], with their enrollments.
pub struct DieselAccountLookup<S = PgSessionFactory> {
    helper: PersistenceHelper<S>,
}

impl<S> Clone for DieselAccountLookup<S> {
    fn clone(&self) -> Self {
        Self {
            helper: self.helper.clone(),
        }
    }
}

impl<S: SessionFactory> DieselAccountLookup<S> {
    /// Create a lookup over the given sessions.
    pub fn new(sessions: Arc<S>) -> Self {
        Self {
            helper: PersistenceHelper::new(
                sessions,
                Arc::new(BasicPersistenceExceptionConverter),
            ),
        }
    }
}

#[async_trait]
impl<S: SessionFactory> AccountLookup for DieselAccountLookup<S> {
    async fn find_account(&self, account_id: &AccountId) -> Result<Option<Account>, BridgeError> {
        let statement = account_query(account_id);
        self.helper
            .execute_with_session(None, move |session| {
                async move { load_account(session, &statement).await }.scope_boxed()
            })
            .await
    }
}

/// Diesel-backed implementation of the `AccountDao` port.
///
/// Constraint violations are translated by the account converter, which
/// uses this DAO's lookup to name the account already holding a value.
#[derive(Clone)]
pub struct DieselAccountDao<S = PgSessionFactory> {
    helper: PersistenceHelper<S>,
    lookup: DieselAccountLookup<S>,
}

impl<S: SessionFactory> DieselAccountDao<S> {
    /// Create a DAO over the given sessions.
    pub fn new(sessions: Arc<S>) -> Self {
        let lookup = DieselAccountLookup::new(Arc::clone(&sessions));
        let converter = AccountPersistenceExceptionConverter::new(Arc::new(lookup.clone()));
        Self {
            helper: PersistenceHelper::new(sessions, Arc::new(converter)),
            lookup,
        }
    }

    async fn enrollments_by_account(
        &self,
        account_ids: Vec<String>,
    ) -> Result<BTreeMap<String, Vec<Enrollment>>, BridgeError> {
        if account_ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let params = Params::from([("accountIds".to_owned(), SqlValue::from(account_ids))]);
        let enrollments = self
            .helper
            .query_get::<Enrollment>(ENROLLMENTS_FOR_ACCOUNTS, params, None, None)
            .await?;
        let mut grouped: BTreeMap<String, Vec<Enrollment>> = BTreeMap::new();
        for enrollment in enrollments {
            grouped
                .entry(enrollment.account_id.clone())
                .or_default()
                .push(enrollment);
        }
        Ok(grouped)
    }
}

#[async_trait]
impl<S: SessionFactory> AccountDao for DieselAccountDao<S> {
    async fn create_account(&self, account: Account) -> Result<Account, BridgeError> {
        let record = account.clone();
        self.helper
            .execute_with_session(Some(&account), move |session| {
                async move {
                    entity::insert(session, &record).await?;
                    insert_enrollments(session, &record).await
                }
                .scope_boxed()
            })
            .await?;
        debug!(
            account_id = %account.id,
            enrollments = account.enrollments.len(),
            "account created"
        );
        Ok(account)
    }

    async fn update_account(&self, account: Account) -> Result<Account, BridgeError> {
        let subject = account.clone();
        self.helper
            .execute_with_session(Some(&subject), move |session| {
                async move {
                    let mut account = account;
                    entity::update(session, &mut account).await?;
                    let clear = Statement::new(DELETE_ENROLLMENTS).bind("accountId", &account.id);
                    session.execute(&clear).await?;
                    insert_enrollments(session, &account).await?;
                    Ok(account)
                }
                .scope_boxed()
            })
            .await
    }

    async fn get_account(
        &self,
        ctx: &RequestContext,
        account_id: &AccountId,
    ) -> Result<Option<Account>, BridgeError> {
        let scope = ctx.study_scope();
        let account = self.lookup.find_account(account_id).await?;
        Ok(account.map(|account| account.restricted_to(&scope)))
    }

    async fn delete_account(&self, account_id: &AccountId) -> Result<(), BridgeError> {
        let id = match account_id {
            AccountId::Id { id, .. } => Some(id.clone()),
            other => self
                .lookup
                .find_account(other)
                .await?
                .map(|account| account.id),
        };
        let Some(id) = id else {
            debug!(app_id = account_id.app_id(), "no account to delete");
            return Ok(());
        };
        let params = Params::from([
            ("appId".to_owned(), SqlValue::from(account_id.app_id())),
            ("id".to_owned(), SqlValue::from(id)),
        ]);
        self.helper
            .query_update::<Account>(DELETE_ACCOUNT, params)
            .await?;
        Ok(())
    }

    async fn get_paged_account_summaries(
        &self,
        ctx: &RequestContext,
        app_id: &str,
        search: &AccountSummarySearch,
    ) -> Result<PagedResourceList<AccountSummary>, BridgeError> {
        let scope = ctx.study_scope();
        let builder = summary_query(&scope, app_id, search);
        let accounts = self
            .helper
            .query_page::<Account>(&builder.query(), builder.parameters().clone(), search.page)
            .await?;
        let ids = accounts.items().iter().map(|a| a.id.clone()).collect();
        let mut enrollments = self.enrollments_by_account(ids).await?;
        Ok(accounts
            .map(|mut account| {
                account.enrollments = enrollments.remove(&account.id).unwrap_or_default();
                AccountSummary::from_account(&account, &scope)
            })
            .with_request_param("emailFilter", &search.email_filter)
            .with_request_param("phoneFilter", &search.phone_filter)
            .with_request_param("externalIdFilter", &search.external_id_filter)
            .with_request_param("orgMembership", &search.org_membership)
            .with_request_param("adminOnly", search.admin_only)
            .with_request_param("enrolledInStudyId", &search.enrolled_in_study)
            .with_request_param("status", search.status)
            .with_request_param("language", &search.language)
            .with_request_param("allOfGroups", &search.all_of_groups)
            .with_request_param("noneOfGroups", &search.none_of_groups)
            .with_request_param("startTime", search.start_time)
            .with_request_param("endTime", search.end_time))
    }

    async fn get_app_ids_for_user(
        &self,
        synapse_user_id: &str,
    ) -> Result<Vec<String>, BridgeError> {
        let params = Params::from([(
            "synapseUserId".to_owned(),
            SqlValue::from(synapse_user_id),
        )]);
        let rows: Vec<AppIdRow> = self
            .helper
            .native_query_get(APP_IDS_FOR_USER, params, None, None)
            .await?;
        Ok(rows.into_iter().map(|row| row.app_id).collect())
    }
}
