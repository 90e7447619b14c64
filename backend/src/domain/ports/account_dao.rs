//! Ports for account persistence and account lookups.
//!
//! [`AccountDao`] is the full account store. [`AccountLookup`] is the one
//! read the account exception converter needs to work out which existing
//! account caused a unique-index collision.

use async_trait::async_trait;
use pagination::PagedResourceList;

use crate::domain::{
    Account, AccountId, AccountSummary, AccountSummarySearch, BridgeError, RequestContext,
};

/// Account store.
///
/// `create_account` and `update_account` write the account row, its
/// enrollments and its data groups in one unit of work. Updates are
/// versioned: a stale `version` fails with
/// [`BridgeError::ConcurrentModification`] and writes nothing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountDao: Send + Sync {
    /// Insert a new account with its enrollments.
    async fn create_account(&self, account: Account) -> Result<Account, BridgeError>;

    /// Replace an account and its enrollments, returning the account at its
    /// new version.
    async fn update_account(&self, account: Account) -> Result<Account, BridgeError>;

    /// Load an account. Enrollments outside the caller's studies are
    /// dropped.
    async fn get_account(
        &self,
        ctx: &RequestContext,
        account_id: &AccountId,
    ) -> Result<Option<Account>, BridgeError>;

    /// Delete an account and its enrollments. Missing accounts are ignored.
    async fn delete_account(&self, account_id: &AccountId) -> Result<(), BridgeError>;

    /// Page through account summaries matching `search`.
    async fn get_paged_account_summaries(
        &self,
        ctx: &RequestContext,
        app_id: &str,
        search: &AccountSummarySearch,
    ) -> Result<PagedResourceList<AccountSummary>, BridgeError>;

    /// Apps in which the Synapse user has an account.
    async fn get_app_ids_for_user(&self, synapse_user_id: &str)
    -> Result<Vec<String>, BridgeError>;
}

/// Unrestricted account lookup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountLookup: Send + Sync {
    /// Find the account addressed by `account_id`, ignoring caller scope.
    async fn find_account(&self, account_id: &AccountId) -> Result<Option<Account>, BridgeError>;
}
