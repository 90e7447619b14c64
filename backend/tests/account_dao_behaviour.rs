//! Account DAO behaviour over scripted sessions.
//!
//! These tests drive the public adapter surface the way a service would and
//! check units of work, scoping and constraint translation end to end.

use std::sync::Arc;

use bridge_backend::domain::ports::AccountDao;
use bridge_backend::domain::{
    Account, AccountId, BridgeError, Enrollment, PersistenceFailure, RequestContext, Role,
};
use bridge_backend::outbound::persistence::DieselAccountDao;
use bridge_backend::test_support::{Scripted, ScriptedSessionFactory, SessionEvent, entity_row};
use rstest::{fixture, rstest};

#[fixture]
fn account() -> Account {
    let mut account = Account {
        id: "user-1".to_owned(),
        app_id: "api".to_owned(),
        email: Some("participant@example.org".to_owned()),
        version: 2,
        ..Account::default()
    };
    account.enroll(Enrollment::new("api", "study-a", "user-1").with_external_id("ext-1"));
    account
}

fn dao(sessions: &ScriptedSessionFactory) -> DieselAccountDao<ScriptedSessionFactory> {
    DieselAccountDao::new(Arc::new(sessions.clone()))
}

#[rstest]
#[tokio::test]
async fn creating_an_account_writes_its_enrollments_in_one_unit_of_work(account: Account) {
    let sessions = ScriptedSessionFactory::new();

    let created = dao(&sessions)
        .create_account(account.clone())
        .await
        .expect("create succeeds");

    assert_eq!(created, account);
    assert_eq!(
        sessions.events(),
        vec![
            SessionEvent::Open,
            SessionEvent::Begin,
            SessionEvent::Insert("accounts"),
            SessionEvent::Insert("enrollments"),
            SessionEvent::Commit,
        ]
    );
}

#[rstest]
#[tokio::test]
async fn duplicate_emails_name_the_existing_account(account: Account) {
    let holder = Account {
        id: "user-0".to_owned(),
        app_id: "api".to_owned(),
        email: account.email.clone(),
        ..Account::default()
    };
    let sessions = ScriptedSessionFactory::new()
        .with_response(Scripted::Fail(PersistenceFailure::unique_violation(
            "duplicate key value violates unique constraint \"Accounts-StudyId-Email-Index\"",
        )))
        .with_rows([entity_row(&holder)]);

    let err = dao(&sessions)
        .create_account(account)
        .await
        .expect_err("duplicate email");

    assert_eq!(err.status_code(), 409);
    assert_eq!(
        err.message(),
        "Email address has already been used by another account."
    );
    assert_eq!(
        err.entity_keys()
            .and_then(|keys| keys.get("userId"))
            .map(String::as_str),
        Some("user-0")
    );
    assert!(sessions.events().contains(&SessionEvent::Rollback));
}

#[rstest]
#[tokio::test]
async fn stale_updates_roll_back_without_touching_enrollments(account: Account) {
    let sessions = ScriptedSessionFactory::new().with_response(Scripted::Affected(0));

    let err = dao(&sessions)
        .update_account(account)
        .await
        .expect_err("stale version");

    assert!(matches!(err, BridgeError::ConcurrentModification { .. }));
    assert!(sessions.statements().is_empty());
    assert_eq!(
        sessions.events(),
        vec![
            SessionEvent::Open,
            SessionEvent::Begin,
            SessionEvent::Update("accounts", 2),
            SessionEvent::Rollback,
        ]
    );
}

#[rstest]
#[tokio::test]
async fn updates_return_the_account_at_its_next_version(account: Account) {
    let sessions = ScriptedSessionFactory::new();

    let updated = dao(&sessions)
        .update_account(account)
        .await
        .expect("update succeeds");

    assert_eq!(updated.version, 3);
    let events = sessions.events();
    assert_eq!(events[2], SessionEvent::Update("accounts", 2));
    assert!(sessions.statements()[0].sql().starts_with("DELETE FROM enrollments"));
    assert_eq!(events[4], SessionEvent::Insert("enrollments"));
    assert_eq!(events.last(), Some(&SessionEvent::Commit));
}

#[rstest]
#[tokio::test]
async fn scoped_callers_only_see_their_enrollments(account: Account) {
    let other = Enrollment::new("api", "study-b", "user-1");
    let visible = account.enrollments[0].clone();
    let stored = Account {
        enrollments: Vec::new(),
        ..account
    };
    let sessions = ScriptedSessionFactory::new()
        .with_rows([entity_row(&stored)])
        .with_rows([entity_row(&visible), entity_row(&other)]);
    let ctx = RequestContext::for_caller("api", "researcher")
        .with_roles([Role::Researcher])
        .with_org_sponsored_studies(["study-a"]);

    let found = dao(&sessions)
        .get_account(&ctx, &AccountId::for_id("api", "user-1"))
        .await
        .expect("query succeeds")
        .expect("account exists");

    assert_eq!(found.enrollments, vec![visible]);
}

#[rstest]
#[tokio::test]
async fn deleting_an_unknown_account_is_a_no_op() {
    let sessions = ScriptedSessionFactory::new();

    dao(&sessions)
        .delete_account(&AccountId::for_email("api", "nobody@example.org"))
        .await
        .expect("nothing to delete");

    assert_eq!(sessions.statements().len(), 1);
    assert!(sessions.statements()[0].sql().starts_with("SELECT"));
}
