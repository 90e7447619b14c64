//! Persistence helper behaviour through the public adapter surface.

use std::sync::Arc;

use bridge_backend::domain::{BridgeError, Organization, PersistenceFailure};
use bridge_backend::outbound::persistence::{
    MySqlPersistenceExceptionConverter, OrganizationPersistenceExceptionConverter, Params,
    PersistenceHelper, SqlValue,
};
use bridge_backend::test_support::{Scripted, ScriptedSessionFactory, SessionEvent, entity_row};
use pagination::PageRequest;
use rstest::{fixture, rstest};

#[fixture]
fn organization() -> Organization {
    Organization {
        app_id: "api".to_owned(),
        identifier: "org-1".to_owned(),
        name: "Sleep Lab".to_owned(),
        ..Organization::default()
    }
}

fn helper(sessions: &ScriptedSessionFactory) -> PersistenceHelper<ScriptedSessionFactory> {
    let inner = Arc::new(OrganizationPersistenceExceptionConverter);
    PersistenceHelper::new(
        Arc::new(sessions.clone()),
        Arc::new(MySqlPersistenceExceptionConverter::new(inner)),
    )
}

#[rstest]
#[tokio::test]
async fn mysql_duplicate_keys_reach_the_entity_converter(organization: Organization) {
    let sessions = ScriptedSessionFactory::new().with_response(Scripted::Fail(
        PersistenceFailure::query("Duplicate entry 'api-org-1' for key 'Organizations.PRIMARY'"),
    ));

    let err = helper(&sessions)
        .create(organization)
        .await
        .expect_err("duplicate");

    assert_eq!(err.status_code(), 409);
    assert_eq!(
        err.entity_keys()
            .and_then(|keys| keys.get("identifier"))
            .map(String::as_str),
        Some("org-1")
    );
}

#[rstest]
#[tokio::test]
async fn mysql_deadlocks_are_concurrent_modifications(organization: Organization) {
    let sessions = ScriptedSessionFactory::new().with_response(Scripted::Fail(
        PersistenceFailure::query("Deadlock found when trying to get lock; try restarting"),
    ));

    let err = helper(&sessions)
        .update(organization)
        .await
        .expect_err("deadlock");

    assert_eq!(err, BridgeError::concurrent_modification("Organization"));
    assert_eq!(sessions.events().last(), Some(&SessionEvent::Rollback));
}

#[rstest]
#[tokio::test]
async fn pages_count_before_fetching(organization: Organization) {
    let sessions = ScriptedSessionFactory::new()
        .with_count(11)
        .with_rows([entity_row(&organization)]);
    let params = Params::from([("appId".to_owned(), SqlValue::from("api"))]);
    let page = PageRequest::new(10, 5).expect("valid page");

    let list = helper(&sessions)
        .query_page::<Organization>(
            "SELECT * FROM organizations WHERE app_id = :appId",
            params,
            page,
        )
        .await
        .expect("query succeeds");

    assert_eq!(list.total(), 11);
    assert_eq!(list.items(), [organization].as_slice());
    let statements = sessions.statements();
    assert!(statements[0].sql().starts_with("SELECT COUNT(*) AS count FROM ("));
    assert!(statements[1].sql().ends_with("LIMIT 5 OFFSET 10"));
}

#[rstest]
#[tokio::test]
async fn connection_failures_surface_as_persistence_errors() {
    let sessions = ScriptedSessionFactory::new()
        .failing_open(PersistenceFailure::connection("pool timed out"));
    let err = helper(&sessions)
        .get_by_id::<Organization>(("api".to_owned(), "org-1".to_owned()))
        .await
        .expect_err("no connection");

    assert_eq!(err.status_code(), 500);
    assert!(sessions.events().is_empty());
}

#[rstest]
#[tokio::test]
async fn failed_commits_are_translated_like_statement_failures(organization: Organization) {
    let sessions = ScriptedSessionFactory::new()
        .failing_commit(PersistenceFailure::optimistic_lock("Organization"));

    let err = helper(&sessions)
        .create(organization)
        .await
        .expect_err("commit failed");

    assert_eq!(err, BridgeError::concurrent_modification("Organization"));
    assert_eq!(
        sessions.events().iter().rev().take(2).collect::<Vec<_>>(),
        vec![&SessionEvent::Rollback, &SessionEvent::Commit]
    );
}

#[rstest]
#[tokio::test]
async fn stale_organizations_roll_back_without_committing(organization: Organization) {
    let sessions = ScriptedSessionFactory::new().with_response(Scripted::Affected(0));

    let err = helper(&sessions)
        .update(organization)
        .await
        .expect_err("stale version");

    assert_eq!(err, BridgeError::concurrent_modification("Organization"));
    assert_eq!(
        sessions.events(),
        vec![
            SessionEvent::Open,
            SessionEvent::Begin,
            SessionEvent::Update("organizations", 0),
            SessionEvent::Rollback,
        ]
    );
}
