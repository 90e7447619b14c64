//! Unit-of-work and translation tests for the persistence helper.

use std::sync::Arc;

use diesel::sql_types::Text;
use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::domain::{Alert, AlertCategory, FailureKind, Schedule2};
use crate::outbound::persistence::exceptions::BasicPersistenceExceptionConverter;
use crate::outbound::persistence::statement::SqlValue;
use crate::test_support::{Scripted, ScriptedSessionFactory, SessionEvent, entity_row};

#[fixture]
fn schedule() -> Schedule2 {
    Schedule2 {
        guid: "sched-1".into(),
        app_id: "api".into(),
        owner_id: "org-1".into(),
        name: "Weekly".into(),
        duration: "P4W".into(),
        version: 2,
        ..Schedule2::default()
    }
}

fn helper(sessions: &ScriptedSessionFactory) -> PersistenceHelper<ScriptedSessionFactory> {
    PersistenceHelper::new(
        Arc::new(sessions.clone()),
        Arc::new(BasicPersistenceExceptionConverter),
    )
}

#[rstest]
#[tokio::test]
async fn create_commits_one_insert(schedule: Schedule2) {
    let sessions = ScriptedSessionFactory::new();

    let created = helper(&sessions)
        .create(schedule.clone())
        .await
        .expect("insert succeeds");

    assert_eq!(created, schedule);
    assert_eq!(
        sessions.events(),
        vec![
            SessionEvent::Open,
            SessionEvent::Begin,
            SessionEvent::Insert("schedules"),
            SessionEvent::Commit,
        ]
    );
}

#[rstest]
#[tokio::test]
async fn update_increments_the_version(schedule: Schedule2) {
    let sessions = ScriptedSessionFactory::new().with_response(Scripted::Affected(1));

    let updated = helper(&sessions).update(schedule).await.expect("update succeeds");

    assert_eq!(updated.version, 3);
    assert!(sessions.events().contains(&SessionEvent::Update("schedules", 2)));
}

#[rstest]
#[tokio::test]
async fn stale_updates_are_concurrent_modifications(schedule: Schedule2) {
    let sessions = ScriptedSessionFactory::new().with_response(Scripted::Affected(0));

    let err = helper(&sessions).update(schedule).await.expect_err("stale version");

    assert_eq!(err.status_code(), 409);
    assert_eq!(
        err.message(),
        "Schedule has the wrong version number; it may have been saved in the background."
    );
}

#[rstest]
#[tokio::test]
async fn stale_updates_are_never_committed(schedule: Schedule2) {
    let sessions = ScriptedSessionFactory::new().with_response(Scripted::Affected(0));

    helper(&sessions).update(schedule).await.expect_err("stale version");

    assert_eq!(
        sessions.events(),
        vec![
            SessionEvent::Open,
            SessionEvent::Begin,
            SessionEvent::Update("schedules", 2),
            SessionEvent::Rollback,
        ]
    );
}

#[rstest]
#[tokio::test]
async fn unversioned_updates_of_missing_rows_are_not_found() {
    let sessions = ScriptedSessionFactory::new().with_response(Scripted::Affected(0));
    let alert = Alert::new("api", "study-a", "user-1", AlertCategory::NewEnrollment, json!({}));

    let err = helper(&sessions).update(alert).await.expect_err("no row");

    assert_eq!(err, BridgeError::not_found("Alert"));
    assert!(sessions.events().contains(&SessionEvent::Update("alerts", 0)));
}

#[rstest]
#[tokio::test]
async fn failed_work_rolls_back_and_never_commits() {
    let sessions = ScriptedSessionFactory::new().with_response(Scripted::Fail(
        PersistenceFailure::connection("connection reset"),
    ));

    let err = helper(&sessions)
        .native_query_update("DELETE FROM schedules", Params::new())
        .await
        .expect_err("statement fails");

    assert_eq!(err.status_code(), 500);
    let events = sessions.events();
    assert!(events.contains(&SessionEvent::Rollback));
    assert!(!events.contains(&SessionEvent::Commit));
}

#[rstest]
#[tokio::test]
async fn failed_commits_roll_back() {
    let sessions = ScriptedSessionFactory::new()
        .failing_commit(PersistenceFailure::connection("server closed the connection"));

    let result = helper(&sessions)
        .native_query_update("UPDATE schedules SET name = 'x'", Params::new())
        .await;

    assert!(result.is_err());
    assert_eq!(sessions.events().last(), Some(&SessionEvent::Rollback));
}

#[rstest]
#[tokio::test]
async fn unavailable_sessions_become_persistence_errors() {
    let sessions = ScriptedSessionFactory::new()
        .failing_open(PersistenceFailure::connection("pool exhausted"));

    let err = helper(&sessions)
        .get_by_id::<Schedule2>("sched-1".into())
        .await
        .expect_err("open fails");

    assert_eq!(err.status_code(), 500);
    assert!(sessions.events().is_empty());
}

#[rstest]
#[tokio::test]
async fn missing_rows_load_as_none() {
    let sessions = ScriptedSessionFactory::new();

    let loaded = helper(&sessions)
        .get_by_id::<Schedule2>("missing".into())
        .await
        .expect("lookup succeeds");

    assert_eq!(loaded, None);
    assert!(
        sessions
            .events()
            .contains(&SessionEvent::Find("schedules", "\"missing\"".into()))
    );
}

#[rstest]
#[tokio::test]
async fn rows_load_through_the_entity_mapping(schedule: Schedule2) {
    let sessions = ScriptedSessionFactory::new().with_rows([entity_row(&schedule)]);

    let loaded = helper(&sessions)
        .get_by_id::<Schedule2>(schedule.key())
        .await
        .expect("lookup succeeds");

    assert_eq!(loaded, Some(schedule));
}

#[rstest]
#[tokio::test]
async fn deleting_nothing_is_not_found() {
    let sessions = ScriptedSessionFactory::new().with_response(Scripted::Affected(0));

    let err = helper(&sessions)
        .delete_by_id::<Schedule2>("sched-9".into())
        .await
        .expect_err("no row");

    assert_eq!(err, BridgeError::not_found("Schedule"));
}

#[rstest]
#[case(None, None, "SELECT * FROM schedules")]
#[case(Some(0), Some(10), "SELECT * FROM schedules LIMIT 10 OFFSET 0")]
#[case(Some(20), None, "SELECT * FROM schedules OFFSET 20")]
#[tokio::test]
async fn paging_appends_limit_then_offset(
    #[case] offset: Option<u64>,
    #[case] limit: Option<u64>,
    #[case] expected: &str,
) {
    let sessions = ScriptedSessionFactory::new();

    helper(&sessions)
        .query_get::<Schedule2>("SELECT * FROM schedules", Params::new(), offset, limit)
        .await
        .expect("query succeeds");

    assert_eq!(sessions.statements()[0].sql(), expected);
}

#[rstest]
#[tokio::test]
async fn counts_wrap_the_entity_query() {
    let sessions = ScriptedSessionFactory::new().with_count(7);
    let params = Params::from([("name".to_owned(), SqlValue::from("Weekly"))]);

    let count = helper(&sessions)
        .query_count::<Schedule2>("SELECT * FROM schedules WHERE name = :name", params)
        .await
        .expect("count succeeds");

    assert_eq!(count, 7);
    assert_eq!(
        sessions.statements()[0].sql(),
        "SELECT COUNT(*) AS count FROM (SELECT * FROM schedules WHERE name = :name) counted"
    );
}

#[rstest]
#[tokio::test]
async fn entity_query_failures_record_the_entity_type() {
    let sessions = ScriptedSessionFactory::new().with_response(Scripted::Fail(
        PersistenceFailure::new(FailureKind::OptimisticLock, "stale row"),
    ));

    let err = helper(&sessions)
        .query_update::<Schedule2>("UPDATE schedules SET version = version + 1", Params::new())
        .await
        .expect_err("statement fails");

    assert_eq!(err, BridgeError::concurrent_modification("Schedule"));
}

#[derive(Debug, PartialEq, QueryableByName)]
struct NameRow {
    #[diesel(sql_type = Text)]
    name: String,
}

#[rstest]
#[tokio::test]
async fn native_queries_load_projections() {
    let sessions = ScriptedSessionFactory::new().with_rows([
        NameRow { name: "a".into() },
        NameRow { name: "b".into() },
    ]);

    let names: Vec<NameRow> = helper(&sessions)
        .native_query_get("SELECT name FROM schedules", Params::new(), None, Some(2))
        .await
        .expect("query succeeds");

    assert_eq!(names.len(), 2);
    assert_eq!(names[1].name, "b");
    assert_eq!(
        sessions.statements()[0].sql(),
        "SELECT name FROM schedules LIMIT 2"
    );
}

#[rstest]
#[tokio::test]
async fn mismatched_projection_rows_are_malformed() {
    let sessions = ScriptedSessionFactory::new().with_count(3);

    let err = helper(&sessions)
        .native_query_get::<NameRow>("SELECT name FROM schedules", Params::new(), None, None)
        .await
        .expect_err("wrong row type");

    assert_eq!(err.status_code(), 500);
}

#[rstest]
#[tokio::test]
async fn several_writes_share_one_transaction(schedule: Schedule2) {
    let sessions = ScriptedSessionFactory::new();
    let first = entity_row(&schedule);
    let second = entity_row(&Schedule2 {
        guid: "sched-2".into(),
        ..schedule.clone()
    });

    helper(&sessions)
        .execute_with_session(Some(&schedule), move |session| {
            async move {
                session.insert(&first).await?;
                session.insert(&second).await
            }
            .scope_boxed()
        })
        .await
        .expect("both inserts succeed");

    assert_eq!(
        sessions.events(),
        vec![
            SessionEvent::Open,
            SessionEvent::Begin,
            SessionEvent::Insert("schedules"),
            SessionEvent::Insert("schedules"),
            SessionEvent::Commit,
        ]
    );
}

#[rstest]
#[tokio::test]
async fn soft_deleting_a_missing_row_is_not_found() {
    let sessions = ScriptedSessionFactory::new().with_response(Scripted::Affected(0));

    let err = helper(&sessions)
        .soft_delete::<Schedule2>("sched-9".into())
        .await
        .expect_err("no row");

    assert_eq!(err.status_code(), 404);
    assert!(
        sessions
            .events()
            .contains(&SessionEvent::SoftDelete("schedules", "\"sched-9\"".into()))
    );
}

#[rstest]
#[tokio::test]
async fn pages_carry_the_total_and_request(schedule: Schedule2) {
    let sessions = ScriptedSessionFactory::new()
        .with_count(12)
        .with_rows([entity_row(&schedule)]);
    let page = pagination::PageRequest::new(10, 5).expect("valid page");

    let list = helper(&sessions)
        .query_page::<Schedule2>("SELECT * FROM schedules ORDER BY guid", Params::new(), page)
        .await
        .expect("page loads");

    assert_eq!(list.total(), 12);
    assert_eq!(list.items(), &[schedule]);
    assert_eq!(list.request_params()["offsetBy"], 10);
    assert_eq!(
        sessions.statements()[1].sql(),
        "SELECT * FROM schedules ORDER BY guid LIMIT 5 OFFSET 10"
    );
}

#[rstest]
#[tokio::test]
async fn deleting_an_entity_uses_its_key(schedule: Schedule2) {
    let sessions = ScriptedSessionFactory::new();

    helper(&sessions).delete(&schedule).await.expect("row removed");

    assert!(
        sessions
            .events()
            .contains(&SessionEvent::Delete("schedules", "\"sched-1\"".into()))
    );
}
