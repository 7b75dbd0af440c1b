// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sessions: identity map, change tracking, flush and rollback

#[path = "testutils/mod.rs"]
mod testutils;

use graphlite_orm::{OrmError, StoreError};
use testutils::entities::{account, company, employee, person, person_aged, Account, Employee, Person};
use testutils::fixture::TestFixture;

#[tokio::test]
async fn test_get_returns_the_same_instance() {
    let fixture = TestFixture::new();
    let people = fixture.orm.repository::<Person>().unwrap();
    let saved = people.save(&person("Alice")).await.unwrap();
    let id = saved.read().id.unwrap();

    let session = fixture.orm.session();
    fixture.reset_queries();
    let first = session.get::<Person>(id).await.unwrap().unwrap();
    let second = session.get::<Person>(id).await.unwrap().unwrap();
    assert!(first.ptr_eq(&second));
    assert!(!first.ptr_eq(&saved), "the session loads its own instance");
    assert_eq!(fixture.queries(), 1);
    assert!(session.contains(&first));

    assert!(session.get::<Person>(id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn test_nothing_is_written_before_flush() {
    let fixture = TestFixture::new();
    let session = fixture.orm.session();

    let bob = person("Bob");
    session.add(&bob).unwrap();
    session.add(&bob).unwrap();
    assert!(session.has_pending_changes());
    assert_eq!(fixture.queries(), 0);

    session.flush().await.unwrap();
    assert_eq!(fixture.node_count("Person"), 1);
    assert!(!session.has_pending_changes());

    // the flushed entity now lives in the identity map
    let id = bob.read().id.unwrap();
    let found = session.get::<Person>(id).await.unwrap().unwrap();
    assert!(found.ptr_eq(&bob));
}

#[tokio::test]
async fn test_only_modified_entities_are_updated() {
    let fixture = TestFixture::new();
    let people = fixture.orm.repository::<Person>().unwrap();
    let ids: Vec<i64> = {
        let batch = vec![person_aged("A", 20), person_aged("B", 30)];
        people.save_all(&batch).await.unwrap();
        batch.iter().map(|p| p.read().id.unwrap()).collect()
    };

    let session = fixture.orm.session();
    let a = session.get::<Person>(ids[0]).await.unwrap().unwrap();
    session.get::<Person>(ids[1]).await.unwrap().unwrap();
    assert!(!session.has_pending_changes());

    a.write().age = Some(21);
    assert!(session.has_pending_changes());

    fixture.reset_queries();
    session.commit().await.unwrap();
    assert_eq!(fixture.queries(), 1, "one update, the untouched entity is skipped");
    assert_eq!(
        fixture.store.node(ids[0]).unwrap().get_property("age"),
        Some(&21i64.into())
    );

    fixture.reset_queries();
    session.flush().await.unwrap();
    assert_eq!(fixture.queries(), 0);
}

#[tokio::test]
async fn test_delete_on_flush() {
    let fixture = TestFixture::new();
    let people = fixture.orm.repository::<Person>().unwrap();
    let saved = people.save(&person("Gone")).await.unwrap();
    let id = saved.read().id.unwrap();

    let session = fixture.orm.session();
    let gone = session.get::<Person>(id).await.unwrap().unwrap();
    session.delete(&gone).unwrap();
    assert!(!session.contains(&gone));
    assert_eq!(fixture.node_count("Person"), 1);

    session.flush().await.unwrap();
    assert_eq!(fixture.node_count("Person"), 0);
    assert!(!session.has_pending_changes());
}

#[tokio::test]
async fn test_deleting_a_new_entity_cancels_the_insert() {
    let fixture = TestFixture::new();
    let session = fixture.orm.session();

    let temp = person("Temp");
    session.add(&temp).unwrap();
    session.delete(&temp).unwrap();
    assert!(!session.has_pending_changes());

    session.flush().await.unwrap();
    assert_eq!(fixture.queries(), 0);
    assert!(temp.read().id.is_none());
}

#[tokio::test]
async fn test_rollback_restores_tracked_state() {
    let fixture = TestFixture::new();
    let people = fixture.orm.repository::<Person>().unwrap();
    let saved = people.save(&person_aged("Carol", 40)).await.unwrap();
    let id = saved.read().id.unwrap();

    let session = fixture.orm.session();
    let carol = session.get::<Person>(id).await.unwrap().unwrap();
    carol.write().name = "Caroline".to_string();
    carol.write().age = None;
    session.delete(&carol).unwrap();
    session.add(&person("Never")).unwrap();

    session.rollback().unwrap();
    assert!(!session.has_pending_changes());
    assert_eq!(carol.read().name, "Carol");
    assert_eq!(carol.read().age, Some(40));
    assert!(session.contains(&carol), "a cancelled delete is tracked again");

    session.flush().await.unwrap();
    assert_eq!(fixture.node_count("Person"), 1);
    assert_eq!(fixture.queries(), 2, "seed save and the session load only");
}

#[tokio::test]
async fn test_re_adding_a_deleted_entity_keeps_it() {
    let fixture = TestFixture::new();
    let accounts = fixture.orm.repository::<Account>().unwrap();
    accounts.save(&account("A-1", 5.0)).await.unwrap();

    let session = fixture.orm.session();
    let acct = session.get::<Account>("A-1").await.unwrap().unwrap();
    session.delete(&acct).unwrap();
    session.add(&acct).unwrap();
    session.flush().await.unwrap();

    assert_eq!(fixture.node_count("Account"), 1);
    let again = session.get::<Account>("A-1").await.unwrap().unwrap();
    assert!(again.ptr_eq(&acct));
}

#[tokio::test]
async fn test_flush_cascades_relationships() {
    let fixture = TestFixture::new();
    let session = fixture.orm.session();

    let ann = employee("Ann");
    ann.write().employer.set(Some(company("Acme")));
    session.add(&ann).unwrap();
    session.flush().await.unwrap();

    assert_eq!(fixture.node_count("Company"), 1);
    assert_eq!(fixture.edge_count("WORKS_FOR"), 1);
    let loaded = session
        .get::<Employee>(ann.read().id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(loaded.ptr_eq(&ann));
}

#[tokio::test]
async fn test_failed_flush_keeps_remaining_work_pending() {
    let fixture = TestFixture::new();
    let session = fixture.orm.session();

    let first = person("First");
    session.add(&first).unwrap();
    session.flush().await.unwrap();

    fixture.store.fail_on("CREATE (n:Person)");
    let second = person("Second");
    session.add(&second).unwrap();
    let err = session.flush().await.unwrap_err();
    assert!(matches!(err, OrmError::Store(StoreError::Backend(_))));
    assert!(session.has_pending_changes());

    fixture.store.clear_failure();
    session.flush().await.unwrap();
    assert_eq!(fixture.node_count("Person"), 2);
    assert!(second.read().id.is_some());
}

#[tokio::test]
async fn test_closed_session_rejects_work() {
    let fixture = TestFixture::new();
    let session = fixture.orm.session();
    session.add(&person("Late")).unwrap();
    session.close();

    assert!(!session.is_active());
    assert!(!session.has_pending_changes());
    assert!(matches!(
        session.add(&person("Later")).unwrap_err(),
        OrmError::Session(_)
    ));
    assert!(matches!(
        session.get::<Person>(1).await.unwrap_err(),
        OrmError::Session(_)
    ));
    assert!(matches!(session.flush().await.unwrap_err(), OrmError::Session(_)));
}
