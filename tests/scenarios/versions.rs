//! Version stamps and optimistic lock checks

use crate::common::{session, Person};
use causeway::{
    check_lock, DomainObject, Error, Identity, Loaded, Pojo, StoredRecord, Version,
};

#[test]
fn create_persist_mutate_check() {
    let (mut s, _store) = session();

    s.start_transaction().unwrap();
    let p = s.create_transient(Pojo::new(Person::new("ann", 30))).unwrap();
    s.make_persistent(&p).unwrap();
    let v1 = p.version().unwrap();
    s.end_transaction().unwrap();

    s.start_transaction().unwrap();
    s.update(&p, Some(&v1), |person: &mut Person| person.age = 31)
        .unwrap();
    s.end_transaction().unwrap();
    let v2 = p.version().unwrap();

    assert!(v2.different(&v1));
    let err = check_lock(&p, &v1).unwrap_err();
    assert!(matches!(err, Error::Concurrency { ref identity, .. } if *identity == p.identity()));
    assert!(check_lock(&p, &v2).is_ok());
    s.close().unwrap();
}

#[test]
fn every_update_gets_a_fresh_version() {
    let (mut s, _store) = session();
    s.start_transaction().unwrap();
    let p = s.persist(Pojo::new(Person::new("ann", 30))).unwrap();

    let mut seen = vec![p.version().unwrap()];
    for _ in 0..5 {
        s.update(&p, None, |person: &mut Person| person.age += 1)
            .unwrap();
        let current = p.version().unwrap();
        assert!(seen.iter().all(|v| v.different(&current)));
        seen.push(current);
    }
    for old in &seen[..seen.len() - 1] {
        assert!(check_lock(&p, old).is_err());
    }
    s.end_transaction().unwrap();
}

#[test]
fn versions_carry_the_principal() {
    let (mut s, _store) = session();
    let p = s
        .transaction(|s| s.persist(Pojo::new(Person::new("ann", 30))))
        .unwrap();
    let version = p.version().unwrap();
    assert_eq!(version.user(), Some("tester"));
    assert!(version.utc_timestamp().is_some());
}

#[test]
fn stored_version_never_moves_backwards() {
    let (mut s, store) = session();
    let id = Identity::persistent("Person", 9u64);
    store.seed(StoredRecord {
        identity: id.clone(),
        version: Version::new(50),
        memento: Person::new("ann", 1).memento(),
        destroyed: false,
    });

    // A loaded object must say which version it was loaded at
    let err = s
        .identity_map()
        .create_persistent_adapter(
            Pojo::new(Person::new("stale", 1)),
            id.clone(),
            None,
            Loaded::Resolved,
        )
        .unwrap_err();
    assert!(matches!(err, Error::IllegalState(_)));

    // A ghost learns it on resolve
    let p = s
        .identity_map()
        .create_persistent_adapter(Pojo::new(Person::new("", 0)), id.clone(), None, Loaded::Ghost)
        .unwrap();
    s.transaction(|s| s.update(&p, None, |person: &mut Person| person.age = 2))
        .unwrap();

    let stored = store.record(&id).unwrap();
    assert!(stored.version.is_newer_than(&Version::new(50)));
    assert_eq!(stored.memento, Person::new("ann", 2).memento());
}
