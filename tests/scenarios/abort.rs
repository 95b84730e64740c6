//! Abort semantics

use crate::common::{session, Person};
use causeway::{Pojo, ResolveState, TransactionState};

#[test]
fn abort_discards_notifications() {
    let (mut s, store) = session();
    s.start_transaction().unwrap();
    let p = s.persist(Pojo::new(Person::new("ann", 30))).unwrap();
    s.end_transaction().unwrap();
    let before = p.version();

    let txn_id = s.start_transaction().unwrap();
    s.update(&p, None, |person: &mut Person| person.age = 99)
        .unwrap();
    s.abort_transaction().unwrap();

    assert!(store.committed_for(txn_id).is_empty());
    assert!(matches!(
        s.transactions().state(),
        Some(TransactionState::Aborted { .. })
    ));
    assert_eq!(p.version(), before);
    assert_eq!(p.resolve_state(), ResolveState::Resolved);
    // Field values are not rolled back
    assert_eq!(s.read(&p, |person: &Person| person.age).unwrap(), 99);
    let stored = store.record(&p.identity()).unwrap();
    assert_eq!(stored.memento["age"], 30);
}

#[test]
fn abort_without_active_transaction_is_a_noop() {
    let (mut s, _store) = session();
    s.abort_transaction().unwrap();

    s.start_transaction().unwrap();
    s.end_transaction().unwrap();
    s.abort_transaction().unwrap();
    assert!(matches!(
        s.transactions().state(),
        Some(TransactionState::Committed)
    ));
    assert_eq!(s.transactions().metrics().total_aborted, 0);
}

#[test]
fn aborted_destroy_restores_state() {
    let (mut s, _store) = session();
    let p = s
        .transaction(|s| s.persist(Pojo::new(Person::new("ann", 30))))
        .unwrap();

    s.start_transaction().unwrap();
    s.destroy(&p, None).unwrap();
    assert_eq!(p.resolve_state(), ResolveState::Destroyed);
    s.abort_transaction().unwrap();
    assert_eq!(p.resolve_state(), ResolveState::Resolved);
}
