//! Identity map uniqueness, remap and reset

use crate::common::{session, Person};
use causeway::{Error, Pojo, ResolveState};
use std::sync::Arc;

#[test]
fn wrapping_an_instance_twice_fails() {
    let (s, _store) = session();
    let pojo = Pojo::new(Person::new("ann", 30));
    let first = s.create_transient(pojo.clone()).unwrap();

    let err = s.create_transient(pojo.clone()).unwrap_err();
    assert!(matches!(err, Error::DuplicateAdapter { .. }));
    assert!(Arc::ptr_eq(&s.identity_map().adapter_for_pojo(&pojo).unwrap(), &first));
}

#[test]
fn remap_succeeds_exactly_once() {
    let (s, _store) = session();
    let a = s.create_transient(Pojo::new(Person::new("ann", 30))).unwrap();

    s.identity_map().remap_as_persistent(&a).unwrap();
    assert_eq!(a.resolve_state(), ResolveState::Resolved);
    assert!(a.version().is_some());

    let err = s.identity_map().remap_as_persistent(&a).unwrap_err();
    assert!(matches!(err, Error::IllegalState(_)));
}

#[test]
fn lookups_return_the_same_adapter() {
    let (s, _store) = session();
    let a = s.create_transient(Pojo::new(Person::new("ann", 30))).unwrap();
    s.identity_map().remap_as_persistent(&a).unwrap();

    let by_id = s.identity_map().adapter_for(&a.identity()).unwrap();
    let by_str = s.lookup(&a.identity().to_string()).unwrap();
    assert!(Arc::ptr_eq(&by_id, &a));
    assert!(Arc::ptr_eq(&by_str, &a));
}

#[test]
fn reset_forgets_everything() {
    let (s, _store) = session();
    let a = s.create_transient(Pojo::new(Person::new("ann", 30))).unwrap();
    let b = s.create_transient(Pojo::new(Person::new("bob", 40))).unwrap();
    let (ia, ib) = (a.identity(), b.identity());

    s.identity_map().reset();

    assert!(s.identity_map().adapter_for(&ia).is_none());
    assert!(s.identity_map().adapter_for(&ib).is_none());
    assert!(s.identity_map().is_empty());
}
