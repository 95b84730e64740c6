//! Resolve-state machine through the session

use crate::common::{session, Person};
use causeway::{Error, Pojo, ResolveState};

#[test]
fn every_pair_is_either_legal_or_rejected() {
    use ResolveState::*;
    let legal = [
        (Transient, Ghost),
        (Transient, Resolved),
        (Ghost, Resolved),
        (Resolved, Resolved),
        (Ghost, Destroyed),
        (Resolved, Destroyed),
    ];
    for from in ResolveState::ALL {
        for to in ResolveState::ALL {
            assert_eq!(
                from.can_transition_to(to),
                legal.contains(&(from, to)),
                "{from} -> {to}"
            );
        }
    }
}

#[test]
fn destroyed_object_cannot_be_updated() {
    let (mut s, _store) = session();
    s.start_transaction().unwrap();
    let a = s.persist(Pojo::new(Person::new("ann", 30))).unwrap();
    s.destroy(&a, None).unwrap();

    let err = s
        .update(&a, None, |p: &mut Person| p.age += 1)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::IllegalResolveTransition {
            from: ResolveState::Destroyed,
            to: ResolveState::Resolved,
            ..
        }
    ));
    assert_eq!(a.resolve_state(), ResolveState::Destroyed);
    s.end_transaction().unwrap();
}

#[test]
fn transient_object_cannot_be_destroyed() {
    let (mut s, _store) = session();
    let a = s.create_transient(Pojo::new(Person::new("ann", 30))).unwrap();
    s.start_transaction().unwrap();
    assert!(s.destroy(&a, None).is_err());
    assert_eq!(a.resolve_state(), ResolveState::Transient);
    s.abort_transaction().unwrap();
}
