//! All-or-nothing delivery to storage

use crate::common::{session, Person};
use causeway::{Error, ObjectStore, Pojo};

#[test]
fn failed_flush_leaves_nothing_visible() {
    let (mut s, store) = session();
    s.start_transaction().unwrap();
    let a = s.persist(Pojo::new(Person::new("ann", 30))).unwrap();
    let b = s.persist(Pojo::new(Person::new("bob", 40))).unwrap();
    let persisted = [a.identity(), b.identity()];

    store.fail_next_flush("network down");
    assert!(matches!(s.flush_transaction(), Err(Error::Storage(_))));
    assert!(!s.in_transaction());

    for identity in &persisted {
        assert!(store.load(identity).unwrap().is_none());
    }
    // Creations were discarded, so the adapters are transient again
    assert!(a.identity().is_transient() && b.identity().is_transient());
    // Abort already happened; ending now has nothing to end
    assert!(matches!(s.end_transaction(), Err(Error::NoActiveTransaction)));
}

#[test]
fn failed_commit_after_several_flushes_leaves_nothing_visible() {
    let (mut s, store) = session();
    s.start_transaction().unwrap();
    let a = s.persist(Pojo::new(Person::new("ann", 30))).unwrap();
    s.flush_transaction().unwrap();
    let b = s.persist(Pojo::new(Person::new("bob", 40))).unwrap();
    s.flush_transaction().unwrap();
    s.update(&a, None, |p: &mut Person| p.age = 31).unwrap();
    let persisted = [a.identity(), b.identity()];

    store.fail_next_commit_at(2, "constraint violated");
    assert!(s.end_transaction().is_err());

    for identity in &persisted {
        assert!(store.load(identity).unwrap().is_none());
    }
    assert!(s.identity_map().adapter_for(&persisted[0]).is_none());
    assert!(a.identity().is_transient() && b.identity().is_transient());
    assert_eq!(store.committed_notification_count(), 0);
    s.close().unwrap();
}

#[test]
fn successful_commit_applies_everything() {
    let (mut s, store) = session();
    let (a, b) = s
        .transaction(|s| {
            let a = s.persist(Pojo::new(Person::new("ann", 30)))?;
            s.flush_transaction()?;
            let b = s.persist(Pojo::new(Person::new("bob", 40)))?;
            Ok((a, b))
        })
        .unwrap();

    assert_eq!(store.load(&a.identity()).unwrap().unwrap().version, a.version().unwrap());
    assert_eq!(store.load(&b.identity()).unwrap().unwrap().version, b.version().unwrap());
    assert_eq!(store.commit_count(), 1);
}
