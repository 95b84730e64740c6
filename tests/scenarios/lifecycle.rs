//! Session lifecycle through the runtime

use crate::common::{runtime, Person};
use causeway::{Error, Pojo, Principal};

#[test]
fn closing_with_active_transaction_is_surfaced() {
    let rt = runtime();
    let mut s = rt.open_session(Principal::new("ann"));
    let txn_id = s.start_transaction().unwrap();

    let err = s.close().unwrap_err();
    assert!(matches!(err, Error::SessionClosedWithActiveTransaction { txn_id: t } if t == txn_id));
    assert!(s.in_transaction());

    s.end_transaction().unwrap();
    s.close().unwrap();
}

#[test]
fn outcome_reports_messages_and_touched_objects() {
    let rt = runtime();
    let mut s = rt.open_session(Principal::new("ann"));
    let (p, outcome) = s
        .transaction_with_outcome(|s| {
            let p = s.persist(Pojo::new(Person::new("ann", 30)))?;
            s.update(&p, None, |person: &mut Person| person.age = 31)?;
            s.add_message("person saved")?;
            s.add_warning("age changed")?;
            Ok(p)
        })
        .unwrap();

    assert_eq!(outcome.notifications.len(), 2);
    assert_eq!(outcome.changed, vec![p.identity()]);
    assert!(outcome.disposed.is_empty());
    assert_eq!(outcome.messages, vec!["person saved".to_string()]);
    assert_eq!(outcome.warnings, vec!["age changed".to_string()]);
    s.close().unwrap();
}

#[test]
fn new_session_does_not_see_previous_adapters() {
    let rt = runtime();
    let id = rt
        .in_session(Principal::new("ann"), |s| {
            s.transaction(|s| s.persist(Pojo::new(Person::new("ann", 30))))
                .map(|p| p.identity())
        })
        .unwrap();

    rt.in_session(Principal::new("bob"), |s| {
        assert!(matches!(
            s.lookup(&id.to_string()),
            Err(Error::ObjectNotFound(_))
        ));
        Ok(())
    })
    .unwrap();
}
