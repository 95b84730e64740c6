//! Session and runtime tests spanning several sessions

use std::sync::Arc;
use std::thread;

use causeway_core::{
    DomainObject, Error, Identity, Intent, Member, ObjectStore, Pojo, Principal, ResolveState,
    Specification, SpecificationCache,
};
use causeway_engine::{GhostPolicy, Loaded, Runtime, RuntimeConfig, SessionStack};
use serde_json::{json, Value as JsonValue};

#[derive(Default)]
struct Account {
    owner: String,
    balance: i64,
}

impl DomainObject for Account {
    fn type_name(&self) -> &str {
        "Account"
    }

    fn memento(&self) -> JsonValue {
        json!({ "owner": self.owner, "balance": self.balance })
    }

    fn restore(&mut self, memento: &JsonValue) {
        self.owner = memento["owner"].as_str().unwrap_or_default().to_string();
        self.balance = memento["balance"].as_i64().unwrap_or_default();
    }
}

fn runtime(config: RuntimeConfig) -> Runtime {
    let specs = SpecificationCache::new().with(
        Specification::new("Account")
            .with_member(Member::property("owner").read_only())
            .with_member(Member::property("balance"))
            .with_member(Member::action("close").requiring_role("teller")),
    );
    Runtime::in_memory(config, Arc::new(specs))
}

fn open_account(rt: &Runtime, owner: &str, balance: i64) -> Identity {
    rt.in_session(Principal::new(owner), |s| {
        s.transaction(|s| {
            s.persist(Pojo::new(Account {
                owner: owner.to_string(),
                balance,
            }))
        })
        .map(|a| a.identity())
    })
    .unwrap()
}

#[test]
fn ghost_resolves_from_other_sessions_commit() {
    let rt = runtime(RuntimeConfig::for_testing());
    let id = open_account(&rt, "ann", 10);

    let s = rt.open_session(Principal::new("bob"));
    let ghost = s
        .identity_map()
        .create_persistent_adapter(Pojo::new(Account::default()), id.clone(), None, Loaded::Ghost)
        .unwrap();
    assert_eq!(ghost.resolve_state(), ResolveState::Ghost);

    let balance = s.read(&ghost, |a: &Account| a.balance).unwrap();
    assert_eq!(balance, 10);
    assert_eq!(ghost.resolve_state(), ResolveState::Resolved);
    assert_eq!(ghost.version(), rt.store().load(&id).unwrap().map(|r| r.version));
}

#[test]
fn concurrent_sessions_conflict_on_same_object() {
    let rt = runtime(RuntimeConfig::for_testing());
    let id = open_account(&rt, "ann", 10);
    let version = rt.store().load(&id).unwrap().unwrap().version;

    let mut first = rt.open_session(Principal::new("ann"));
    let mut second = rt.open_session(Principal::new("bob"));
    let mut handles = Vec::new();
    for s in [&first, &second] {
        handles.push(
            s.identity_map()
                .create_persistent_adapter(
                    Pojo::new(Account::default()),
                    id.clone(),
                    Some(version.clone()),
                    Loaded::Ghost,
                )
                .unwrap(),
        );
    }

    first.start_transaction().unwrap();
    second.start_transaction().unwrap();
    first
        .update(&handles[0], Some(&version), |a: &mut Account| a.balance += 5)
        .unwrap();
    second
        .update(&handles[1], Some(&version), |a: &mut Account| a.balance -= 5)
        .unwrap();

    first.end_transaction().unwrap();
    let err = second.end_transaction().unwrap_err();
    assert!(matches!(err, Error::Concurrency { .. }));

    let stored = rt.store().load(&id).unwrap().unwrap();
    assert_eq!(stored.memento["balance"], json!(15));
    first.close().unwrap();
    second.close().unwrap();
}

#[test]
fn sessions_on_many_threads() {
    let rt = runtime(RuntimeConfig::for_testing());

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let rt = rt.clone();
            thread::spawn(move || {
                (0..10)
                    .map(|j| open_account(&rt, &format!("owner-{i}-{j}"), j))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<Identity> = workers
        .into_iter()
        .flat_map(|w| w.join().unwrap())
        .collect();
    let total = ids.len();
    ids.sort_by_key(|id| id.to_string());
    ids.dedup();
    assert_eq!(ids.len(), total);
    for id in &ids {
        assert!(rt.store().load(id).unwrap().is_some());
    }
}

#[test]
fn lazy_policy_hands_out_ghosts() {
    let rt = runtime(RuntimeConfig::for_testing().with_ghost_policy(GhostPolicy::Lazy));
    let id = open_account(&rt, "ann", 3);

    let s = rt.open_session(Principal::new("bob"));
    s.identity_map()
        .create_persistent_adapter(Pojo::new(Account::default()), id.clone(), None, Loaded::Ghost)
        .unwrap();

    let adapter = s.lookup(&id.to_string()).unwrap();
    assert_eq!(adapter.resolve_state(), ResolveState::Ghost);
    assert_eq!(s.read(&adapter, |a: &Account| a.owner.clone()).unwrap(), "ann");
}

#[test]
fn access_checks_follow_principal_roles() {
    let rt = runtime(RuntimeConfig::for_testing());
    let s = rt.open_session(Principal::new("tina").with_role("teller"));
    let a = s.create_transient(Pojo::new(Account::default())).unwrap();

    assert!(s.ensure_access(&a, "close", Intent::Use).is_ok());
    let err = s.ensure_access(&a, "owner", Intent::Use).unwrap_err();
    assert_eq!(err.class().http_status(), 403);
}

#[test]
fn session_stack_over_runtime() {
    let rt = runtime(RuntimeConfig::for_testing());
    let mut stack = SessionStack::new(rt.clone());

    let outer = stack.open(Principal::new("outer"));
    let id = outer
        .transaction(|s| {
            s.persist(Pojo::new(Account {
                owner: "outer".into(),
                balance: 1,
            }))
        })
        .unwrap()
        .identity();

    let inner = stack.open(Principal::new("inner"));
    assert!(inner.identity_map().adapter_for(&id).is_none());
    stack.close_current().unwrap();

    assert!(stack.current().unwrap().identity_map().adapter_for(&id).is_some());
    stack.close_current().unwrap();
}
