//! Shared fixtures for the end-to-end suites

#![allow(dead_code)]

use std::sync::Arc;

use causeway::{
    DomainObject, IdentityMap, InMemoryObjectStore, Principal, Runtime, RuntimeConfig,
    SequenceIdentityGenerator, SequenceVersionSource, Session, SessionOptions, Specification,
    SpecificationCache, TransactionManager,
};
use serde_json::{json, Value as JsonValue};

/// Plain entity used by every scenario
#[derive(Debug, Default)]
pub struct Person {
    pub name: String,
    pub age: u32,
}

impl Person {
    pub fn new(name: &str, age: u32) -> Self {
        Self {
            name: name.to_string(),
            age,
        }
    }
}

impl DomainObject for Person {
    fn type_name(&self) -> &str {
        "Person"
    }

    fn memento(&self) -> JsonValue {
        json!({ "name": self.name, "age": self.age })
    }

    fn restore(&mut self, memento: &JsonValue) {
        self.name = memento["name"].as_str().unwrap_or_default().to_string();
        self.age = memento["age"].as_u64().unwrap_or_default() as u32;
    }
}

pub fn specifications() -> Arc<SpecificationCache> {
    Arc::new(SpecificationCache::new().with(Specification::new("Person")))
}

/// Session wired to deterministic collaborators, plus its store
pub fn session() -> (Session, Arc<InMemoryObjectStore>) {
    let store = Arc::new(InMemoryObjectStore::new());
    let versions = Arc::new(SequenceVersionSource::new(0));
    let map = IdentityMap::new(
        Arc::new(SequenceIdentityGenerator::new()),
        versions.clone(),
        specifications(),
    );
    let txns = TransactionManager::standalone(store.clone(), versions);
    let session = Session::open(Principal::new("tester"), map, txns, SessionOptions::default());
    (session, store)
}

pub fn runtime() -> Runtime {
    Runtime::in_memory(RuntimeConfig::for_testing(), specifications())
}
