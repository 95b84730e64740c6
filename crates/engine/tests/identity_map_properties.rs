//! Property-based tests for identity-map uniqueness across create and remap.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use causeway_concurrency::SequenceVersionSource;
use causeway_core::{DomainObject, Pojo, Specification, SpecificationCache};
use causeway_engine::{IdentityMap, SequenceIdentityGenerator};

struct Item;

impl DomainObject for Item {
    fn type_name(&self) -> &str {
        "Item"
    }
}

fn map() -> IdentityMap {
    IdentityMap::new(
        Arc::new(SequenceIdentityGenerator::new()),
        Arc::new(SequenceVersionSource::new(0)),
        Arc::new(SpecificationCache::new().with(Specification::new("Item"))),
    )
}

proptest! {
    /// Any interleaving of creates and remaps keeps exactly one adapter per identity.
    #[test]
    fn one_adapter_per_identity(remaps in prop::collection::vec(any::<bool>(), 1..40)) {
        let map = map();
        for remap in &remaps {
            let adapter = map.create_transient_adapter(Pojo::new(Item)).unwrap();
            if *remap {
                map.remap_as_persistent(&adapter).unwrap();
                prop_assert!(adapter.identity().is_persistent());
            }
            let found = map.adapter_for(&adapter.identity()).unwrap();
            prop_assert!(Arc::ptr_eq(&found, &adapter));
        }

        prop_assert_eq!(map.len(), remaps.len());
        let identities: HashSet<_> = map.adapters().iter().map(|a| a.identity()).collect();
        prop_assert_eq!(identities.len(), remaps.len());
        let persistent = identities.iter().filter(|i| i.is_persistent()).count();
        prop_assert_eq!(persistent, remaps.iter().filter(|r| **r).count());
    }

    /// A remapped adapter is no longer reachable under its transient identity.
    #[test]
    fn remap_retires_transient_identity(count in 1usize..20) {
        let map = map();
        for _ in 0..count {
            let adapter = map.create_transient_adapter(Pojo::new(Item)).unwrap();
            let old = adapter.identity();
            map.remap_as_persistent(&adapter).unwrap();
            prop_assert!(map.adapter_for(&old).is_none());
            prop_assert!(adapter.version().is_some());
        }
        prop_assert_eq!(map.len(), count);
    }
}
