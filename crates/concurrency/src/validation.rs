//! Optimistic lock checks
//!
//! `check_lock` is an admission test, not a lock: it never blocks. It
//! rejects a write whose author read the object at a version that has since
//! been superseded. Serializing writers is the transaction's job; the check
//! only catches a version that went stale before the writer acted.

use causeway_core::{AdapterRef, Error, Result, Version};

/// Fail with [`Error::Concurrency`] if `supplied` differs from the adapter's version
///
/// Transient adapters have no version and cannot be lock-checked.
pub fn check_lock(adapter: &AdapterRef, supplied: &Version) -> Result<()> {
    let current = adapter.version().ok_or_else(|| {
        Error::illegal_state(format!("{} has no version to check", adapter.identity()))
    })?;

    if current.different(supplied) {
        let identity = adapter.identity();
        tracing::warn!(
            target: "causeway::txn",
            identity = %identity,
            supplied = %supplied,
            current = %current,
            "Stale version rejected"
        );
        return Err(Error::Concurrency {
            identity,
            supplied: supplied.clone(),
            current,
        });
    }
    Ok(())
}

/// Like [`check_lock`] but passes when no version was supplied
pub fn check_lock_opt(adapter: &AdapterRef, supplied: Option<&Version>) -> Result<()> {
    match supplied {
        Some(v) => check_lock(adapter, v),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causeway_core::{
        DomainObject, Identity, ObjectAdapter, Pojo, ResolveState, Specification,
    };
    use std::sync::Arc;

    struct Doc;

    impl DomainObject for Doc {
        fn type_name(&self) -> &str {
            "Doc"
        }
    }

    fn adapter(version: Option<u64>, state: ResolveState, identity: Identity) -> AdapterRef {
        ObjectAdapter::new(
            Pojo::new(Doc),
            identity,
            Arc::new(Specification::new("Doc")),
            state,
            version.map(Version::new),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_matching_version_passes() {
        let a = adapter(Some(3), ResolveState::Resolved, Identity::persistent("Doc", 1u64));
        assert!(check_lock(&a, &Version::new(3)).is_ok());
    }

    #[test]
    fn test_stale_version_conflicts() {
        let a = adapter(Some(3), ResolveState::Resolved, Identity::persistent("Doc", 1u64));
        let err = check_lock(&a, &Version::new(2)).unwrap_err();
        match err {
            Error::Concurrency {
                identity,
                supplied,
                current,
            } => {
                assert_eq!(identity, Identity::persistent("Doc", 1u64));
                assert_eq!(supplied, Version::new(2));
                assert_eq!(current, Version::new(3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_transient_cannot_be_checked() {
        let a = adapter(None, ResolveState::Transient, Identity::transient("Doc", 1u64));
        assert!(matches!(
            check_lock(&a, &Version::new(1)),
            Err(Error::IllegalState(_))
        ));
    }

    #[test]
    fn test_optional_supplied() {
        let a = adapter(Some(3), ResolveState::Resolved, Identity::persistent("Doc", 1u64));
        assert!(check_lock_opt(&a, None).is_ok());
        assert!(check_lock_opt(&a, Some(&Version::new(1))).is_err());
    }
}
