//! Runtime type descriptors
//!
//! A [`Specification`] lists the members of one domain type. Discovering
//! members by introspection belongs to the metamodel loader; this module only
//! holds the result and the access checks every member kind shares.
//!
//! ## Member kinds
//!
//! | Kind       | Read-only flag | Meaning of `Intent::Use` |
//! |------------|----------------|--------------------------|
//! | Property   | yes            | modify the value         |
//! | Collection | yes            | add/remove elements      |
//! | Action     | no             | invoke                   |

use crate::adapter::ObjectAdapter;
use crate::error::{Error, Result};
use crate::principal::Principal;
use dashmap::DashMap;
use std::sync::Arc;

/// What the caller wants to do with a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Read or display
    View,
    /// Modify or invoke
    Use,
}

/// Outcome of an access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Consent {
    /// Access granted
    Allow,
    /// Access denied with a reason
    Veto(String),
}

impl Consent {
    /// True for [`Consent::Allow`]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Consent::Allow)
    }

    /// Turn a veto into [`Error::Vetoed`]
    pub fn into_result(self, member: &str) -> Result<()> {
        match self {
            Consent::Allow => Ok(()),
            Consent::Veto(reason) => Err(Error::Vetoed {
                member: member.to_string(),
                reason,
            }),
        }
    }
}

/// Fields shared by every member kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    /// Member identifier, unique within its specification
    pub id: String,
    /// Roles of which the principal must hold at least one (empty = anyone)
    pub roles: Vec<String>,
}

impl MemberInfo {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
        }
    }
}

/// One member of a domain type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    /// Scalar or reference field
    Property {
        /// Shared member fields
        info: MemberInfo,
        /// Disallows modification
        read_only: bool,
    },
    /// Multi-valued field
    Collection {
        /// Shared member fields
        info: MemberInfo,
        /// Disallows add/remove
        read_only: bool,
    },
    /// Invocable behavior
    Action {
        /// Shared member fields
        info: MemberInfo,
    },
}

impl Member {
    /// A modifiable property
    pub fn property(id: impl Into<String>) -> Self {
        Member::Property {
            info: MemberInfo::new(id),
            read_only: false,
        }
    }

    /// A modifiable collection
    pub fn collection(id: impl Into<String>) -> Self {
        Member::Collection {
            info: MemberInfo::new(id),
            read_only: false,
        }
    }

    /// An action
    pub fn action(id: impl Into<String>) -> Self {
        Member::Action {
            info: MemberInfo::new(id),
        }
    }

    /// Mark a property or collection read-only (no effect on actions)
    pub fn read_only(mut self) -> Self {
        match &mut self {
            Member::Property { read_only, .. } | Member::Collection { read_only, .. } => {
                *read_only = true
            }
            Member::Action { .. } => {}
        }
        self
    }

    /// Require one of the given roles
    pub fn requiring_role(mut self, role: impl Into<String>) -> Self {
        self.info_mut().roles.push(role.into());
        self
    }

    /// Shared member fields
    pub fn info(&self) -> &MemberInfo {
        match self {
            Member::Property { info, .. }
            | Member::Collection { info, .. }
            | Member::Action { info } => info,
        }
    }

    fn info_mut(&mut self) -> &mut MemberInfo {
        match self {
            Member::Property { info, .. }
            | Member::Collection { info, .. }
            | Member::Action { info } => info,
        }
    }

    /// Member identifier
    pub fn id(&self) -> &str {
        &self.info().id
    }

    /// Visibility, usability and validity in one check
    pub fn check_access(
        &self,
        principal: &Principal,
        adapter: &ObjectAdapter,
        intent: Intent,
    ) -> Consent {
        let info = self.info();
        if !info.roles.is_empty() && !info.roles.iter().any(|r| principal.has_role(r)) {
            return Consent::Veto(format!("{} lacks a required role", principal.name()));
        }

        if adapter.resolve_state().is_destroyed() {
            return Consent::Veto(format!("{} has been deleted", adapter.identity()));
        }

        if intent == Intent::Use {
            match self {
                Member::Property { read_only: true, .. }
                | Member::Collection { read_only: true, .. } => {
                    return Consent::Veto("read-only".to_string());
                }
                _ if adapter.resolve_state().is_value() => {
                    return Consent::Veto("value objects are immutable".to_string());
                }
                _ => {}
            }
        }

        Consent::Allow
    }
}

/// Runtime descriptor of one domain type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specification {
    type_name: String,
    members: Vec<Member>,
}

impl Specification {
    /// Empty specification for a type
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            members: Vec::new(),
        }
    }

    /// Add a member
    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    /// Type discriminator
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// All members in declaration order
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Look up a member by id
    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.id() == id)
    }

    /// Properties only
    pub fn properties(&self) -> impl Iterator<Item = &Member> {
        self.members
            .iter()
            .filter(|m| matches!(m, Member::Property { .. }))
    }

    /// Collections only
    pub fn collections(&self) -> impl Iterator<Item = &Member> {
        self.members
            .iter()
            .filter(|m| matches!(m, Member::Collection { .. }))
    }

    /// Actions only
    pub fn actions(&self) -> impl Iterator<Item = &Member> {
        self.members
            .iter()
            .filter(|m| matches!(m, Member::Action { .. }))
    }
}

/// Supplies specifications by type name
///
/// Implementations memoize; callers treat the returned specification as
/// immutable.
pub trait SpecificationLoader: Send + Sync {
    /// Load (or fetch the cached) specification for `type_name`
    fn load_specification(&self, type_name: &str) -> Result<Arc<Specification>>;
}

/// Memoizing loader backed by explicitly registered specifications
#[derive(Debug, Default)]
pub struct SpecificationCache {
    specs: DashMap<String, Arc<Specification>>,
}

impl SpecificationCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a specification
    pub fn register(&self, spec: Specification) -> Arc<Specification> {
        let spec = Arc::new(spec);
        self.specs
            .insert(spec.type_name().to_string(), Arc::clone(&spec));
        spec
    }

    /// Builder-style registration
    pub fn with(self, spec: Specification) -> Self {
        self.register(spec);
        self
    }

    /// Number of cached specifications
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl SpecificationLoader for SpecificationCache {
    fn load_specification(&self, type_name: &str) -> Result<Arc<Specification>> {
        self.specs
            .get(type_name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::UnknownSpecification(type_name.to_string()))
    }
}
