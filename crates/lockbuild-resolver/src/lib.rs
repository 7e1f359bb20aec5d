//! Collect the locked requirements of a dependency group.
//!
//! Lockfiles produced with the `inherit_metadata` strategy record, for every package, the groups
//! it belongs to, so a group is simply the packages tagged with it ([`MembershipResolver`]).
//! Older lockfiles only record the requirements of each package, so a group has to be expanded
//! from the project's own requirements by walking the dependency graph ([`GraphResolver`]).

use std::collections::BTreeMap;

use lockbuild_lock::{Lock, UnsupportedRequirement};
use lockbuild_normalize::GroupName;
use lockbuild_pep508::Requirement;

pub use error::ResolveError;
pub use graph::GraphResolver;
pub use membership::MembershipResolver;

mod error;
mod graph;
mod membership;

/// What to do with a locked package that can't be expressed as a requirement.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OnUnsupported {
    /// Leave the package out of the group and record it in [`ResolvedGroup::skipped`].
    #[default]
    Skip,
    /// Fail the group.
    Error,
}

/// The locked requirements of a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedGroup {
    /// The pinned requirements, in the order they were found.
    pub specifiers: Vec<String>,
    /// The packages that were left out under [`OnUnsupported::Skip`].
    pub skipped: Vec<UnsupportedRequirement>,
}

/// The outcome of resolving a single group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockedGroup {
    /// The group isn't recorded in the lockfile.
    NotLocked,
    Resolved(ResolvedGroup),
}

/// Produces the locked requirements of a dependency group.
pub trait LockedGroupResolver {
    fn resolve(&self, group: &GroupName) -> Result<LockedGroup, ResolveError>;
}

/// The way a lockfile associates packages with groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Every package lists its groups.
    MembershipTagged,
    /// Groups have to be expanded from the project's requirements.
    GraphTraversal,
}

impl LockMode {
    pub fn of(lock: &Lock) -> Self {
        if lock.supports_inherit_metadata() {
            Self::MembershipTagged
        } else {
            Self::GraphTraversal
        }
    }
}

/// Returns the resolver suited to the lockfile.
///
/// `roots` holds the direct requirements of each group, as declared by the project; they're only
/// consulted for lockfiles without group membership.
pub fn resolver_for<'lock>(
    lock: &'lock Lock,
    roots: &'lock BTreeMap<GroupName, Vec<Requirement>>,
    on_unsupported: OnUnsupported,
) -> Box<dyn LockedGroupResolver + 'lock> {
    match LockMode::of(lock) {
        LockMode::MembershipTagged => Box::new(MembershipResolver::new(lock, on_unsupported)),
        LockMode::GraphTraversal => Box::new(GraphResolver::new(lock, roots, on_unsupported)),
    }
}

/// Convert a locked package and apply the unsupported-package policy.
fn push_specifier(
    resolved: &mut ResolvedGroup,
    package: &lockbuild_lock::Package,
    group: &GroupName,
    on_unsupported: OnUnsupported,
) -> Result<(), ResolveError> {
    match package.to_specifier() {
        Ok(specifier) => resolved.specifiers.push(specifier),
        Err(err) => match on_unsupported {
            OnUnsupported::Skip => {
                tracing::debug!("Skipping unsupported requirement in group `{group}`: {err}");
                resolved.skipped.push(err);
            }
            OnUnsupported::Error => {
                return Err(ResolveError::Unsupported {
                    group: group.clone(),
                    err,
                });
            }
        },
    }
    Ok(())
}
