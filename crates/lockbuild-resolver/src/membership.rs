use tracing::{debug, instrument};

use lockbuild_lock::Lock;
use lockbuild_normalize::GroupName;

use crate::{
    LockedGroup, LockedGroupResolver, OnUnsupported, ResolveError, ResolvedGroup, push_specifier,
};

/// Resolves a group to the packages that the lockfile tags with it.
///
/// Requires a lockfile produced with the `inherit_metadata` strategy.
#[derive(Debug)]
pub struct MembershipResolver<'lock> {
    lock: &'lock Lock,
    on_unsupported: OnUnsupported,
}

impl<'lock> MembershipResolver<'lock> {
    pub fn new(lock: &'lock Lock, on_unsupported: OnUnsupported) -> Self {
        Self {
            lock,
            on_unsupported,
        }
    }
}

impl LockedGroupResolver for MembershipResolver<'_> {
    #[instrument(skip_all, fields(group = %group))]
    fn resolve(&self, group: &GroupName) -> Result<LockedGroup, ResolveError> {
        if !self.lock.has_group(group) {
            debug!("Group `{group}` is not recorded in the lockfile");
            return Ok(LockedGroup::NotLocked);
        }

        let mut resolved = ResolvedGroup::default();
        for package in self
            .lock
            .packages()
            .iter()
            .filter(|package| package.in_group(group))
        {
            push_specifier(&mut resolved, package, group, self.on_unsupported)?;
        }

        debug!(
            "Found {} locked requirement(s) for group `{group}`",
            resolved.specifiers.len()
        );
        Ok(LockedGroup::Resolved(resolved))
    }
}
