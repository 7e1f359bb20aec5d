use std::collections::{BTreeMap, VecDeque};

use rustc_hash::FxHashSet;
use tracing::{debug, instrument, trace};

use lockbuild_lock::{Lock, PackageKey};
use lockbuild_normalize::GroupName;
use lockbuild_pep508::Requirement;

use crate::{
    LockedGroup, LockedGroupResolver, OnUnsupported, ResolveError, ResolvedGroup, push_specifier,
};

/// Resolves a group by walking the lockfile's dependency graph from the group's direct
/// requirements.
///
/// No versions are chosen and no markers are evaluated: every locked entry matching a required
/// package is included, so a cross-platform lock yields the packages for every platform.
#[derive(Debug)]
pub struct GraphResolver<'lock> {
    lock: &'lock Lock,
    roots: &'lock BTreeMap<GroupName, Vec<Requirement>>,
    on_unsupported: OnUnsupported,
}

impl<'lock> GraphResolver<'lock> {
    pub fn new(
        lock: &'lock Lock,
        roots: &'lock BTreeMap<GroupName, Vec<Requirement>>,
        on_unsupported: OnUnsupported,
    ) -> Self {
        Self {
            lock,
            roots,
            on_unsupported,
        }
    }
}

impl LockedGroupResolver for GraphResolver<'_> {
    #[instrument(skip_all, fields(group = %group))]
    fn resolve(&self, group: &GroupName) -> Result<LockedGroup, ResolveError> {
        if !self.lock.has_group(group) {
            debug!("Group `{group}` is not recorded in the lockfile");
            return Ok(LockedGroup::NotLocked);
        }

        let mut queue: VecDeque<(PackageKey, Option<PackageKey>)> = self
            .roots
            .get(group)
            .into_iter()
            .flatten()
            .map(|requirement| (PackageKey::from_requirement(requirement), None))
            .collect();
        let mut seen = FxHashSet::default();
        let mut resolved = ResolvedGroup::default();

        while let Some((key, required_by)) = queue.pop_front() {
            if !seen.insert(key.clone()) {
                continue;
            }

            let mut packages: Vec<_> = self.lock.find(&key).collect();
            if !key.extras.is_empty() {
                let bare = key.without_extras();
                if packages.is_empty() {
                    // The lockfile has no separate entry for these extras.
                    trace!("No entry for `{key}`, falling back to `{bare}`");
                    if !seen.insert(bare.clone()) {
                        continue;
                    }
                    packages = self.lock.find(&bare).collect();
                } else {
                    // Installing a package with extras also installs the package itself.
                    queue.push_back((bare, Some(key.clone())));
                }
            }

            if packages.is_empty() {
                return Err(ResolveError::MissingPackage {
                    package: key,
                    group: group.clone(),
                    required_by,
                });
            }

            for package in packages {
                push_specifier(&mut resolved, package, group, self.on_unsupported)?;
                for requirement in package.requirements() {
                    let requirement =
                        requirement.map_err(|err| ResolveError::InvalidRequirement {
                            package: package.to_string(),
                            err,
                        })?;
                    queue.push_back((
                        PackageKey::from_requirement(&requirement),
                        Some(key.clone()),
                    ));
                }
            }
        }

        debug!(
            "Found {} locked requirement(s) for group `{group}`",
            resolved.specifiers.len()
        );
        Ok(LockedGroup::Resolved(resolved))
    }
}
