use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::debug;

use lockbuild_lock::{Lock, UnsupportedRequirement};
use lockbuild_normalize::GroupName;
use lockbuild_resolver::{LockedGroup, LockedGroupResolver, MembershipResolver, OnUnsupported};
use lockbuild_warnings::warn_user;

use crate::{Error, lockfile_path};

const OPTIONAL_DEPENDENCIES: &str = "optional-dependencies";
const DYNAMIC: &str = "dynamic";

/// What [`apply_locked_metadata`] did to the metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockedMetadata {
    /// There is no lockfile; the metadata is unchanged.
    MissingLockfile(PathBuf),
    /// The lockfile doesn't record group membership; the metadata is unchanged.
    UnsupportedStrategy(PathBuf),
    Applied(AppliedGroups),
}

/// The groups considered when adding locked groups to the metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedGroups {
    /// The locked groups that were added to `optional-dependencies`.
    pub added: Vec<GroupName>,
    /// The groups whose locked counterpart was already declared.
    pub existing: Vec<GroupName>,
    /// The groups that the lockfile doesn't record.
    pub not_locked: Vec<GroupName>,
    /// The groups for which no locked requirement was found.
    pub empty: Vec<GroupName>,
    /// The locked packages that were left out because they can't be expressed as requirements.
    pub skipped: Vec<UnsupportedRequirement>,
}

/// Add a locked counterpart of every dependency group to the `[project]` metadata, reading the
/// lockfile of the project at `root`.
///
/// The lockfile is `pdm.lock` in `root` unless `PDM_LOCKFILE` is set.
pub fn apply_locked_metadata(metadata: &mut Table, root: &Path) -> Result<LockedMetadata, Error> {
    apply_with_lockfile(metadata, &lockfile_path(root))
}

/// Add a locked counterpart of every dependency group to the `[project]` metadata.
///
/// The `default` group (`dependencies`) becomes `locked`, every optional group `{group}` becomes
/// `{group}-locked`. Groups the user already declared are never overwritten, so applying this
/// twice has the same effect as applying it once. Groups without any locked requirement are
/// left out. A field that didn't exist before is removed from `dynamic`, as a field can't be
/// both static and dynamic.
pub fn apply_with_lockfile(metadata: &mut Table, lockfile: &Path) -> Result<LockedMetadata, Error> {
    let Some(lock) = Lock::read(lockfile)? else {
        warn_user!("The lockfile doesn't exist, skip locking dependencies");
        return Ok(LockedMetadata::MissingLockfile(lockfile.to_path_buf()));
    };

    if !lock.supports_inherit_metadata() {
        warn_user!(
            "The lockfile doesn't support 'inherit_metadata' strategy, skip locking dependencies"
        );
        return Ok(LockedMetadata::UnsupportedStrategy(lockfile.to_path_buf()));
    }

    let declared = declared_groups(metadata)?;
    let mut groups = vec![GroupName::default_group()];
    groups.extend(declared.iter().cloned());

    let resolver = MembershipResolver::new(&lock, OnUnsupported::Skip);
    let mut applied = AppliedGroups::default();
    let mut locked_groups = BTreeMap::new();

    for group in groups {
        let locked = group.locked();
        if declared.contains(&locked) {
            debug!("Locked group `{locked}` already exists, skipping `{group}`");
            applied.existing.push(group);
            continue;
        }

        match resolver.resolve(&group)? {
            LockedGroup::NotLocked => {
                applied.not_locked.push(group);
            }
            LockedGroup::Resolved(resolved) => {
                applied.skipped.extend(resolved.skipped);
                if resolved.specifiers.is_empty() {
                    debug!("No locked requirements for group `{group}`");
                    applied.empty.push(group);
                } else {
                    locked_groups.insert(locked, resolved.specifiers);
                }
            }
        }
    }

    if locked_groups.is_empty() {
        return Ok(LockedMetadata::Applied(applied));
    }

    let static_fields: Vec<String> = metadata.keys().cloned().collect();
    let optional_dependencies = metadata
        .entry(OPTIONAL_DEPENDENCIES)
        .or_insert(Value::Table(Table::new()))
        .as_table_mut()
        .ok_or(Error::MalformedMetadata(OPTIONAL_DEPENDENCIES, "table"))?;
    for (locked, specifiers) in locked_groups {
        optional_dependencies.insert(
            locked.to_string(),
            Value::Array(specifiers.into_iter().map(Value::String).collect()),
        );
        applied.added.push(locked);
    }

    let new_fields: Vec<String> = metadata
        .keys()
        .filter(|field| !static_fields.contains(field))
        .cloned()
        .collect();
    if !new_fields.is_empty() {
        if let Some(dynamic) = metadata.get_mut(DYNAMIC) {
            dynamic
                .as_array_mut()
                .ok_or(Error::MalformedMetadata(DYNAMIC, "list"))?
                .retain(|field| {
                    field
                        .as_str()
                        .is_none_or(|field| !new_fields.iter().any(|new| new == field))
                });
        }
    }

    Ok(LockedMetadata::Applied(applied))
}

/// The groups declared in `optional-dependencies`.
fn declared_groups(metadata: &Table) -> Result<Vec<GroupName>, Error> {
    let Some(optional_dependencies) = metadata.get(OPTIONAL_DEPENDENCIES) else {
        return Ok(Vec::new());
    };
    let optional_dependencies = optional_dependencies
        .as_table()
        .ok_or(Error::MalformedMetadata(OPTIONAL_DEPENDENCIES, "table"))?;
    Ok(optional_dependencies
        .keys()
        .filter_map(|group| GroupName::new(group.clone()).ok())
        .collect())
}
