use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::debug;

use lockbuild_normalize::{ExtraName, GroupName, PackageName};
use lockbuild_pep508::{Pep508Error, Requirement};

/// The lock strategy under which every package records the groups it belongs to.
pub const INHERIT_METADATA: &str = "inherit_metadata";

/// A parsed `pdm.lock`.
#[derive(Clone, Debug, Deserialize)]
#[serde(from = "LockWire")]
pub struct Lock {
    /// The strategies the lockfile was produced with, e.g. `cross_platform`, `inherit_metadata`.
    strategy: Vec<String>,
    /// The dependency groups that were locked.
    groups: Vec<GroupName>,
    packages: Vec<Package>,
    /// A map from package identity to the indices of the matching entries in `packages`.
    ///
    /// A cross-platform lock may hold several entries for the same identity, e.g. one version of
    /// `numpy` per supported Python range.
    by_key: FxHashMap<PackageKey, Vec<usize>>,
}

impl Lock {
    fn new(strategy: Vec<String>, groups: Vec<GroupName>, packages: Vec<Package>) -> Self {
        let mut by_key: FxHashMap<PackageKey, Vec<usize>> = FxHashMap::default();
        for (index, package) in packages.iter().enumerate() {
            if let Some(key) = package.key() {
                by_key.entry(key).or_default().push(index);
            }
        }
        Self {
            strategy,
            groups,
            packages,
            by_key,
        }
    }

    /// Read the lockfile at the given path.
    ///
    /// Returns `Ok(None)` if the file doesn't exist.
    pub fn read(path: &Path) -> Result<Option<Self>, LockError> {
        let content = match fs_err::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("No lockfile found at: `{}`", path.display());
                return Ok(None);
            }
            Err(err) => return Err(LockErrorKind::Io(err).into()),
        };
        let lock = toml::from_str(&content).map_err(|err| LockErrorKind::Toml {
            path: path.to_path_buf(),
            err,
        })?;
        Ok(Some(lock))
    }

    /// Returns `true` if every package records the groups it belongs to, i.e. the lockfile was
    /// produced with the `inherit_metadata` strategy.
    pub fn supports_inherit_metadata(&self) -> bool {
        self.strategy.iter().any(|strategy| strategy == INHERIT_METADATA)
    }

    /// The strategies the lockfile was produced with.
    pub fn strategy(&self) -> &[String] {
        &self.strategy
    }

    /// The dependency groups recorded in the lockfile.
    pub fn groups(&self) -> &[GroupName] {
        &self.groups
    }

    /// Returns `true` if the group was locked.
    pub fn has_group(&self, group: &GroupName) -> bool {
        self.groups.contains(group)
    }

    /// The locked packages, in file order.
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Returns every package entry with the given identity.
    pub fn find<'lock>(
        &'lock self,
        key: &PackageKey,
    ) -> impl Iterator<Item = &'lock Package> + use<'lock> {
        self.by_key
            .get(key)
            .into_iter()
            .flatten()
            .map(|index| &self.packages[*index])
    }

    /// Returns `true` if at least one package entry has the given identity.
    pub fn contains(&self, key: &PackageKey) -> bool {
        self.by_key.contains_key(key)
    }
}

/// The identity of a locked package: its normalized name and its sorted, normalized extras.
///
/// Older lockfiles record a package installed with extras (`requests[socks]`) as a separate entry
/// from the bare package.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageKey {
    pub name: PackageName,
    pub extras: Vec<ExtraName>,
}

impl PackageKey {
    pub fn new(name: PackageName, mut extras: Vec<ExtraName>) -> Self {
        extras.sort_unstable();
        extras.dedup();
        Self { name, extras }
    }

    /// The identity of a requirement, ignoring its version and marker.
    pub fn from_requirement(requirement: &Requirement) -> Self {
        Self::new(requirement.name.clone(), requirement.extras.clone())
    }

    /// Returns the same identity without extras.
    #[must_use]
    pub fn without_extras(&self) -> Self {
        Self {
            name: self.name.clone(),
            extras: Vec::new(),
        }
    }
}

impl Display for PackageKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[")?;
            for (index, extra) in self.extras.iter().enumerate() {
                if index > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{extra}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// A `[[package]]` entry in the lockfile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Package {
    /// The package name, as written in the lockfile.
    pub(crate) name: Option<String>,
    pub(crate) version: Option<String>,
    /// The extras the package is installed with, as written in the lockfile.
    pub(crate) extras: Vec<String>,
    /// The groups the package belongs to (`inherit_metadata` lockfiles only).
    pub(crate) groups: Vec<GroupName>,
    pub(crate) marker: Option<String>,
    pub(crate) source: Source,
    pub(crate) subdirectory: Option<String>,
    pub(crate) editable: bool,
    pub(crate) path: Option<String>,
    /// The requirements of this package, as PEP 508 strings.
    pub(crate) dependencies: Vec<String>,
}

impl Package {
    /// The package name, as written in the lockfile.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The normalized package name, if present and valid.
    pub fn package_name(&self) -> Option<PackageName> {
        PackageName::from_str(self.name.as_deref()?).ok()
    }

    /// The identity of this package, if it has a valid name.
    ///
    /// Extras that aren't valid names are dropped from the identity.
    pub fn key(&self) -> Option<PackageKey> {
        let name = self.package_name()?;
        let extras = self
            .extras
            .iter()
            .filter_map(|extra| ExtraName::from_str(extra).ok())
            .collect();
        Some(PackageKey::new(name, extras))
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn extras(&self) -> &[String] {
        &self.extras
    }

    pub fn groups(&self) -> &[GroupName] {
        &self.groups
    }

    /// Returns `true` if the package belongs to the given group.
    pub fn in_group(&self, group: &GroupName) -> bool {
        self.groups.contains(group)
    }

    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn subdirectory(&self) -> Option<&str> {
        self.subdirectory.as_deref()
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The requirements of this package, as written in the lockfile.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Parse the requirements of this package.
    pub fn requirements(&self) -> impl Iterator<Item = Result<Requirement, Pep508Error>> + '_ {
        self.dependencies
            .iter()
            .map(|dependency| Requirement::from_str(dependency))
    }
}

impl Display for Package {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name.as_deref().unwrap_or("<unnamed>"))?;
        if let Some(version) = &self.version {
            write!(f, "=={version}")?;
        }
        Ok(())
    }
}

/// A version control system supported in direct references.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VcsKind {
    Git,
    Svn,
    Bzr,
    Hg,
}

impl Display for VcsKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Git => f.write_str("git"),
            Self::Svn => f.write_str("svn"),
            Self::Bzr => f.write_str("bzr"),
            Self::Hg => f.write_str("hg"),
        }
    }
}

/// Where a locked package comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// A package index; the version pins the package.
    Registry,
    /// A direct URL to an archive.
    DirectUrl { url: String },
    /// A version control repository.
    Vcs {
        kind: VcsKind,
        repository: String,
        /// The requested reference, e.g. a branch or tag.
        reference: Option<String>,
        /// The resolved revision, e.g. a commit hash.
        revision: Option<String>,
    },
}

#[derive(Clone, Debug, Default, Deserialize)]
struct MetadataWire {
    #[serde(default)]
    groups: Vec<GroupName>,
    #[serde(default)]
    strategy: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct LockWire {
    #[serde(default)]
    metadata: MetadataWire,
    #[serde(default, rename = "package")]
    packages: Vec<PackageWire>,
}

impl From<LockWire> for Lock {
    fn from(wire: LockWire) -> Self {
        let packages = wire.packages.into_iter().map(Package::from).collect();
        Self::new(wire.metadata.strategy, wire.metadata.groups, packages)
    }
}

#[derive(Clone, Debug, Deserialize)]
struct PackageWire {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    extras: Vec<String>,
    #[serde(default)]
    groups: Vec<GroupName>,
    marker: Option<String>,
    url: Option<String>,
    git: Option<String>,
    svn: Option<String>,
    bzr: Option<String>,
    hg: Option<String>,
    #[serde(rename = "ref")]
    reference: Option<String>,
    revision: Option<String>,
    subdirectory: Option<String>,
    #[serde(default)]
    editable: bool,
    path: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
}

impl From<PackageWire> for Package {
    fn from(wire: PackageWire) -> Self {
        let vcs = [
            (VcsKind::Git, wire.git),
            (VcsKind::Svn, wire.svn),
            (VcsKind::Bzr, wire.bzr),
            (VcsKind::Hg, wire.hg),
        ]
        .into_iter()
        .find_map(|(kind, repository)| repository.map(|repository| (kind, repository)));

        let source = if let Some((kind, repository)) = vcs {
            Source::Vcs {
                kind,
                repository,
                reference: wire.reference.filter(|reference| !reference.is_empty()),
                revision: wire.revision.filter(|revision| !revision.is_empty()),
            }
        } else if let Some(url) = wire.url {
            Source::DirectUrl { url }
        } else {
            Source::Registry
        };

        Self {
            name: wire.name,
            version: wire.version.filter(|version| !version.is_empty()),
            extras: wire.extras,
            groups: wire.groups,
            marker: wire.marker.filter(|marker| !marker.trim().is_empty()),
            source,
            subdirectory: wire.subdirectory.filter(|subdirectory| !subdirectory.is_empty()),
            editable: wire.editable,
            path: wire.path,
            dependencies: wire.dependencies,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct LockError(Box<LockErrorKind>);

impl<E> From<E> for LockError
where
    LockErrorKind: From<E>,
{
    fn from(err: E) -> Self {
        Self(Box::new(LockErrorKind::from(err)))
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum LockErrorKind {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Failed to parse lockfile at: `{}`", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        err: toml::de::Error,
    },
}
