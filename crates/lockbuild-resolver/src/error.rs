use lockbuild_lock::{PackageKey, UnsupportedRequirement};
use lockbuild_normalize::GroupName;
use lockbuild_pep508::Pep508Error;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A requirement names a package the lockfile doesn't contain.
    #[error(
        "`{package}` is required by {} but missing from the lockfile, which may be outdated",
        required_by.as_ref().map_or_else(|| format!("group `{group}`"), |parent| format!("`{parent}`"))
    )]
    MissingPackage {
        package: PackageKey,
        group: GroupName,
        required_by: Option<PackageKey>,
    },
    #[error("Failed to parse a requirement of locked package `{package}`")]
    InvalidRequirement {
        package: String,
        #[source]
        err: Pep508Error,
    },
    #[error("Failed to lock group `{group}`")]
    Unsupported {
        group: GroupName,
        #[source]
        err: UnsupportedRequirement,
    },
}
