pub use lock::{Lock, LockError, Package, PackageKey, Source, VcsKind, INHERIT_METADATA};
pub use specifier::UnsupportedRequirement;

mod lock;
mod specifier;
