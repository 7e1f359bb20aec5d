use std::borrow::Borrow;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::InvalidNameError;

/// The group that holds a project's unconditional dependencies (`project.dependencies`).
pub const DEFAULT_GROUP: &str = "default";

/// The name of the locked counterpart of [`DEFAULT_GROUP`], and the suffix appended to every other
/// group's name to form its locked counterpart.
pub const LOCKED_SUFFIX: &str = "locked";

/// The name of a dependency group, as declared in `pyproject.toml` and recorded in `pdm.lock`.
///
/// Unlike package names, group names are compared verbatim: PDM records them exactly as they
/// are spelled in `project.optional-dependencies`, and the locked extras written back into the
/// metadata have to line up with those keys byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupName(String);

impl GroupName {
    /// Create a group name, rejecting empty names.
    pub fn new(name: String) -> Result<Self, InvalidNameError> {
        if name.trim().is_empty() {
            return Err(InvalidNameError(name));
        }
        Ok(Self(name))
    }

    /// The `default` group.
    pub fn default_group() -> Self {
        Self(DEFAULT_GROUP.to_string())
    }

    /// Returns `true` if this is the `default` group.
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_GROUP
    }

    /// Returns the name of the optional-dependency group that holds the locked counterpart of
    /// this group: `locked` for the `default` group, `{group}-locked` for any other.
    pub fn locked(&self) -> Self {
        if self.is_default() {
            Self(LOCKED_SUFFIX.to_string())
        } else {
            Self(format!("{}-{LOCKED_SUFFIX}", self.0))
        }
    }

    /// Returns the underlying group name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for GroupName {
    type Err = InvalidNameError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::new(name.to_string())
    }
}

impl<'de> Deserialize<'de> for GroupName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for GroupName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl Display for GroupName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for GroupName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for GroupName {
    fn borrow(&self) -> &str {
        &self.0
    }
}
