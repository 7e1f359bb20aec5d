use std::fmt;
use std::path::Path;

use toml::Table;
use tracing::{debug, instrument};

use lockbuild_static::{EnvVars, read_boolish};

use crate::{Error, LockedMetadata, apply_locked_metadata};

/// A build backend whose metadata hook adds the locked dependency groups.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BuildBackend {
    /// `pdm-backend`, which runs the hook when `tool.pdm.build.locked` is set or
    /// `PDM_BUILD_LOCKED` is truthy.
    #[default]
    Pdm,
    /// `hatchling`, which runs the hook whenever the project registers it.
    Hatchling,
}

impl BuildBackend {
    /// Returns `true` if the backend should add locked groups to the metadata, given the
    /// project's `tool.pdm.build.locked` setting.
    pub fn is_enabled(self, config_locked: bool) -> bool {
        match self {
            // A falsy `PDM_BUILD_LOCKED` doesn't override the project's configuration.
            Self::Pdm => read_boolish(EnvVars::PDM_BUILD_LOCKED) == Some(true) || config_locked,
            Self::Hatchling => true,
        }
    }

    /// Run the backend's metadata hook on the `[project]` table of the project at `root`.
    #[instrument(skip_all, fields(backend = %self))]
    pub fn update_metadata(self, metadata: &mut Table, root: &Path) -> Result<LockedMetadata, Error> {
        debug!("Adding locked groups to the metadata of `{}`", root.display());
        apply_locked_metadata(metadata, root)
    }
}

impl fmt::Display for BuildBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdm => f.write_str("pdm-backend"),
            Self::Hatchling => f.write_str("hatchling"),
        }
    }
}
