pub use dependency_groups::{DependencyGroupError, DependencyGroupSpecifier};
pub use pyproject::{
    PdmBuildSettings, PdmVersionSettings, Project, PyProjectToml, PyprojectTomlError, Tool,
    ToolPdm,
};
pub use pyproject_mut::{Error as PyProjectTomlMutError, PyProjectTomlMut};

mod dependency_groups;
mod pyproject;
mod pyproject_mut;
