//! Reads the following fields from `pyproject.toml`:
//!
//! * `project.{name,dependencies,optional-dependencies,dynamic}`
//! * `dependency-groups`
//! * `tool.pdm.build.{locked,locked-groups}`
//! * `tool.pdm.dev-dependencies`
//! * `tool.pdm.version.source`

use std::collections::VecDeque;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use lockbuild_normalize::{ExtraName, GroupName, PackageName};
use lockbuild_pep508::{Pep508Error, Requirement};

use crate::dependency_groups::{DependencyGroupError, DependencyGroupSpecifier, flatten_group};

#[derive(Error, Debug)]
pub enum PyprojectTomlError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    TomlSyntax(#[from] toml::de::Error),
    #[error(
        "`pyproject.toml` is using the `[project]` table, but the required `project.name` field is not set"
    )]
    MissingName(#[source] toml::de::Error),
    #[error("Group `{0}` is not declared in `pyproject.toml`")]
    UnknownGroup(GroupName),
    #[error("Failed to parse entry in group `{group}`: `{requirement}`")]
    InvalidRequirement {
        group: GroupName,
        requirement: String,
        #[source]
        err: Box<Pep508Error>,
    },
    #[error("Failed to resolve dependency group `{group}`")]
    DependencyGroup {
        group: GroupName,
        #[source]
        err: DependencyGroupError,
    },
}

/// A `pyproject.toml` as specified in PEP 517.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct PyProjectToml {
    /// PEP 621-compliant project metadata.
    pub project: Option<Project>,
    /// PEP 735 dependency groups.
    pub dependency_groups: Option<IndexMap<GroupName, Vec<DependencyGroupSpecifier>>>,
    /// Tool-specific metadata.
    pub tool: Option<Tool>,
    /// The raw unserialized document.
    #[serde(skip)]
    pub raw: String,
}

impl PyProjectToml {
    /// Parse a `PyProjectToml` from a raw TOML string.
    pub fn from_string(raw: String) -> Result<Self, PyprojectTomlError> {
        let pyproject: Self = toml::from_str(&raw).map_err(|err| {
            if err.message().contains("missing field `name`") {
                PyprojectTomlError::MissingName(err)
            } else {
                PyprojectTomlError::TomlSyntax(err)
            }
        })?;
        Ok(Self { raw, ..pyproject })
    }

    /// Read the `pyproject.toml` at the given path.
    pub fn read(path: &Path) -> Result<Self, PyprojectTomlError> {
        debug!("Reading `{}`", path.display());
        Self::from_string(fs_err::read_to_string(path)?)
    }

    /// The project name, if the `[project]` table is present.
    pub fn project_name(&self) -> Option<&PackageName> {
        self.project.as_ref().map(|project| &project.name)
    }

    fn pdm(&self) -> Option<&ToolPdm> {
        self.tool.as_ref().and_then(|tool| tool.pdm.as_ref())
    }

    /// The groups declared in `project.optional-dependencies`, in declaration order.
    pub fn optional_groups(&self) -> impl Iterator<Item = &GroupName> {
        self.project
            .as_ref()
            .and_then(|project| project.optional_dependencies.as_ref())
            .into_iter()
            .flat_map(IndexMap::keys)
    }

    /// The development-only groups: `tool.pdm.dev-dependencies` and `dependency-groups`.
    pub fn dev_groups(&self) -> Vec<&GroupName> {
        let mut groups: Vec<&GroupName> = Vec::new();
        let pdm = self
            .pdm()
            .and_then(|pdm| pdm.dev_dependencies.as_ref())
            .into_iter()
            .flat_map(IndexMap::keys);
        let pep735 = self
            .dependency_groups
            .as_ref()
            .into_iter()
            .flat_map(IndexMap::keys);
        for group in pdm.chain(pep735) {
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        groups
    }

    /// Every group of the project: `default`, the optional groups, then the development groups.
    pub fn all_groups(&self) -> Vec<GroupName> {
        let mut groups = vec![GroupName::default_group()];
        for group in self.optional_groups().chain(self.dev_groups()) {
            if !groups.contains(group) {
                groups.push(group.clone());
            }
        }
        groups
    }

    /// The `tool.pdm.build.locked` setting.
    pub fn build_locked(&self) -> Option<bool> {
        self.pdm()
            .and_then(|pdm| pdm.build.as_ref())
            .and_then(|build| build.locked)
    }

    /// The `tool.pdm.build.locked-groups` setting.
    pub fn locked_groups(&self) -> Option<&[GroupName]> {
        self.pdm()
            .and_then(|pdm| pdm.build.as_ref())
            .and_then(|build| build.locked_groups.as_deref())
    }

    /// Returns `true` if the project version is derived from the source control system, in
    /// which case the working tree has to look clean during the build.
    pub fn uses_scm_version(&self) -> bool {
        self.pdm()
            .and_then(|pdm| pdm.version.as_ref())
            .and_then(|version| version.source.as_deref())
            == Some("scm")
    }

    /// Returns the direct requirements of a group.
    ///
    /// `default` is `project.dependencies`; any other group is looked up in
    /// `project.optional-dependencies`, `tool.pdm.dev-dependencies` and `dependency-groups`, in
    /// that order, with the development groups merged.
    ///
    /// A requirement on the project itself, such as `project[socks,test]`, is replaced by the
    /// requirements of the optional groups it names.
    pub fn group_requirements(
        &self,
        group: &GroupName,
    ) -> Result<Vec<Requirement>, PyprojectTomlError> {
        let mut requirements = Vec::new();
        let mut seen = vec![group.clone()];
        let mut queue = VecDeque::from([group.clone()]);
        while let Some(group) = queue.pop_front() {
            for requirement in self.declared_requirements(&group)? {
                if self.project_name() != Some(&requirement.name) {
                    requirements.push(requirement);
                    continue;
                }
                for extra in &requirement.extras {
                    let Some(included) = self.optional_group(extra) else {
                        debug!("Group `{group}` references unknown extra `{extra}` of the project");
                        continue;
                    };
                    if !seen.contains(included) {
                        seen.push(included.clone());
                        queue.push_back(included.clone());
                    }
                }
            }
        }
        Ok(requirements)
    }

    /// The optional group that provides `extra`.
    fn optional_group(&self, extra: &ExtraName) -> Option<&GroupName> {
        self.optional_groups()
            .find(|group| ExtraName::new(group.to_string()).is_ok_and(|name| name == *extra))
    }

    /// Returns the requirements of a group as written in `pyproject.toml`.
    fn declared_requirements(
        &self,
        group: &GroupName,
    ) -> Result<Vec<Requirement>, PyprojectTomlError> {
        let entries: Vec<String> = if group.is_default() {
            self.project
                .as_ref()
                .and_then(|project| project.dependencies.clone())
                .unwrap_or_default()
        } else if let Some(entries) = self
            .project
            .as_ref()
            .and_then(|project| project.optional_dependencies.as_ref())
            .and_then(|optional| optional.get(group))
        {
            entries.clone()
        } else {
            let pdm = self
                .pdm()
                .and_then(|pdm| pdm.dev_dependencies.as_ref())
                .and_then(|dev| dev.get(group));
            let pep735 = self
                .dependency_groups
                .as_ref()
                .filter(|groups| groups.contains_key(group))
                .map(|groups| flatten_group(groups, group))
                .transpose()
                .map_err(|err| PyprojectTomlError::DependencyGroup {
                    group: group.clone(),
                    err,
                })?;
            if pdm.is_none() && pep735.is_none() {
                return Err(PyprojectTomlError::UnknownGroup(group.clone()));
            }
            pdm.into_iter()
                .flatten()
                .cloned()
                .chain(pep735.into_iter().flatten())
                .collect()
        };

        entries
            .into_iter()
            .map(|requirement| {
                Requirement::from_str(&requirement).map_err(|err| {
                    PyprojectTomlError::InvalidRequirement {
                        group: group.clone(),
                        requirement,
                        err: Box::new(err),
                    }
                })
            })
            .collect()
    }
}

// Ignore raw document in comparison.
impl PartialEq for PyProjectToml {
    fn eq(&self, other: &Self) -> bool {
        self.project.eq(&other.project)
            && self.dependency_groups.eq(&other.dependency_groups)
            && self.tool.eq(&other.tool)
    }
}

impl Eq for PyProjectToml {}

/// PEP 621 project metadata (`project`).
///
/// See <https://packaging.python.org/en/latest/specifications/pyproject-toml>.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Project {
    /// The name of the project
    pub name: PackageName,
    /// The dependencies of the project.
    pub dependencies: Option<Vec<String>>,
    /// The optional dependencies of the project, keyed by the group name as written.
    pub optional_dependencies: Option<IndexMap<GroupName, Vec<String>>>,
    /// The fields that are computed by the build backend.
    pub dynamic: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    pub pdm: Option<ToolPdm>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ToolPdm {
    pub build: Option<PdmBuildSettings>,
    pub dev_dependencies: Option<IndexMap<GroupName, Vec<String>>>,
    pub version: Option<PdmVersionSettings>,
}

/// `tool.pdm.build`, which is shared with the build backend; unknown keys are ignored.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct PdmBuildSettings {
    /// Add locked dependency groups to the built distributions.
    pub locked: Option<bool>,
    /// The groups to lock, instead of every non-development group.
    pub locked_groups: Option<Vec<GroupName>>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PdmVersionSettings {
    /// Where the project version comes from, e.g. `scm` or `file`.
    pub source: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use indoc::indoc;
    use insta::assert_snapshot;

    use lockbuild_normalize::GroupName;

    use super::PyProjectToml;

    fn group(name: &str) -> GroupName {
        GroupName::from_str(name).unwrap()
    }

    const PYPROJECT: &str = indoc! {r#"
        [project]
        name = "simple-optional"
        version = "0.1.0"
        dependencies = ["requests>=2"]

        [project.optional-dependencies]
        socks = ["requests[socks]"]
        Extras = ["rich"]

        [dependency-groups]
        lint = ["ruff"]
        test = ["coverage", { include-group = "lint" }]

        [tool.pdm.dev-dependencies]
        test = ["pytest"]

        [tool.pdm.build]
        locked = true
        includes = ["src"]

        [tool.pdm.version]
        source = "scm"
    "#};

    #[test]
    fn settings() {
        let pyproject = PyProjectToml::from_string(PYPROJECT.to_string()).unwrap();
        assert_eq!(pyproject.project_name().unwrap().as_str(), "simple-optional");
        assert_eq!(pyproject.build_locked(), Some(true));
        assert_eq!(pyproject.locked_groups(), None);
        assert!(pyproject.uses_scm_version());
        assert_eq!(pyproject.raw, PYPROJECT);
    }

    #[test]
    fn groups() {
        let pyproject = PyProjectToml::from_string(PYPROJECT.to_string()).unwrap();
        let optional: Vec<_> = pyproject.optional_groups().map(GroupName::as_str).collect();
        assert_eq!(optional, ["socks", "Extras"]);
        let dev: Vec<_> = pyproject.dev_groups().into_iter().map(GroupName::as_str).collect();
        assert_eq!(dev, ["test", "lint"]);
        let all: Vec<_> = pyproject.all_groups().iter().map(ToString::to_string).collect();
        assert_eq!(all, ["default", "socks", "Extras", "test", "lint"]);
    }

    #[test]
    fn group_requirements() {
        let pyproject = PyProjectToml::from_string(PYPROJECT.to_string()).unwrap();
        let names = |group_name: &str| -> Vec<String> {
            pyproject
                .group_requirements(&group(group_name))
                .unwrap()
                .iter()
                .map(ToString::to_string)
                .collect()
        };
        assert_eq!(names("default"), ["requests>=2"]);
        assert_eq!(names("socks"), ["requests[socks]"]);
        assert_eq!(names("test"), ["pytest", "coverage", "ruff"]);

        let err = pyproject.group_requirements(&group("docs")).unwrap_err();
        assert_snapshot!(err, @"Group `docs` is not declared in `pyproject.toml`");
    }

    #[test]
    fn self_referencing_group() {
        let pyproject = PyProjectToml::from_string(
            indoc! {r#"
                [project]
                name = "Project"
                dependencies = ["requests"]

                [project.optional-dependencies]
                socks = ["pysocks"]
                Test_Extra = ["pytest", "project[socks]"]
                all = ["project[socks,test-extra,missing]", "rich"]
            "#}
            .to_string(),
        )
        .unwrap();
        let requirements: Vec<String> = pyproject
            .group_requirements(&group("all"))
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(requirements, ["rich", "pysocks", "pytest"]);
    }

    #[test]
    fn invalid_requirement() {
        let pyproject = PyProjectToml::from_string(
            indoc! {r#"
                [project]
                name = "project"

                [tool.pdm.dev-dependencies]
                dev = ["-e file:///${PROJECT_ROOT}/sub"]
            "#}
            .to_string(),
        )
        .unwrap();
        let err = pyproject.group_requirements(&group("dev")).unwrap_err();
        assert_snapshot!(err, @"Failed to parse entry in group `dev`: `-e file:///${PROJECT_ROOT}/sub`");
    }

    #[test]
    fn missing_name() {
        let err = PyProjectToml::from_string(
            indoc! {r#"
                [project]
                version = "0.1.0"
            "#}
            .to_string(),
        )
        .unwrap_err();
        assert_snapshot!(err, @"`pyproject.toml` is using the `[project]` table, but the required `project.name` field is not set");
    }

    #[test]
    fn no_project_table() {
        let pyproject = PyProjectToml::from_string(indoc! {r#"
            [tool.pdm.build]
            locked-groups = ["default", "socks"]
        "#}.to_string())
        .unwrap();
        assert_eq!(pyproject.project_name(), None);
        assert_eq!(
            pyproject.locked_groups(),
            Some([group("default"), group("socks")].as_slice())
        );
        assert!(!pyproject.uses_scm_version());
    }
}
