use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use lockbuild_normalize::GroupName;

/// An entry of a PEP 735 `[dependency-groups]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DependencyGroupSpecifier {
    /// A PEP 508-compatible requirement string.
    Requirement(String),
    /// A reference to another dependency group.
    IncludeGroup {
        #[serde(rename = "include-group")]
        include_group: GroupName,
    },
}

#[derive(Debug, Error)]
pub enum DependencyGroupError {
    #[error("Failed to find group `{0}` included by `{1}`")]
    GroupNotFound(GroupName, GroupName),
    #[error("Detected a cycle in `dependency-groups`: {}", format_cycle(.0))]
    Cycle(Vec<GroupName>),
}

fn format_cycle(groups: &[GroupName]) -> String {
    let mut cycle = groups
        .iter()
        .map(|group| format!("`{group}`"))
        .collect::<Vec<_>>();
    if let Some(first) = groups.first() {
        cycle.push(format!("`{first}`"));
    }
    cycle.join(" -> ")
}

/// Returns the requirements of a dependency group, with any `include-group` entries expanded.
pub(crate) fn flatten_group(
    groups: &IndexMap<GroupName, Vec<DependencyGroupSpecifier>>,
    name: &GroupName,
) -> Result<Vec<String>, DependencyGroupError> {
    fn resolve_group<'data>(
        groups: &'data IndexMap<GroupName, Vec<DependencyGroupSpecifier>>,
        name: &'data GroupName,
        parents: &mut Vec<&'data GroupName>,
        requirements: &mut Vec<String>,
    ) -> Result<(), DependencyGroupError> {
        // "Dependency Group Includes MUST NOT include cycles, and tools SHOULD report an error if
        // they detect a cycle."
        if let Some(start) = parents.iter().position(|parent| *parent == name) {
            return Err(DependencyGroupError::Cycle(
                parents[start..].iter().copied().cloned().collect(),
            ));
        }

        let Some(specifiers) = groups.get(name) else {
            let parent = parents.last().copied().unwrap_or(name);
            return Err(DependencyGroupError::GroupNotFound(
                name.clone(),
                parent.clone(),
            ));
        };

        parents.push(name);
        for specifier in specifiers {
            match specifier {
                DependencyGroupSpecifier::Requirement(requirement) => {
                    requirements.push(requirement.clone());
                }
                DependencyGroupSpecifier::IncludeGroup { include_group } => {
                    resolve_group(groups, include_group, parents, requirements)?;
                }
            }
        }
        parents.pop();

        Ok(())
    }

    let mut requirements = Vec::new();
    resolve_group(groups, name, &mut Vec::new(), &mut requirements)?;
    Ok(requirements)
}
