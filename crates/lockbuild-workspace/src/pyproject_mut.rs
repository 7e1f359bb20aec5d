use std::fmt;

use thiserror::Error;
use toml_edit::{Array, DocumentMut, Item, Table, TomlError, Value};

use lockbuild_normalize::GroupName;

use crate::pyproject::PyProjectToml;

/// Raw and mutable representation of a `pyproject.toml`.
///
/// Used to write locked groups into `project.optional-dependencies` while preserving comments and
/// formatting everywhere else.
pub struct PyProjectTomlMut {
    doc: DocumentMut,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to parse `pyproject.toml`")]
    Parse(#[from] Box<TomlError>),
    #[error("Optional dependencies in `pyproject.toml` are malformed")]
    MalformedOptionalDependencies,
    #[error("The `project.dynamic` field in `pyproject.toml` is malformed")]
    MalformedDynamic,
}

impl PyProjectTomlMut {
    /// Initialize a `PyProjectTomlMut` from a `PyProjectToml`.
    pub fn from_toml(pyproject: &PyProjectToml) -> Result<Self, Error> {
        Ok(Self {
            doc: pyproject.raw.parse().map_err(Box::new)?,
        })
    }

    /// Returns `true` if `project.optional-dependencies` is present.
    pub fn has_optional_dependencies(&self) -> bool {
        self.doc
            .get("project")
            .and_then(Item::as_table_like)
            .is_some_and(|project| project.contains_key("optional-dependencies"))
    }

    /// Adds a group to `project.optional-dependencies`, unless a group with that name already
    /// exists.
    ///
    /// Returns `true` if the group was added.
    pub fn add_optional_dependency_group(
        &mut self,
        group: &GroupName,
        requirements: &[String],
    ) -> Result<bool, Error> {
        // Get or create `project.optional-dependencies`.
        let optional_dependencies = self
            .doc
            .entry("project")
            .or_insert(Item::Table(Table::new()))
            .as_table_mut()
            .ok_or(Error::MalformedOptionalDependencies)?
            .entry("optional-dependencies")
            .or_insert(Item::Table(Table::new()))
            .as_table_like_mut()
            .ok_or(Error::MalformedOptionalDependencies)?;

        if optional_dependencies.contains_key(group.as_str()) {
            return Ok(false);
        }

        optional_dependencies.insert(
            group.as_str(),
            Item::Value(Value::Array(multiline_array(requirements))),
        );
        Ok(true)
    }

    /// Removes a field from `project.dynamic`.
    ///
    /// Returns `true` if the field was listed.
    pub fn remove_dynamic(&mut self, field: &str) -> Result<bool, Error> {
        let Some(dynamic) = self
            .doc
            .get_mut("project")
            .and_then(Item::as_table_like_mut)
            .and_then(|project| project.get_mut("dynamic"))
        else {
            return Ok(false);
        };
        let dynamic = dynamic.as_array_mut().ok_or(Error::MalformedDynamic)?;

        let before = dynamic.len();
        dynamic.retain(|value| value.as_str() != Some(field));
        Ok(dynamic.len() != before)
    }
}

impl fmt::Display for PyProjectTomlMut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.doc.fmt(f)
    }
}

/// Build an array with one entry per line and a trailing comma.
fn multiline_array(items: &[String]) -> Array {
    let mut array = items.iter().map(String::as_str).collect::<Array>();
    for item in array.iter_mut() {
        item.decor_mut().set_prefix("\n    ");
        item.decor_mut().set_suffix("");
    }
    if !array.is_empty() {
        array.set_trailing("\n");
        array.set_trailing_comma(true);
    }
    array
}
