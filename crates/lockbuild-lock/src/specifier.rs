use crate::{Package, Source};

/// A locked package that can't be expressed as a PEP 508 requirement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnsupportedRequirement {
    #[error("Missing name in locked package{}", version.as_ref().map(|version| format!(" with version `{version}`")).unwrap_or_default())]
    MissingName { version: Option<String> },
    #[error("Editable requirement is not allowed: `{name}`")]
    Editable { name: String },
    #[error("Local path requirement is not allowed: `{name}` at `{path}`")]
    LocalPath { name: String, path: String },
}

impl Package {
    /// Convert the package to a PEP 508 requirement that pins it exactly.
    ///
    /// The name and extras are kept as written in the lockfile. Packages from a registry are
    /// pinned by version; packages from a URL or a repository by their direct reference, with the
    /// resolved revision preferred over the requested reference.
    ///
    /// ```text
    /// colorama[sec,test]==0.4.6 ; sys_platform == "win32"
    /// foo @ git+https://github.com/someone/foo.git@0123456789abc#subdirectory=subpath
    /// ```
    pub fn to_specifier(&self) -> Result<String, UnsupportedRequirement> {
        let Some(name) = self.name.as_deref() else {
            return Err(UnsupportedRequirement::MissingName {
                version: self.version.clone(),
            });
        };
        if self.editable {
            return Err(UnsupportedRequirement::Editable {
                name: name.to_string(),
            });
        }
        if let Some(path) = &self.path {
            return Err(UnsupportedRequirement::LocalPath {
                name: name.to_string(),
                path: path.clone(),
            });
        }

        let mut specifier = name.to_string();

        if !self.extras.is_empty() {
            specifier.push('[');
            specifier.push_str(&self.extras.join(","));
            specifier.push(']');
        }

        match &self.source {
            Source::Registry => {
                if let Some(version) = &self.version {
                    specifier.push_str("==");
                    specifier.push_str(version);
                }
            }
            Source::DirectUrl { url } => {
                specifier.push_str(" @ ");
                specifier.push_str(url);
            }
            Source::Vcs {
                kind,
                repository,
                reference,
                revision,
            } => {
                specifier.push_str(&format!(" @ {kind}+{repository}"));
                if let Some(reference) = revision.as_ref().or(reference.as_ref()) {
                    specifier.push('@');
                    specifier.push_str(reference);
                }
            }
        }

        if let Some(subdirectory) = &self.subdirectory {
            specifier.push_str("#subdirectory=");
            specifier.push_str(subdirectory);
        }

        if let Some(marker) = &self.marker {
            specifier.push_str(" ; ");
            specifier.push_str(marker);
        }

        Ok(specifier)
    }
}
