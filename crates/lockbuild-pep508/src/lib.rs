//! A parser for [PEP 508](https://peps.python.org/pep-0508/) dependency specifiers.
//!
//! Only the parts of a requirement that matter for walking a lockfile are interpreted: the
//! package name and extras. Version specifiers, URLs and environment markers are validated for
//! shape and otherwise carried through verbatim; markers in particular are never evaluated.
//!
//! ```text
//! requests[socks] >=2.31 ; python_version >= "3.8"
//! ^^^^^^^^ ^^^^^  ^^^^^^   ^^^^^^^^^^^^^^^^^^^^^^^
//!   name  extras  specifier        marker
//! ```

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use lockbuild_normalize::{ExtraName, PackageName};

use crate::cursor::Cursor;

mod cursor;

/// Error with a span attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pep508Error {
    /// The error message from the parser.
    pub message: String,
    /// Span start byte offset.
    pub start: usize,
    /// Span length in bytes.
    pub len: usize,
    /// The input string so we can print it underlined.
    pub input: String,
}

impl Display for Pep508Error {
    /// Pretty formatting with underline.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let start_offset = self.input[..self.start].chars().count();
        let underline_len = if self.start == self.input.len() {
            1
        } else {
            self.input[self.start..self.start + self.len]
                .chars()
                .count()
                .max(1)
        };
        write!(
            f,
            "{}\n{}\n{}{}",
            self.message,
            self.input,
            " ".repeat(start_offset),
            "^".repeat(underline_len)
        )
    }
}

impl std::error::Error for Pep508Error {}

/// The version constraint or direct reference of a [`Requirement`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionOrUrl {
    /// A version specifier such as `>=2,<3`, kept verbatim.
    VersionSpecifier(String),
    /// A direct reference such as `https://example.org/pkg.tar.gz` or `git+https://...`.
    Url(String),
}

impl Display for VersionOrUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VersionSpecifier(specifier) => f.write_str(specifier),
            Self::Url(url) => write!(f, " @ {url}"),
        }
    }
}

/// A PEP 508 dependency specifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Requirement {
    /// The distribution name such as `requests` in
    /// `requests [security,tests] >= 2.8.1, == 2.8.* ; python_version > "3.8"`.
    pub name: PackageName,
    /// The list of extras such as `security`, `tests` in
    /// `requests [security,tests] >= 2.8.1, == 2.8.* ; python_version > "3.8"`.
    pub extras: Vec<ExtraName>,
    /// The version specifier or URL, if any.
    pub version_or_url: Option<VersionOrUrl>,
    /// The environment marker, verbatim, such as `python_version > "3.8"`.
    pub marker: Option<String>,
}

impl Display for Requirement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(
                f,
                "[{}]",
                self.extras
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            )?;
        }
        if let Some(version_or_url) = &self.version_or_url {
            write!(f, "{version_or_url}")?;
        }
        if let Some(marker) = &self.marker {
            write!(f, " ; {marker}")?;
        }
        Ok(())
    }
}

impl FromStr for Requirement {
    type Err = Pep508Error;

    /// Parse a [Dependency Specifier](https://packaging.python.org/en/latest/specifications/dependency-specifiers/).
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        parse_pep508_requirement(&mut Cursor::new(input))
    }
}

/// Parse a PEP 508-compliant package name.
fn parse_name(cursor: &mut Cursor) -> Result<PackageName, Pep508Error> {
    // https://peps.python.org/pep-0508/#names
    // ^([A-Z0-9]|[A-Z0-9][A-Z0-9._-]*[A-Z0-9])$ with re.IGNORECASE
    let start = cursor.pos();

    match cursor.next() {
        Some((_, 'A'..='Z' | 'a'..='z' | '0'..='9')) => {}
        Some((index, char)) => {
            return Err(Pep508Error {
                message: format!(
                    "Expected package name starting with an alphanumeric character, found `{char}`"
                ),
                start: index,
                len: char.len_utf8(),
                input: cursor.to_string(),
            });
        }
        None => {
            return Err(Pep508Error {
                message: "Empty field is not allowed for PEP508".to_string(),
                start: 0,
                len: 1,
                input: cursor.to_string(),
            });
        }
    }

    cursor.take_while(|char| matches!(char, 'A'..='Z' | 'a'..='z' | '0'..='9' | '.' | '-' | '_'));
    let len = cursor.pos() - start;
    let name = cursor.slice(start, len);
    if let Some(last) = name
        .chars()
        .last()
        .filter(|last| !last.is_ascii_alphanumeric())
    {
        return Err(Pep508Error {
            message: format!("Package name must end with an alphanumeric character, not `{last}`"),
            start: cursor.pos() - last.len_utf8(),
            len: last.len_utf8(),
            input: cursor.to_string(),
        });
    }

    PackageName::from_str(name).map_err(|err| Pep508Error {
        message: err.to_string(),
        start,
        len,
        input: cursor.to_string(),
    })
}

/// Parse the extras section of a requirement, e.g. `[socks, security]`.
fn parse_extras(cursor: &mut Cursor) -> Result<Vec<ExtraName>, Pep508Error> {
    let Some(bracket_pos) = cursor.eat_char('[') else {
        return Ok(vec![]);
    };

    let mut extras = Vec::new();
    loop {
        cursor.eat_whitespace();

        // End of the extras section. (Empty extras are allowed.)
        if cursor.eat_char(']').is_some() {
            break;
        }

        if !extras.is_empty() {
            match cursor.next() {
                Some((_, ',')) => cursor.eat_whitespace(),
                Some((pos, other)) => {
                    return Err(Pep508Error {
                        message: format!(
                            "Expected either `,` (separating extras) or `]` (ending the extras section), found `{other}`"
                        ),
                        start: pos,
                        len: other.len_utf8(),
                        input: cursor.to_string(),
                    });
                }
                None => {
                    return Err(Pep508Error {
                        message: "Missing closing bracket (expected ']', found end of dependency specification)".to_string(),
                        start: bracket_pos,
                        len: 1,
                        input: cursor.to_string(),
                    });
                }
            }
        }

        let (start, len) = cursor.take_while(|char| {
            matches!(char, 'A'..='Z' | 'a'..='z' | '0'..='9' | '.' | '-' | '_')
        });
        if len == 0 {
            return match cursor.peek() {
                Some((pos, other)) => Err(Pep508Error {
                    message: format!(
                        "Expected an alphanumeric character starting the extra name, found `{other}`"
                    ),
                    start: pos,
                    len: other.len_utf8(),
                    input: cursor.to_string(),
                }),
                None => Err(Pep508Error {
                    message: "Missing closing bracket (expected ']', found end of dependency specification)".to_string(),
                    start: bracket_pos,
                    len: 1,
                    input: cursor.to_string(),
                }),
            };
        }
        let extra = ExtraName::from_str(cursor.slice(start, len)).map_err(|err| Pep508Error {
            message: err.to_string(),
            start,
            len,
            input: cursor.to_string(),
        })?;
        extras.push(extra);
    }

    Ok(extras)
}

/// Parse the marker following a `;`, which must not be empty.
fn parse_marker(cursor: &mut Cursor, semicolon: usize) -> Result<String, Pep508Error> {
    let marker = cursor.remaining().trim();
    if marker.is_empty() {
        return Err(Pep508Error {
            message: "Expected marker after `;`, found end of dependency specification"
                .to_string(),
            start: semicolon,
            len: 1,
            input: cursor.to_string(),
        });
    }
    let marker = marker.to_string();
    cursor.exhaust();
    Ok(marker)
}

fn parse_pep508_requirement(cursor: &mut Cursor) -> Result<Requirement, Pep508Error> {
    cursor.eat_whitespace();
    let name = parse_name(cursor)?;

    cursor.eat_whitespace();
    let extras = parse_extras(cursor)?;
    cursor.eat_whitespace();

    let version_or_url = match cursor.peek() {
        Some((_, '@')) => {
            cursor.next();
            cursor.eat_whitespace();
            let (start, len) = cursor.take_while(|char| !char.is_whitespace());
            if len == 0 {
                return Err(Pep508Error {
                    message: "Expected URL after `@`".to_string(),
                    start: cursor.pos(),
                    len: 1,
                    input: cursor.to_string(),
                });
            }
            Some(VersionOrUrl::Url(cursor.slice(start, len).to_string()))
        }
        Some((start, '(')) => {
            cursor.next();
            let (inner, len) = cursor.take_while(|char| char != ')');
            if cursor.eat_char(')').is_none() {
                return Err(Pep508Error {
                    message: "Missing closing parenthesis (expected ')', found end of dependency specification)".to_string(),
                    start,
                    len: 1,
                    input: cursor.to_string(),
                });
            }
            Some(VersionOrUrl::VersionSpecifier(
                cursor.slice(inner, len).trim().to_string(),
            ))
        }
        Some((_, '<' | '=' | '>' | '~' | '!')) => {
            let (start, len) = cursor.take_while(|char| char != ';');
            Some(VersionOrUrl::VersionSpecifier(
                cursor.slice(start, len).trim().to_string(),
            ))
        }
        Some((_, ';')) | None => None,
        Some((pos, other)) => {
            return Err(Pep508Error {
                message: format!(
                    "Expected one of `@`, `(`, `<`, `=`, `>`, `~`, `!`, `;`, found `{other}`"
                ),
                start: pos,
                len: other.len_utf8(),
                input: cursor.to_string(),
            });
        }
    };

    cursor.eat_whitespace();
    let marker = match cursor.next() {
        Some((semicolon, ';')) => Some(parse_marker(cursor, semicolon)?),
        Some((pos, other)) => {
            return Err(Pep508Error {
                message: format!("Expected end of input or `;`, found `{other}`"),
                start: pos,
                len: other.len_utf8(),
                input: cursor.to_string(),
            });
        }
        None => None,
    };

    Ok(Requirement {
        name,
        extras,
        version_or_url,
        marker,
    })
}
