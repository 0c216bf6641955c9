//! Line classification and directive extraction.
//!
//! A template line is either plain text or one of four directives:
//!
//! - `#config(<file>)` - load `#set` lines from another file
//! - `#set(<key>=<value>)` - bind a variable in the current file
//! - `#include(<file>)` - expand another file in place, re-indented
//! - `#var(<name>)` - substitute a variable, any number of times per line
//!
//! The first three must start the line (after its indentation). `#var` may
//! appear anywhere.

use crate::error::{Result, SteError};
use regex::{Captures, Regex};
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

static CONFIG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#config\(([^)]*)\)").unwrap());

static SET_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#set\(([^)]*)=([^)]*)\)").unwrap());

static INCLUDE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#include\(([^)]*)\)").unwrap());

static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#var\(([^)]*)\)").unwrap());

/// The four directive keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveKind {
    Config,
    Set,
    Include,
    Var,
}

impl DirectiveKind {
    /// Keyword as written in templates, e.g. `#include`
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Config => "#config",
            Self::Set => "#set",
            Self::Include => "#include",
            Self::Var => "#var",
        }
    }

    /// What a well-formed line of this kind must contain
    #[must_use]
    pub const fn expected(self) -> &'static str {
        match self {
            Self::Config => "one #config(<file>) expression",
            Self::Set => "one #set(<key>=<value>) expression",
            Self::Include => "one #include(<file>) expression",
            Self::Var => "#var(<name>) expressions",
        }
    }

    /// Picks the directive kind of an indentation-stripped line body.
    ///
    /// Checked in a fixed order and the first match wins: `#config`, `#set`
    /// and `#include` as prefixes, then `#var` anywhere.
    #[must_use]
    pub fn classify(body: &str) -> Option<Self> {
        [Self::Config, Self::Set, Self::Include]
            .into_iter()
            .find(|kind| body.starts_with(kind.keyword()))
            .or_else(|| body.contains(Self::Var.keyword()).then_some(Self::Var))
    }

    fn malformed(self, line: usize) -> SteError {
        SteError::MalformedDirective {
            line,
            kind: self,
            expected: self.expected(),
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A template line split into its leading spaces and the rest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// The line exactly as read
    pub text: &'a str,
    /// Number of leading ASCII spaces
    pub indentation: usize,
    /// Everything after the leading spaces
    pub body: &'a str,
}

impl<'a> Line<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        let indentation = count_indentation(text);
        Self {
            text,
            indentation,
            body: &text[indentation..],
        }
    }

    /// Directive kind of this line, `None` for plain text
    #[must_use]
    pub fn kind(&self) -> Option<DirectiveKind> {
        DirectiveKind::classify(self.body)
    }

    /// Extracts the directive on this line.
    ///
    /// # Errors
    ///
    /// `SteError::MalformedDirective` when `#config`, `#set` or `#include` doesn't
    /// match its pattern exactly once, or a `#var` line has no `#var(<name>)`.
    pub fn directive(&self, line_number: usize) -> Result<Directive<'a>> {
        let Some(kind) = self.kind() else {
            return Ok(Directive::Text);
        };

        match kind {
            DirectiveKind::Config => {
                let captures = single_match(&CONFIG_PATTERN, self.body, line_number, kind)?;
                Ok(Directive::Config {
                    file: group(&captures, 1),
                })
            }
            DirectiveKind::Set => {
                let (key, value) = parse_set(line_number, self.body)?;
                Ok(Directive::Set { key, value })
            }
            DirectiveKind::Include => {
                let captures = single_match(&INCLUDE_PATTERN, self.body, line_number, kind)?;
                Ok(Directive::Include {
                    file: group(&captures, 1),
                })
            }
            DirectiveKind::Var => {
                let mut names: Vec<&'a str> = Vec::new();
                for captures in VAR_PATTERN.captures_iter(self.text) {
                    let name = group(&captures, 1);
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }

                if names.is_empty() {
                    return Err(kind.malformed(line_number));
                }
                Ok(Directive::Var { names })
            }
        }
    }
}

/// A classified template line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    /// `#config(<file>)`
    Config { file: &'a str },
    /// `#set(<key>=<value>)` with the key trimmed and the value unquoted
    Set { key: &'a str, value: String },
    /// `#include(<file>)`
    Include { file: &'a str },
    /// Distinct `#var(<name>)` names in order of first appearance
    Var { names: Vec<&'a str> },
    /// Anything else, passed through untouched
    Text,
}

/// Counts leading ASCII spaces. Tabs and other whitespace stop the count.
#[must_use]
pub fn count_indentation(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b' ').count()
}

/// Trims `value` and drops its first and last character, whatever they are.
///
/// Values shorter than two characters unquote to the empty string.
#[must_use]
pub fn unquote(value: &str) -> String {
    let mut chars = value.trim().chars();
    chars.next();
    chars.next_back();
    chars.as_str().to_string()
}

/// Extracts the single `#set(<key>=<value>)` in `text`.
///
/// Used for inline `#set` lines and for every line of a `#config` file.
///
/// # Errors
///
/// `SteError::MalformedDirective` unless `text` contains exactly one match.
pub fn parse_set(line_number: usize, text: &str) -> Result<(&str, String)> {
    let captures = single_match(&SET_PATTERN, text, line_number, DirectiveKind::Set)?;
    Ok((group(&captures, 1).trim(), unquote(group(&captures, 2))))
}

fn single_match<'t>(
    pattern: &Regex,
    text: &'t str,
    line_number: usize,
    kind: DirectiveKind,
) -> Result<Captures<'t>> {
    let mut matches = pattern.captures_iter(text);
    match (matches.next(), matches.next()) {
        (Some(only), None) => Ok(only),
        _ => Err(kind.malformed(line_number)),
    }
}

fn group<'t>(captures: &Captures<'t>, index: usize) -> &'t str {
    captures.get(index).map_or("", |m| m.as_str())
}

/// A directive found while scanning a template, for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectiveInfo {
    /// 1-based line number
    pub line: usize,
    pub kind: DirectiveKind,
    pub indentation: usize,
    /// File name, key and value, or variable names depending on the kind
    pub arguments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Lists every directive line of a template without expanding anything.
///
/// Malformed directives are reported through `DirectiveInfo::error` instead of
/// stopping the scan.
pub fn scan<S: AsRef<str>>(lines: &[S]) -> Vec<DirectiveInfo> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(index, text)| {
            let line = Line::new(text.as_ref());
            let kind = line.kind()?;
            let line_number = index + 1;

            let (arguments, error) = match line.directive(line_number) {
                Ok(Directive::Config { file } | Directive::Include { file }) => {
                    (vec![file.to_string()], None)
                }
                Ok(Directive::Set { key, value }) => (vec![key.to_string(), value], None),
                Ok(Directive::Var { names }) => {
                    (names.into_iter().map(str::to_string).collect(), None)
                }
                Ok(Directive::Text) => (Vec::new(), None),
                Err(e) => (Vec::new(), Some(e.to_string())),
            };

            Some(DirectiveInfo {
                line: line_number,
                kind,
                indentation: line.indentation,
                arguments,
                error,
            })
        })
        .collect()
}
