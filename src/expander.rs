use crate::directive::{Directive, DirectiveKind, Line, parse_set};
use crate::error::{Result, SteError};
use crate::fs_utils::{canonical_identity, read_file_lines, resolve_template_path};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Variable name to value
pub type Bindings = HashMap<String, String>;

/// Expands the directives of one template file.
///
/// Every `#include` gets its own `Expander` whose inherited bindings are a copy
/// of this one's local bindings at the include line. Nothing flows back up.
#[derive(Debug, Clone)]
pub struct Expander {
    /// Directory every `#config` and `#include` file name is resolved against
    base_dir: PathBuf,
    /// Fallback bindings captured from the including file
    inherited: Bindings,
    /// Bindings made by `#set` and `#config` in this file so far
    local: Bindings,
    output: Vec<String>,
    /// Files currently being expanded, outermost first
    include_chain: Vec<PathBuf>,
}

impl Expander {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self::with_inherited(base_dir, Bindings::new())
    }

    /// Creates an expander that falls back to `inherited` when a `#var` isn't bound locally
    #[must_use]
    pub fn with_inherited(base_dir: impl Into<PathBuf>, inherited: Bindings) -> Self {
        Self {
            base_dir: base_dir.into(),
            inherited,
            local: Bindings::new(),
            output: Vec::new(),
            include_chain: Vec::new(),
        }
    }

    /// Resolves a variable: local bindings first, then inherited ones
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.local
            .get(name)
            .or_else(|| self.inherited.get(name))
            .map(String::as_str)
    }

    /// Expands `lines` in order and returns the produced lines.
    ///
    /// # Errors
    ///
    /// Stops at the first failing line:
    /// - `SteError::MalformedDirective` for a directive that doesn't match its syntax.
    /// - `SteError::UnresolvedVariable` for a `#var` bound in neither scope.
    /// - `SteError::DirectiveFile` when a `#config` or `#include` file can't be read.
    /// - `SteError::IncludeCycle` when a file ends up including itself.
    pub fn process<S: AsRef<str>>(mut self, lines: &[S]) -> Result<Vec<String>> {
        for (index, line) in lines.iter().enumerate() {
            self.process_line(index + 1, line.as_ref())?;
        }
        Ok(self.output)
    }

    /// Reads `file_name` from the base directory and expands it.
    ///
    /// # Errors
    ///
    /// `SteError::FileNotFound` if the file doesn't exist, otherwise as [`Expander::process`].
    pub fn process_file(mut self, file_name: &str) -> Result<Vec<String>> {
        let path = resolve_template_path(&self.base_dir, file_name);
        let lines = read_file_lines(&path)?;
        debug!(path = %path.display(), lines = lines.len(), "Expanding template");

        self.include_chain.push(canonical_identity(&path));
        self.process(&lines)
    }

    fn process_line(&mut self, line_number: usize, text: &str) -> Result<()> {
        let line = Line::new(text);
        trace!(line = line_number, kind = ?line.kind(), "Processing line");

        match line.directive(line_number)? {
            Directive::Config { file } => self.load_config(line_number, file),
            Directive::Set { key, value } => {
                self.bind(key, value);
                Ok(())
            }
            Directive::Include { file } => self.include(line_number, line.indentation, file),
            Directive::Var { names } => self.substitute(line_number, text, &names),
            Directive::Text => {
                self.output.push(text.to_string());
                Ok(())
            }
        }
    }

    fn bind(&mut self, key: &str, value: String) {
        trace!(key, value = %value, "Binding variable");
        self.local.insert(key.to_string(), value);
    }

    /// Every line of a config file must be a `#set`
    fn load_config(&mut self, line_number: usize, file: &str) -> Result<()> {
        let path = resolve_template_path(&self.base_dir, file);
        let config_lines = read_directive_file(&path, line_number, DirectiveKind::Config, file)?;
        debug!(line = line_number, path = %path.display(), "Loading config");

        for config_line in &config_lines {
            let (key, value) = parse_set(line_number, config_line)?;
            self.bind(key, value);
        }
        Ok(())
    }

    fn include(&mut self, line_number: usize, indentation: usize, file: &str) -> Result<()> {
        let path = resolve_template_path(&self.base_dir, file);
        let identity = canonical_identity(&path);
        if self.include_chain.contains(&identity) {
            return Err(SteError::IncludeCycle {
                line: line_number,
                path,
            });
        }

        let lines = read_directive_file(&path, line_number, DirectiveKind::Include, file)?;
        debug!(
            line = line_number,
            path = %path.display(),
            indentation,
            "Including template"
        );

        let mut child = Self::with_inherited(self.base_dir.clone(), self.local.clone());
        child.include_chain = self.include_chain.clone();
        child.include_chain.push(identity);

        let prefix = " ".repeat(indentation);
        let expanded = child.process(&lines)?;
        self.output
            .extend(expanded.into_iter().map(|line| format!("{prefix}{line}")));
        Ok(())
    }

    fn substitute(&mut self, line_number: usize, text: &str, names: &[&str]) -> Result<()> {
        let values = names
            .iter()
            .map(|&name| {
                self.lookup(name)
                    .map(|value| (name, value))
                    .ok_or_else(|| SteError::UnresolvedVariable {
                        line: line_number,
                        name: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut replaced = text.to_string();
        for (name, value) in values {
            replaced = replaced.replace(&format!("#var({name})"), value);
        }

        self.output.push(replaced);
        Ok(())
    }
}

/// Reads the file named by a `#config` or `#include`, tying failures to the directive line
fn read_directive_file(
    path: &Path,
    line: usize,
    kind: DirectiveKind,
    file: &str,
) -> Result<Vec<String>> {
    read_file_lines(path).map_err(|source| SteError::DirectiveFile {
        line,
        kind,
        file: file.to_string(),
        source: Box::new(source),
    })
}

/// Expands `file_name` from `base_dir` with no inherited bindings
///
/// # Errors
///
/// As [`Expander::process_file`].
pub fn process_template_file(base_dir: &Path, file_name: &str) -> Result<Vec<String>> {
    Expander::new(base_dir).process_file(file_name)
}
