use crate::directive::DirectiveKind;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for template expansion
#[derive(Error, Debug)]
pub enum SteError {
    /// A directive line whose pattern matched the wrong number of times
    #[error("expecting {expected} for line {line}")]
    MalformedDirective {
        line: usize,
        kind: DirectiveKind,
        expected: &'static str,
    },

    /// `#var(name)` with no binding in the local or inherited scope
    #[error("no value found for #var({name}) at line {line}")]
    UnresolvedVariable { line: usize, name: String },

    /// Template, include or config file that doesn't exist
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// File that exists but couldn't be read as text
    #[error("Unable to read {path}: {source}")]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `#include` of a file that is already being expanded further up the chain
    #[error("#include cycle detected at line {line}: {path} is already being expanded")]
    IncludeCycle { line: usize, path: PathBuf },

    /// A `#config` or `#include` file that couldn't be loaded
    #[error("{kind}({file}) at line {line}: {source}")]
    DirectiveFile {
        line: usize,
        kind: DirectiveKind,
        file: String,
        #[source]
        source: Box<SteError>,
    },

    /// IO error when writing output
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SteError {
    /// Kind of directive that raised the error, if any
    #[must_use]
    pub fn directive_kind(&self) -> Option<DirectiveKind> {
        match self {
            Self::MalformedDirective { kind, .. } | Self::DirectiveFile { kind, .. } => {
                Some(*kind)
            }
            Self::UnresolvedVariable { .. } => Some(DirectiveKind::Var),
            Self::IncludeCycle { .. } => Some(DirectiveKind::Include),
            _ => None,
        }
    }

    /// 1-based template line the error points at, if any
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::MalformedDirective { line, .. }
            | Self::UnresolvedVariable { line, .. }
            | Self::IncludeCycle { line, .. }
            | Self::DirectiveFile { line, .. } => Some(*line),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SteError::MalformedDirective {
            line: 3,
            kind: DirectiveKind::Set,
            expected: DirectiveKind::Set.expected(),
        };
        assert_eq!(
            format!("{err}"),
            "expecting one #set(<key>=<value>) expression for line 3"
        );

        let err = SteError::MalformedDirective {
            line: 7,
            kind: DirectiveKind::Var,
            expected: DirectiveKind::Var.expected(),
        };
        assert_eq!(
            format!("{err}"),
            "expecting #var(<name>) expressions for line 7"
        );

        let err = SteError::UnresolvedVariable {
            line: 12,
            name: "version".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "no value found for #var(version) at line 12"
        );

        let err = SteError::FileNotFound {
            path: PathBuf::from("/test/build.yaml"),
        };
        assert_eq!(format!("{err}"), "File not found: /test/build.yaml");

        let err = SteError::IncludeCycle {
            line: 2,
            path: PathBuf::from("a.tmpl"),
        };
        assert!(format!("{err}").contains("cycle"));
        assert!(format!("{err}").contains("line 2"));
    }

    #[test]
    fn test_error_location() {
        let err = SteError::UnresolvedVariable {
            line: 4,
            name: "x".to_string(),
        };
        assert_eq!(err.line(), Some(4));
        assert_eq!(err.directive_kind(), Some(DirectiveKind::Var));

        let err = SteError::FileNotFound {
            path: PathBuf::from("missing"),
        };
        assert_eq!(err.line(), None);
        assert_eq!(err.directive_kind(), None);

        let err = SteError::DirectiveFile {
            line: 3,
            kind: DirectiveKind::Include,
            file: "missing.tmpl".to_string(),
            source: Box::new(err),
        };
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.directive_kind(), Some(DirectiveKind::Include));
        assert_eq!(
            format!("{err}"),
            "#include(missing.tmpl) at line 3: File not found: missing"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test");
        let err: SteError = io_err.into();
        assert!(matches!(err, SteError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: SteError = json_err.into();
        assert!(matches!(err, SteError::Json(_)));
    }
}
