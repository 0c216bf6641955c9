//! # ste
//!
//! A simple, line-oriented template engine that preserves indentation. Templates
//! are plain text files (typically YAML build configurations) with four directives:
//!
//! - `#config(vars.conf)` loads `#set` lines from another file
//! - `#set(name="value")` binds a variable for the rest of the file
//! - `#include(part.yaml)` expands another template in place, prefixing every
//!   produced line with the directive's indentation
//! - `#var(name)` substitutes a variable anywhere in a line
//!
//! Included templates see a copy of the including file's bindings as they were at
//! the `#include` line. Expansion stops at the first error.
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```no_run
//! use std::path::Path;
//!
//! match ste::process_template_file(Path::new("ci"), "build.yaml") {
//!     Ok(lines) => lines.iter().for_each(|line| println!("{line}")),
//!     Err(e) => eprintln!("Error: {e}"),
//! }
//! ```
//!
//! ```
//! use ste::Expander;
//!
//! let lines = ["#set(image=\"rust:1\")", "  image: #var(image)"];
//! let output = Expander::new(".").process(&lines).unwrap();
//! assert_eq!(output, vec!["  image: rust:1"]);
//! ```
//!
//! ### As a CLI Tool
//!
//! ```bash
//! # Expand build.yaml in the current directory
//! ste
//!
//! # Expand another template from another directory
//! ste --directory ci --file pipeline.yaml
//! ```

pub mod directive;
pub mod error;
pub mod expander;
pub mod fs_utils;

// Re-export main types and functions for convenience
pub use directive::{Directive, DirectiveInfo, DirectiveKind, Line};
pub use error::{Result, SteError};
pub use expander::{Bindings, Expander, process_template_file};
