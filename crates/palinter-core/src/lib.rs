//! # palinter-core
//!
//! Rule engine for linting the layout of a project: which folders exist,
//! how files and folders are named, and what file contents must contain.
//!
//! This crate provides:
//!
//! - [`RuleSet`] loaded from a YAML, JSON or TOML config
//! - [`Analyzer`] for snapshotting a directory and checking it in parallel
//! - [`LintResult`] and [`Violation`] for representing findings
//! - [`selftest`] for running a config against inline example projects
//!
//! ## Example
//!
//! ```ignore
//! use palinter_core::{Analyzer, RuleSet, Severity};
//!
//! let rules = RuleSet::from_file("palinter.yaml".as_ref())?;
//! let analyzer = Analyzer::builder()
//!     .root(".")
//!     .rules(rules)
//!     .build()?;
//!
//! let result = analyzer.analyze()?;
//! println!("{}", result.format_report(Severity::Error));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod analyzer;
mod report;
mod types;
mod walker;

pub mod case;
pub mod config;
pub mod content;
pub mod context;
pub mod pattern;
pub mod selftest;
pub mod template;
pub mod tree;

pub use analyzer::{Analyzer, AnalyzerBuilder, AnalyzerError};
pub use config::{ConfigError, ConfigFormat, RuleSet};
pub use types::{codes, LintResult, Location, NodeKind, Severity, Violation};
pub use walker::walk;
