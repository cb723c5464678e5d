//! Command-line synthesis for quickscript argument models.
//!
//! Given an [`ArgumentSchema`](quickscript_core::ArgumentSchema), this crate
//! builds a parser that accepts one `--flag` per field (`--flag` /
//! `--no-flag` for booleans), renders a usage listing from the schema and
//! turns a process argument vector into a constructed model.
//!
//! Errors are collected rather than short-circuited: a vector missing three
//! required flags reports all three.

mod error;
mod parser;
mod usage;

pub use error::{ArgumentError, ArgumentIssue, SynthError};
pub use parser::{Parsed, Synthesizer, parse_args};
pub use usage::render_usage;
