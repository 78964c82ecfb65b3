//! Aggregates the files under a directory into a single context blob.
//!
//! The pipeline: `discover` walks the input folder and filters files,
//! `layout` groups them by folder and pre-computes the byte offset of every
//! folder section in the output, and `aggregate` writes all sections
//! concurrently through positional writes to disjoint ranges of one file
//! handle. `run` ties the stages together for callers.

pub mod aggregate;
pub mod discover;
pub mod error;
pub mod layout;
pub mod run;
pub mod tokens;
pub mod tree;
pub mod write;
