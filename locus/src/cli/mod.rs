//! Command-line interface for the `locus` binary

pub mod args;

pub use args::Args;
