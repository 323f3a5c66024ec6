//! Stack walking
//!
//! - `stack_walker`: the per-sample location query and its fallback rules

pub mod stack_walker;

pub use stack_walker::StackWalker;
