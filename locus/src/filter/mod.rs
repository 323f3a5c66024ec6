//! Trace filtering
//!
//! - `trace_filter`: the ordered path rules and their decisions
//! - `slot`: the process-wide, reference-counted holder of the active filter

pub mod slot;
pub mod trace_filter;

pub use slot::{current, global, install, FilterSlot};
pub use trace_filter::{Prescreen, SkipRule, TraceDecision, TraceFilter, TraceRule};
