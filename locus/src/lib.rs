//! # locus - Source Location Resolver for Sampling Profilers
//!
//! locus answers one question for an external sampling profiler, thousands
//! of times per second: *which user source line is this interpreter running
//! right now?* Only files the operator registered as interesting count; all
//! other samples are attributed to the sentinel location `<BOGUS>:1`.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────┐        ┌──────────────────────────┐
//! │   Sampler (timer/signal) │        │      Control plane       │
//! └────────────┬─────────────┘        └────────────┬─────────────┘
//!              │ Locator()                         │ register(...)
//!              ▼                                   ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       locus (this crate)                        │
//! │                                                                 │
//! │  ┌──────────────┐   current()   ┌──────────────┐                │
//! │  │ StackWalker  │──────────────▶│ FilterSlot   │◀── install()   │
//! │  └──────┬───────┘               │ Arc<Filter>  │                │
//! │         │ lock() / frames       └──────────────┘                │
//! │         ▼                                                       │
//! │  ┌──────────────┐                                               │
//! │  │RuntimeAdapter│  (host interpreter introspection)             │
//! │  └──────────────┘                                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`filter`]: path rules ([`filter::TraceFilter`]) and the process-wide
//!   reference-counted slot holding the active filter
//! - [`walker`]: the location query ([`walker::StackWalker`])
//! - [`runtime`]: capability traits a host interpreter implements, plus an
//!   in-memory reference runtime
//! - [`registration`]: control-plane entry points and the sampler dispatch
//! - [`config`]: JSON filter configuration
//! - [`cli`]: argument parsing for the `locus` binary
//! - [`domain`]: error types
//!
//! ## Failure Policy
//!
//! A sample never fails. Missing files, dangling symlinks, threads the
//! runtime does not track and an uninitialised runtime all resolve to the
//! sentinel. Only registration reports errors.

// Expose modules for testing
pub mod cli;
pub mod config;
pub mod domain;
pub mod filter;
pub mod registration;
pub mod runtime;
pub mod walker;

pub use locus_common::{ResolvedLocation, ThreadId, SENTINEL_FILENAME};
