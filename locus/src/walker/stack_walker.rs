//! Location resolution: find the innermost traceable frame.
//!
//! The walk runs in two phases so the runtime lock never covers filesystem
//! access:
//!
//! 1. **Under the lock** - walk the chain innermost → outermost, applying the
//!    built-in exclusions and the filter's filesystem-free rules. A frame
//!    that needs path resolution is snapshotted and the walk moves on.
//! 2. **After release** - resolve the snapshotted frames in walk order. The
//!    first traced one wins; otherwise the frame that matched in phase 1
//!    (if any) does.

use log::debug;

use crate::domain::{ResolvedLocation, ThreadId};
use crate::filter::trace_filter::{is_interactive, is_profiler_source};
use crate::filter::{FilterSlot, Prescreen, TraceDecision, TraceFilter};
use crate::runtime::{FrameHandle, RuntimeAdapter, RuntimeSession};

/// Path fragment identifying the runtime's own modules
const RUNTIME_INTERNAL_MARKER: &str = "/python";

/// Resolves the current source location for the sampler.
pub struct StackWalker<'a, R: RuntimeAdapter> {
    runtime: &'a R,
    filters: &'a FilterSlot,
    primary_thread: Option<ThreadId>,
}

impl<'a, R: RuntimeAdapter> StackWalker<'a, R> {
    /// Create a walker reading filters from `filters`.
    pub fn new(runtime: &'a R, filters: &'a FilterSlot) -> Self {
        Self { runtime, filters, primary_thread: None }
    }

    /// Thread to sample when the calling thread has no frame of its own.
    ///
    /// Without one, the live thread with the smallest identifier is used.
    #[must_use]
    pub fn with_primary_thread(mut self, primary_thread: Option<ThreadId>) -> Self {
        self.primary_thread = primary_thread;
        self
    }

    /// Find the innermost traceable frame, or the sentinel location.
    pub fn locate(&self) -> ResolvedLocation {
        if !self.runtime.is_initialized() {
            return ResolvedLocation::not_found();
        }

        let Some(filter) = self.filters.current() else {
            return ResolvedLocation::not_found();
        };

        let walk = {
            let session = self.runtime.lock();
            let Some(frame) =
                session.current_thread_frame().or_else(|| self.fallback_frame(&session))
            else {
                return ResolvedLocation::not_found();
            };
            walk_chain(frame, &filter, self.runtime.max_stack_depth())
        };

        walk.finish(&filter)
    }

    /// Innermost frame of the primary thread.
    fn fallback_frame<S: RuntimeSession>(&self, session: &S) -> Option<S::Frame> {
        let threads = session.threads();
        let thread = self
            .primary_thread
            .filter(|primary| threads.contains(primary))
            .or_else(|| threads.iter().min().copied())?;
        debug!("Calling thread has no frame, sampling {thread}");
        session.thread_frame(thread)
    }
}

/// Frame copied out of the runtime so it can be examined after unlocking.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    filename: String,
    line: u32,
    instruction_offset: u32,
}

impl Candidate {
    fn capture<F: FrameHandle>(frame: &F, filename: &str) -> Self {
        Self {
            filename: filename.to_owned(),
            line: frame.line(),
            instruction_offset: frame.instruction_offset().unwrap_or(0),
        }
    }

    fn into_location(self) -> ResolvedLocation {
        ResolvedLocation::found(self.filename, self.line, self.instruction_offset)
    }
}

/// Outcome of the locked phase.
#[derive(Debug, Default)]
struct Walk {
    /// Frames awaiting path resolution, innermost first, one per file
    deferred: Vec<Candidate>,
    /// Frame matched without the filesystem; outermost of anything examined
    matched: Option<Candidate>,
}

impl Walk {
    fn finish(self, filter: &TraceFilter) -> ResolvedLocation {
        for candidate in self.deferred {
            if filter.resolve(&candidate.filename).is_traced() {
                return candidate.into_location();
            }
        }
        self.matched.map_or_else(ResolvedLocation::not_found, Candidate::into_location)
    }
}

fn walk_chain<F: FrameHandle>(innermost: F, filter: &TraceFilter, max_depth: usize) -> Walk {
    let mut walk = Walk::default();
    let mut next = Some(innermost);

    for _ in 0..max_depth {
        let Some(frame) = next.take() else {
            return walk;
        };

        // Inner frames already deferred still get resolved
        let Some(filename) = frame.filename() else {
            debug!("Frame with undecodable code path, stopping walk");
            return walk;
        };

        if !filename.is_empty() && !is_builtin_skip(&filename) {
            match filter.prescreen(&filename) {
                Prescreen::Decided(TraceDecision::Trace(_)) => {
                    walk.matched = Some(Candidate::capture(&frame, &filename));
                    return walk;
                }
                Prescreen::Decided(_) => {}
                Prescreen::NeedsResolution => {
                    // A later frame of the same file resolves the same way
                    if !walk.deferred.iter().any(|c| c.filename == *filename) {
                        walk.deferred.push(Candidate::capture(&frame, &filename));
                    }
                }
            }
        }

        next = frame.caller();
    }

    debug!("Walk exceeded {max_depth} frames, stopping");
    walk
}

/// Frames excluded before the filter is consulted.
fn is_builtin_skip(filename: &str) -> bool {
    (filename.contains('<') && !is_interactive(filename))
        || filename.contains(RUNTIME_INTERNAL_MARKER)
        || is_profiler_source(filename)
}
