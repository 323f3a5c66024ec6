//! # Runtime Introspection Capabilities
//!
//! The walker never touches a host runtime directly. It goes through three
//! small traits that any interpreter binding can implement:
//!
//! - [`RuntimeAdapter`] - is the runtime up, and the global execution lock
//! - [`RuntimeSession`] - what can be read while that lock is held
//! - [`FrameHandle`] - one frame: code path, line, instruction offset, caller
//!
//! ## Handle Lifetimes
//!
//! Frames in a real runtime are reference counted by the runtime itself.
//! A `FrameHandle` owns one such reference and gives it back on drop, so the
//! walker's "advance to caller" is simply replacing one handle with the next.
//! Sessions borrow the adapter, which ties every frame read to the lock
//! being held.
//!
//! ## Implementations
//!
//! - [`memory::MemoryRuntime`]: in-process reference runtime with explicit
//!   threads and frame chains, used by the tests and the `--demo` mode

pub mod memory;

use std::borrow::Cow;

use crate::domain::ThreadId;

/// Frames walked per sample unless the adapter reports its own limit.
///
/// Well above any recursion limit a real interpreter is run with; reaching
/// it means the chain loops.
pub const DEFAULT_MAX_STACK_DEPTH: usize = 1 << 20;

/// One frame of an interpreted call chain.
pub trait FrameHandle: Sized {
    /// File path from the frame's code metadata.
    ///
    /// `None` when the runtime cannot produce a usable string for it.
    fn filename(&self) -> Option<Cow<'_, str>>;

    /// Line currently executing.
    fn line(&self) -> u32;

    /// Instruction offset within the code unit, if the runtime exposes one.
    fn instruction_offset(&self) -> Option<u32>;

    /// The calling frame, `None` at the root of the chain.
    fn caller(&self) -> Option<Self>;
}

/// Read access to thread and frame state while the global lock is held.
pub trait RuntimeSession {
    type Frame: FrameHandle;

    /// Innermost frame of the thread making this call, if the runtime
    /// tracks that thread as running interpreted code.
    fn current_thread_frame(&self) -> Option<Self::Frame>;

    /// Every thread the runtime knows about.
    fn threads(&self) -> Vec<ThreadId>;

    /// Innermost frame of a specific thread.
    fn thread_frame(&self, thread: ThreadId) -> Option<Self::Frame>;
}

/// Entry point into a host runtime.
pub trait RuntimeAdapter {
    type Session<'a>: RuntimeSession
    where
        Self: 'a;

    /// False until the runtime can have a stack at all.
    fn is_initialized(&self) -> bool;

    /// Deepest call chain the runtime can produce.
    fn max_stack_depth(&self) -> usize {
        DEFAULT_MAX_STACK_DEPTH
    }

    /// Acquire the global execution lock. Released when the session drops.
    fn lock(&self) -> Self::Session<'_>;
}
