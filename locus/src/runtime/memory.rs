//! In-process reference runtime.
//!
//! Models the parts of an interpreter the walker reads: a set of threads,
//! each with an optional chain of frames, guarded by one global lock. OS
//! threads are bound to runtime threads explicitly, so a test can play both
//! an interpreter thread and a native worker the runtime never saw.

use parking_lot::{Mutex, MutexGuard};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use super::{FrameHandle, RuntimeAdapter, RuntimeSession, DEFAULT_MAX_STACK_DEPTH};
use crate::domain::ThreadId;

/// Description of one frame, used to build chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSpec {
    filename: Option<String>,
    line: u32,
    instruction_offset: Option<u32>,
}

impl FrameSpec {
    pub fn new(filename: impl Into<String>, line: u32) -> Self {
        Self { filename: Some(filename.into()), line, instruction_offset: None }
    }

    /// A frame whose code path cannot be decoded.
    #[must_use]
    pub fn undecodable(line: u32) -> Self {
        Self { filename: None, line, instruction_offset: None }
    }

    #[must_use]
    pub fn offset(mut self, instruction_offset: u32) -> Self {
        self.instruction_offset = Some(instruction_offset);
        self
    }
}

#[derive(Debug)]
struct FrameNode {
    spec: FrameSpec,
    caller: Option<Arc<FrameNode>>,
}

impl Drop for FrameNode {
    // Unlink iteratively so a deep chain cannot overflow the stack
    fn drop(&mut self) {
        let mut next = self.caller.take();
        while let Some(node) = next {
            next = Arc::try_unwrap(node).ok().and_then(|mut node| node.caller.take());
        }
    }
}

/// Owned reference to a frame of a [`MemoryRuntime`].
#[derive(Debug, Clone)]
pub struct MemoryFrame(Arc<FrameNode>);

impl FrameHandle for MemoryFrame {
    fn filename(&self) -> Option<Cow<'_, str>> {
        self.0.spec.filename.as_deref().map(Cow::Borrowed)
    }

    fn line(&self) -> u32 {
        self.0.spec.line
    }

    fn instruction_offset(&self) -> Option<u32> {
        self.0.spec.instruction_offset
    }

    fn caller(&self) -> Option<Self> {
        self.0.caller.clone().map(MemoryFrame)
    }
}

#[derive(Debug, Default)]
struct RuntimeState {
    /// Innermost frame per runtime thread
    threads: BTreeMap<ThreadId, Option<Arc<FrameNode>>>,
    /// OS thread → runtime thread
    bindings: HashMap<thread::ThreadId, ThreadId>,
}

/// Interpreter model with a single global execution lock.
#[derive(Debug, Default)]
pub struct MemoryRuntime {
    initialized: AtomicBool,
    max_stack_depth: Option<usize>,
    state: Mutex<RuntimeState>,
}

impl MemoryRuntime {
    /// An initialised runtime with no threads.
    #[must_use]
    pub fn new() -> Self {
        Self { initialized: AtomicBool::new(true), ..Self::default() }
    }

    /// A runtime that has not finished starting up.
    #[must_use]
    pub fn uninitialized() -> Self {
        Self::default()
    }

    /// Cap the call chains this runtime reports it can produce.
    #[must_use]
    pub fn with_max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = Some(depth);
        self
    }

    pub fn set_initialized(&self, initialized: bool) {
        self.initialized.store(initialized, Ordering::Release);
    }

    /// Register a runtime thread with no frames yet.
    pub fn add_thread(&self, thread: ThreadId) {
        self.state.lock().threads.entry(thread).or_insert(None);
    }

    /// Replace a thread's call chain. `frames` runs innermost first.
    pub fn set_stack<I>(&self, thread: ThreadId, frames: I)
    where
        I: IntoIterator<Item = FrameSpec>,
    {
        let specs: Vec<FrameSpec> = frames.into_iter().collect();
        let innermost = specs
            .into_iter()
            .rev()
            .fold(None, |caller, spec| Some(Arc::new(FrameNode { spec, caller })));
        self.state.lock().threads.insert(thread, innermost);
    }

    /// Forget a thread and any OS-thread bindings pointing at it.
    pub fn remove_thread(&self, thread: ThreadId) {
        let mut state = self.state.lock();
        state.threads.remove(&thread);
        state.bindings.retain(|_, bound| *bound != thread);
    }

    /// Treat the calling OS thread as runtime thread `thread`.
    pub fn bind_current_thread(&self, thread: ThreadId) {
        let mut state = self.state.lock();
        state.threads.entry(thread).or_insert(None);
        state.bindings.insert(thread::current().id(), thread);
    }

    /// Make the calling OS thread unknown to the runtime again.
    pub fn unbind_current_thread(&self) {
        self.state.lock().bindings.remove(&thread::current().id());
    }

    /// Whether the global execution lock is currently held.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state.is_locked()
    }

    /// Number of outstanding references to `thread`'s innermost frame,
    /// counting the runtime's own.
    #[must_use]
    pub fn frame_refcount(&self, thread: ThreadId) -> Option<usize> {
        let state = self.state.lock();
        state.threads.get(&thread)?.as_ref().map(Arc::strong_count)
    }
}

/// Lock-holding view of a [`MemoryRuntime`].
pub struct MemorySession<'a> {
    state: MutexGuard<'a, RuntimeState>,
}

impl RuntimeSession for MemorySession<'_> {
    type Frame = MemoryFrame;

    fn current_thread_frame(&self) -> Option<MemoryFrame> {
        let thread = self.state.bindings.get(&thread::current().id())?;
        self.thread_frame(*thread)
    }

    fn threads(&self) -> Vec<ThreadId> {
        self.state.threads.keys().copied().collect()
    }

    fn thread_frame(&self, thread: ThreadId) -> Option<MemoryFrame> {
        self.state.threads.get(&thread)?.clone().map(MemoryFrame)
    }
}

impl RuntimeAdapter for MemoryRuntime {
    type Session<'a>
        = MemorySession<'a>
    where
        Self: 'a;

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn max_stack_depth(&self) -> usize {
        self.max_stack_depth.unwrap_or(DEFAULT_MAX_STACK_DEPTH)
    }

    fn lock(&self) -> MemorySession<'_> {
        MemorySession { state: self.state.lock() }
    }
}
