//! Control-plane entry points
//!
//! What the profiler's control plane calls:
//! - [`register`] / [`register_config`]: install a new filter and publish the
//!   locate callback to the sampler
//! - [`register_primary_thread`]: name the thread samples fall back to
//! - [`dump_current_filter`]: print the active filter for debugging
//!
//! The sampler side receives a [`Locator`] through [`SamplerDispatch`].
//! [`LocatorSlot`] is the stock dispatch: a slot the sampler reads on every
//! tick.

use log::info;
use parking_lot::RwLock;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::FilterConfig;
use crate::domain::{DispatchError, RegistrationError, ResolvedLocation, ThreadId};
use crate::filter;
use crate::runtime::RuntimeAdapter;
use crate::walker::StackWalker;

/// Callback the sampler invokes once per sample.
pub type Locator = Arc<dyn Fn() -> ResolvedLocation + Send + Sync>;

/// Where the sampler looks up its locate callback.
pub trait SamplerDispatch {
    /// Make `locator` the callback used for subsequent samples.
    ///
    /// # Errors
    /// Returns an error if the sampler cannot accept a callback
    fn publish(&self, locator: Locator) -> Result<(), DispatchError>;
}

/// Callback slot read by the sampler on each tick.
pub struct LocatorSlot {
    locator: RwLock<Option<Locator>>,
    closed: AtomicBool,
}

impl LocatorSlot {
    #[must_use]
    pub const fn new() -> Self {
        Self { locator: parking_lot::const_rwlock(None), closed: AtomicBool::new(false) }
    }

    /// Run the published callback, or report the sentinel when none is bound.
    pub fn sample(&self) -> ResolvedLocation {
        let locator = self.locator.read().clone();
        locator.map_or_else(ResolvedLocation::not_found, |locate| locate())
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.locator.read().is_some()
    }

    /// Unbind and refuse further callbacks (sampler shutting down).
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.locator.write().take();
    }
}

impl Default for LocatorSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplerDispatch for LocatorSlot {
    fn publish(&self, locator: Locator) -> Result<(), DispatchError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DispatchError::Closed);
        }
        *self.locator.write() = Some(locator);
        Ok(())
    }
}

// =============================================================================
// PRIMARY THREAD
// =============================================================================

static PRIMARY_THREAD: RwLock<Option<ThreadId>> = parking_lot::const_rwlock(None);

/// Name the thread whose stack is sampled when the sampling thread has none.
pub fn register_primary_thread(thread: ThreadId) {
    info!("Primary thread registered: {thread}");
    *PRIMARY_THREAD.write() = Some(thread);
}

/// The registered primary thread, if any.
#[must_use]
pub fn primary_thread() -> Option<ThreadId> {
    *PRIMARY_THREAD.read()
}

// =============================================================================
// REGISTRATION
// =============================================================================

/// Resolve the current location using the process-wide filter.
pub fn locate_current_location<R: RuntimeAdapter>(runtime: &R) -> ResolvedLocation {
    StackWalker::new(runtime, filter::global()).with_primary_thread(primary_thread()).locate()
}

/// Install a filter built from `patterns`, `base_path` and `profile_all`,
/// then publish the locate callback through `dispatch`.
///
/// # Errors
/// See [`register_config`]
pub fn register<R, D, I, S>(
    runtime: &Arc<R>,
    dispatch: &D,
    patterns: I,
    base_path: impl Into<PathBuf>,
    profile_all: bool,
) -> Result<(), RegistrationError>
where
    R: RuntimeAdapter + Send + Sync + 'static,
    D: SamplerDispatch + ?Sized,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    register_config(runtime, dispatch, &FilterConfig::new(patterns, base_path, profile_all))
}

/// Install the filter described by `config` and publish the locate callback.
///
/// A configuration that fails validation leaves the current filter in
/// place. If the dispatch refuses the callback, the new filter stays
/// installed and the error is returned.
///
/// # Errors
/// Returns an error if `config` is invalid or the dispatch is unavailable
pub fn register_config<R, D>(
    runtime: &Arc<R>,
    dispatch: &D,
    config: &FilterConfig,
) -> Result<(), RegistrationError>
where
    R: RuntimeAdapter + Send + Sync + 'static,
    D: SamplerDispatch + ?Sized,
{
    let trace_filter = config.build()?;
    drop(filter::install(trace_filter));

    let runtime = Arc::clone(runtime);
    dispatch.publish(Arc::new(move || locate_current_location(runtime.as_ref())))?;

    info!("Registered {} pattern(s), base path {:?}", config.patterns.len(), config.base_path);
    Ok(())
}

/// Write the active filter to stderr. Does nothing if none is installed.
pub fn dump_current_filter() {
    // Diagnostics only; a closed stderr is not worth reporting
    let _ = dump_current_filter_to(&mut io::stderr().lock());
}

/// Write the active filter to `out`.
///
/// # Errors
/// Returns an error if writing fails
pub fn dump_current_filter_to<W: Write>(out: &mut W) -> io::Result<()> {
    match filter::current() {
        Some(active) => active.describe(out),
        None => Ok(()),
    }
}
