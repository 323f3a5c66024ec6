//! Path filtering: deciding whether a source file is traceable.
//!
//! Rules are evaluated in a fixed order and the first one that applies wins:
//!
//! 1. **Library paths** - bundled standard library and package installs
//!    (`/lib/python`, `site-packages`) are never traced
//! 2. **Interactive sources** - `<ipython-input-...>` pseudo-files are always traced
//! 3. **Profiler sources** - the profiler never profiles itself
//! 4. **Registered patterns** - substring match, no filesystem access
//! 5. **Base path** - canonical path (symlinks resolved) under the base directory
//!
//! Rules 1-4 form the [`TraceFilter::prescreen`] layer, which is cheap enough
//! to run while the runtime lock is held. Rule 5 touches the filesystem and
//! runs in [`TraceFilter::resolve`].

use log::debug;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

// =============================================================================
// RULE TABLES
// =============================================================================

/// Markers for the runtime's bundled standard library and third-party installs
pub const LIBRARY_MARKERS: &[&str] = &["site-packages", "/lib/python"];

/// Marker for code typed into an interactive shell
pub const INTERACTIVE_MARKER: &str = "<ipython";

/// Markers for the host profiler's own sources
pub const PROFILER_SOURCE_MARKERS: &[&str] = &["scalene/scalene"];

// =============================================================================
// DECISIONS
// =============================================================================

/// Why a file is traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceRule {
    /// Interactive shell input
    Interactive,
    /// Matched the registered pattern at this index
    Pattern(usize),
    /// Canonical path lies under the base path
    BasePath,
}

/// Why a file is not traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipRule {
    /// Standard library or installed package
    LibraryPath,
    /// The profiler's own source
    ProfilerSource,
    /// Resolved, but outside the base path (or no base path configured)
    OutsideBasePath,
}

/// Outcome of evaluating one file against a [`TraceFilter`].
///
/// `Unresolvable` means canonicalisation failed (missing file, dangling
/// symlink, permission denied, symlink loop). Callers treat it exactly like
/// `Skip`; it is kept distinct so diagnostics can report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceDecision {
    Trace(TraceRule),
    Skip(SkipRule),
    Unresolvable(io::ErrorKind),
}

impl TraceDecision {
    /// Returns true only for [`TraceDecision::Trace`].
    #[must_use]
    pub fn is_traced(&self) -> bool {
        matches!(self, TraceDecision::Trace(_))
    }
}

impl fmt::Display for TraceDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceDecision::Trace(TraceRule::Interactive) => write!(f, "trace (interactive)"),
            TraceDecision::Trace(TraceRule::Pattern(i)) => write!(f, "trace (pattern #{i})"),
            TraceDecision::Trace(TraceRule::BasePath) => write!(f, "trace (under base path)"),
            TraceDecision::Skip(SkipRule::LibraryPath) => write!(f, "skip (library)"),
            TraceDecision::Skip(SkipRule::ProfilerSource) => write!(f, "skip (profiler source)"),
            TraceDecision::Skip(SkipRule::OutsideBasePath) => write!(f, "skip (outside base path)"),
            TraceDecision::Unresolvable(kind) => write!(f, "skip (unresolvable: {kind})"),
        }
    }
}

/// Result of the filesystem-free rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prescreen {
    Decided(TraceDecision),
    NeedsResolution,
}

// =============================================================================
// FILTER
// =============================================================================

/// Immutable set of path rules deciding which files are traced.
///
/// A filter is never modified after construction; registering new rules
/// builds a new filter and installs it in a [`FilterSlot`](super::FilterSlot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFilter {
    patterns: Vec<String>,
    base_path: Option<PathBuf>,
    profile_all: bool,
}

impl TraceFilter {
    /// Build a filter, copying the patterns and base path.
    ///
    /// The base path is canonicalised when it exists so that it compares
    /// against canonical file paths. An empty base path disables rule 5.
    pub fn new<I, S>(patterns: I, base_path: impl AsRef<Path>, profile_all: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let base_path = base_path.as_ref();
        let base_path = if base_path.as_os_str().is_empty() {
            None
        } else {
            Some(fs::canonicalize(base_path).unwrap_or_else(|_| base_path.to_path_buf()))
        };

        Self { patterns: patterns.into_iter().map(Into::into).collect(), base_path, profile_all }
    }

    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    #[must_use]
    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    /// Reserved "trace everything" mode; reported but does not change decisions.
    #[must_use]
    pub fn profile_all(&self) -> bool {
        self.profile_all
    }

    /// Should this file be traced?
    #[must_use]
    pub fn should_trace(&self, filename: &str) -> bool {
        self.evaluate(filename).is_traced()
    }

    /// Run every rule and report which one decided.
    #[must_use]
    pub fn evaluate(&self, filename: &str) -> TraceDecision {
        match self.prescreen(filename) {
            Prescreen::Decided(decision) => decision,
            Prescreen::NeedsResolution => self.resolve(filename),
        }
    }

    /// Rules 1-4. Never touches the filesystem.
    #[must_use]
    pub fn prescreen(&self, filename: &str) -> Prescreen {
        if is_library_path(filename) {
            return Prescreen::Decided(TraceDecision::Skip(SkipRule::LibraryPath));
        }

        if is_interactive(filename) {
            return Prescreen::Decided(TraceDecision::Trace(TraceRule::Interactive));
        }

        if is_profiler_source(filename) {
            return Prescreen::Decided(TraceDecision::Skip(SkipRule::ProfilerSource));
        }

        if let Some(index) = self.patterns.iter().position(|p| filename.contains(p.as_str())) {
            return Prescreen::Decided(TraceDecision::Trace(TraceRule::Pattern(index)));
        }

        Prescreen::NeedsResolution
    }

    /// Rule 5: canonical path containment under the base path.
    ///
    /// Filesystem failures become [`TraceDecision::Unresolvable`].
    #[must_use]
    pub fn resolve(&self, filename: &str) -> TraceDecision {
        let Some(base) = self.base_path.as_deref() else {
            return TraceDecision::Skip(SkipRule::OutsideBasePath);
        };

        match fs::canonicalize(filename) {
            Ok(resolved) if resolved.starts_with(base) => TraceDecision::Trace(TraceRule::BasePath),
            Ok(_) => TraceDecision::Skip(SkipRule::OutsideBasePath),
            Err(e) => {
                debug!("Cannot resolve {filename}: {e}");
                TraceDecision::Unresolvable(e.kind())
            }
        }
    }

    /// Write a human-readable description of the mode and patterns.
    ///
    /// # Errors
    /// Returns an error if writing to `out` fails
    pub fn describe<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{self}")
    }
}

impl fmt::Display for TraceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Profile all? {}", u8::from(self.profile_all))?;
        match &self.base_path {
            Some(base) => writeln!(f, "Base path: {}", base.display())?,
            None => writeln!(f, "Base path: <none>")?,
        }
        writeln!(f, "items {{")?;
        for pattern in &self.patterns {
            writeln!(f, "\t{pattern}")?;
        }
        writeln!(f, "}}")
    }
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Standard library or third-party install path.
#[must_use]
pub fn is_library_path(filename: &str) -> bool {
    LIBRARY_MARKERS.iter().any(|marker| filename.contains(marker))
}

/// `<ipython-input-...>` style pseudo-file.
#[must_use]
pub fn is_interactive(filename: &str) -> bool {
    filename.starts_with('<') && filename.contains(INTERACTIVE_MARKER)
}

/// One of the host profiler's own source files.
#[must_use]
pub fn is_profiler_source(filename: &str) -> bool {
    PROFILER_SOURCE_MARKERS.iter().any(|marker| filename.contains(marker))
}
