//! Resource limits for sandboxed execution.
//!
//! The interpreter is designed to run untrusted code, so the heap, the
//! machine call depth, and the total number of evaluation steps can all be
//! capped. A fresh [`ResourceLimits`] imposes no limits at all.

use std::fmt;

/// Default cap on machine call depth when a depth limit is requested without
/// an explicit value.
///
/// Tail calls in strict mode reuse their frame and are not counted, so this
/// bounds only genuine (non-tail) recursion.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Limits applied while the interpreter runs.
///
/// All fields are optional; `None` means unlimited. Limits are checked at
/// allocation sites (heap), at frame push (call depth), and once per machine
/// step (fuel).
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct ResourceLimits {
    /// Maximum estimated heap memory in bytes.
    pub max_memory: Option<usize>,
    /// Maximum machine call depth (frames on any one machine, plus nested
    /// machines spawned by re-entrant built-ins).
    pub max_call_depth: Option<usize>,
    /// Maximum number of machine steps across the whole run.
    pub max_steps: Option<u64>,
}

impl ResourceLimits {
    /// Limits suitable for running untrusted snippets: 64 MiB of heap,
    /// [`DEFAULT_MAX_CALL_DEPTH`] frames, 100M steps.
    #[must_use]
    pub fn sandboxed() -> Self {
        Self {
            max_memory: Some(64 * 1024 * 1024),
            max_call_depth: Some(DEFAULT_MAX_CALL_DEPTH),
            max_steps: Some(100_000_000),
        }
    }
}

/// Error raised when a [`ResourceLimits`] cap is exceeded.
///
/// Resource errors are not catchable from JavaScript `try`/`catch`: they
/// unwind the whole run and surface as a host-level failure, so a sandboxed
/// script cannot mask its own resource exhaustion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ResourceError {
    /// Estimated heap memory exceeded `max_memory`.
    Memory { limit: usize },
    /// Call depth exceeded `max_call_depth`.
    CallDepth { limit: usize },
    /// Total machine steps exceeded `max_steps`.
    Steps { limit: u64 },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory { limit } => write!(f, "memory limit of {limit} bytes exceeded"),
            Self::CallDepth { limit } => write!(f, "maximum call depth of {limit} exceeded"),
            Self::Steps { limit } => write!(f, "step limit of {limit} exceeded"),
        }
    }
}

impl std::error::Error for ResourceError {}

/// Mutable tracking state paired with the configured limits.
///
/// This is the non-generic rendition of a pluggable tracker: the checks are
/// cheap enough that a branch on `Option` beats monomorphizing the entire
/// interpreter over a tracker type.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub(crate) struct Tracker {
    pub limits: ResourceLimits,
    /// Estimated live heap bytes.
    pub memory: usize,
    /// Steps executed so far.
    pub steps: u64,
}

impl Tracker {
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            memory: 0,
            steps: 0,
        }
    }

    /// Records an allocation of `bytes`, failing if it would break the cap.
    pub fn on_allocate(&mut self, bytes: usize) -> Result<(), ResourceError> {
        self.memory = self.memory.saturating_add(bytes);
        match self.limits.max_memory {
            Some(limit) if self.memory > limit => Err(ResourceError::Memory { limit }),
            _ => Ok(()),
        }
    }

    /// Records a free of `bytes` (best-effort estimate).
    pub fn on_free(&mut self, bytes: usize) {
        self.memory = self.memory.saturating_sub(bytes);
    }

    /// Checks the call-depth cap against `depth`.
    pub fn check_depth(&self, depth: usize) -> Result<(), ResourceError> {
        match self.limits.max_call_depth {
            Some(limit) if depth > limit => Err(ResourceError::CallDepth { limit }),
            _ => Ok(()),
        }
    }

    /// Counts one machine step against the fuel cap.
    #[inline]
    pub fn on_step(&mut self) -> Result<(), ResourceError> {
        self.steps += 1;
        match self.limits.max_steps {
            Some(limit) if self.steps > limit => Err(ResourceError::Steps { limit }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_by_default() {
        let mut t = Tracker::default();
        assert!(t.on_allocate(usize::MAX / 2).is_ok());
        assert!(t.check_depth(1_000_000).is_ok());
        assert!(t.on_step().is_ok());
    }

    #[test]
    fn memory_limit_trips() {
        let mut t = Tracker::new(ResourceLimits {
            max_memory: Some(1024),
            ..ResourceLimits::default()
        });
        assert!(t.on_allocate(1000).is_ok());
        assert_eq!(t.on_allocate(100), Err(ResourceError::Memory { limit: 1024 }));
        t.on_free(500);
        assert!(t.on_allocate(100).is_ok());
    }

    #[test]
    fn depth_limit_trips() {
        let t = Tracker::new(ResourceLimits {
            max_call_depth: Some(10),
            ..ResourceLimits::default()
        });
        assert!(t.check_depth(10).is_ok());
        assert_eq!(t.check_depth(11), Err(ResourceError::CallDepth { limit: 10 }));
    }
}
