//! Runtime error types and centralized error constructors.
//!
//! Every failure mode is a typed [`RtErrorKind`] plus a human-readable
//! message produced by the factory functions below; the runtime never
//! swallows an error to produce a default value. `with_frame` augments a
//! propagating error's synthetic trace; it never replaces the error.

use std::fmt;

use crate::dispatch::Invocation;
use crate::value::{Heap, Value};

/// Result of a runtime operation producing a value.
pub type RtResult = Result<Value, RtError>;

/// Typed error category.
///
/// Each variant carries the structured data for its condition, enabling
/// programmatic matching without string parsing. Factory functions populate
/// both `kind` and `message`; the `Display` impl of the kind produces the
/// same strings the factories do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RtErrorKind {
    /// Dynamic dispatch failed and no `noSuchMethod` override handled it.
    NoSuchMethod { member: String, type_name: String },
    /// A lazy binding was read during its own initialization.
    CyclicInitialization { name: String },
    /// Write to a frozen lazy binding after initialization.
    ImmutableBinding { name: String },
    /// Write to a canonical (frozen) constant value.
    FrozenValue { type_name: String },
    /// Explicit cast failed; both types pre-rendered.
    InvalidCast { from: String, to: String },
    /// Native list index outside `0..length`.
    IndexOutOfBounds { index: i64, length: usize },
    /// Native map read of an absent key.
    KeyNotFound { key: String },
    /// A mixin declared a parameterized constructor.
    MixinConstructor { mixin: String },
    /// Malformed runtime structure: a code-generation bug, not a user
    /// error (wrong type-argument count, bad generator usage, ...).
    Structural { reason: String },
    /// Catch-all for errors not categorized into structured kinds.
    Custom { message: String },
}

impl fmt::Display for RtErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchMethod { member, type_name } => {
                write!(f, "{type_name} has no member `{member}`")
            }
            Self::CyclicInitialization { name } => {
                write!(f, "cyclic initialization of `{name}`")
            }
            Self::ImmutableBinding { name } => {
                write!(f, "cannot assign to frozen binding `{name}`")
            }
            Self::FrozenValue { type_name } => {
                write!(f, "cannot modify a constant {type_name}")
            }
            Self::InvalidCast { from, to } => {
                write!(f, "type cast failed: `{from}` is not a subtype of `{to}`")
            }
            Self::IndexOutOfBounds { index, length } => {
                write!(f, "index {index} out of bounds (length {length})")
            }
            Self::KeyNotFound { key } => write!(f, "key not found: {key}"),
            Self::MixinConstructor { mixin } => {
                write!(f, "mixin `{mixin}` may not declare constructors")
            }
            Self::Structural { reason } => write!(f, "{reason}"),
            Self::Custom { message } => write!(f, "{message}"),
        }
    }
}

/// Runtime error.
#[derive(Clone, Debug)]
pub struct RtError {
    /// Structured error category.
    pub kind: RtErrorKind,
    /// Human-readable message; equals `kind.to_string()` for
    /// factory-created errors.
    pub message: String,
    /// The failed invocation, when this is a dispatch error. User
    /// `noSuchMethod` overrides pattern-match on this shape.
    pub invocation: Option<Heap<Invocation>>,
    /// Synthetic stack frames, innermost first. Augmented (never replaced)
    /// as the error propagates across suspension points and initializers.
    pub frames: Vec<String>,
}

impl RtError {
    /// Uncategorized error with a custom message.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: RtErrorKind::Custom {
                message: message.clone(),
            },
            message,
            invocation: None,
            frames: Vec::new(),
        }
    }

    /// Error from a structured kind; the message is the kind's rendering.
    pub fn from_kind(kind: RtErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            invocation: None,
            frames: Vec::new(),
        }
    }

    /// Attach the failed invocation (dispatch errors only).
    pub(crate) fn with_invocation(mut self, invocation: Invocation) -> Self {
        self.invocation = Some(Heap::new(invocation));
        self
    }

    /// Push a synthetic stack frame. Augments the trace; the error value
    /// itself is preserved.
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.frames.push(frame.into());
        self
    }
}

impl fmt::Display for RtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for frame in &self.frames {
            write!(f, "\n  at {frame}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RtError {}

// Error constructors.
//
// All factories are #[cold]: error paths are never the hot path.

/// Dynamic dispatch failure carrying the failed invocation.
#[cold]
pub fn no_such_method(type_name: &str, member: &str, invocation: Invocation) -> RtError {
    RtError::from_kind(RtErrorKind::NoSuchMethod {
        member: member.to_string(),
        type_name: type_name.to_string(),
    })
    .with_invocation(invocation)
}

/// Lazy binding read during its own initialization.
#[cold]
pub fn cyclic_initialization(name: &str) -> RtError {
    RtError::from_kind(RtErrorKind::CyclicInitialization {
        name: name.to_string(),
    })
}

/// Write to a frozen lazy binding.
#[cold]
pub fn immutable_binding(name: &str) -> RtError {
    RtError::from_kind(RtErrorKind::ImmutableBinding {
        name: name.to_string(),
    })
}

/// Write to a canonical constant value.
#[cold]
pub fn frozen_value(type_name: &str) -> RtError {
    RtError::from_kind(RtErrorKind::FrozenValue {
        type_name: type_name.to_string(),
    })
}

/// Explicit cast failure with pre-rendered types.
#[cold]
pub fn invalid_cast(from: &str, to: &str) -> RtError {
    RtError::from_kind(RtErrorKind::InvalidCast {
        from: from.to_string(),
        to: to.to_string(),
    })
}

/// Native list index out of bounds.
#[cold]
pub fn index_out_of_bounds(index: i64, length: usize) -> RtError {
    RtError::from_kind(RtErrorKind::IndexOutOfBounds { index, length })
}

/// Native map key absent.
#[cold]
pub fn key_not_found(key: &str) -> RtError {
    RtError::from_kind(RtErrorKind::KeyNotFound {
        key: key.to_string(),
    })
}

/// Mixin declared a parameterized constructor.
#[cold]
pub fn mixin_constructor(mixin: &str) -> RtError {
    RtError::from_kind(RtErrorKind::MixinConstructor {
        mixin: mixin.to_string(),
    })
}

/// Malformed runtime structure (code-generation bug).
#[cold]
pub fn structural(reason: impl Into<String>) -> RtError {
    RtError::from_kind(RtErrorKind::Structural {
        reason: reason.into(),
    })
}

/// `await` reached inside a `sync*` generator.
#[cold]
pub fn await_in_sync_generator() -> RtError {
    structural("await is not allowed in a sync* generator")
}

/// `yield` reached inside a plain `async` function.
#[cold]
pub fn yield_in_async() -> RtError {
    structural("yield is not allowed in an async function")
}
