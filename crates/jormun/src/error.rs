//! Exception machinery.
//!
//! Internally every fallible evaluator operation returns [`RunResult`], whose
//! error channel carries either a thrown JavaScript value, a not-yet
//! materialized native error ([`SimpleException`]), or a resource-limit
//! violation. The public boundary converts the internal error into an
//! [`Exception`] with a message, source location, and JS stack.
//!
//! Native errors stay in `SimpleException` form until JavaScript code can
//! observe them (a `catch` binding, an `instanceof` check); only then is a
//! heap `Error` object materialized. This keeps the hot error paths
//! allocation-free.

use std::{borrow::Cow, fmt};

use strum::{Display, EnumString, IntoStaticStr};

use crate::{resource::ResourceError, value::Value};

/// Result type alias for operations that can produce a runtime error.
pub(crate) type RunResult<T> = Result<T, RunError>;

/// The built-in error constructors.
///
/// The string representation matches the constructor name exactly
/// (e.g. `TypeError` -> "TypeError"), which is also the initial `name`
/// property of instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, serde::Serialize, serde::Deserialize)]
pub enum ExcKind {
    Error,
    TypeError,
    RangeError,
    ReferenceError,
    SyntaxError,
    EvalError,
    UriError,
    AggregateError,
}

impl ExcKind {
    /// The constructor name, also used as the default `name` property.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            // strum would render "UriError"; the global is spelled URIError
            Self::UriError => "URIError",
            other => other.into(),
        }
    }
}

/// A native error that has not yet been materialized as a heap object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SimpleException {
    pub kind: ExcKind,
    pub message: Cow<'static, str>,
}

impl SimpleException {
    pub fn new(kind: ExcKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for SimpleException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind.name())
        } else {
            write!(f, "{}: {}", self.kind.name(), self.message)
        }
    }
}

/// Internal error channel threaded through every evaluator operation.
#[derive(Debug)]
pub(crate) enum RunError {
    /// A JavaScript value thrown by user code (`throw x`), or a materialized
    /// native error object.
    Throw(Value),
    /// A native error; materialized into an `Error` object only when
    /// JavaScript can observe it.
    Simple(SimpleException),
    /// A resource-limit violation. Not catchable from JavaScript.
    Resource(ResourceError),
}

impl RunError {
    pub fn type_err(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Simple(SimpleException::new(ExcKind::TypeError, message))
    }

    pub fn range_err(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Simple(SimpleException::new(ExcKind::RangeError, message))
    }

    pub fn reference_err(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Simple(SimpleException::new(ExcKind::ReferenceError, message))
    }

    pub fn syntax_err(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Simple(SimpleException::new(ExcKind::SyntaxError, message))
    }

    /// True when JavaScript `try`/`catch` may catch this error.
    pub fn is_catchable(&self) -> bool {
        !matches!(self, Self::Resource(_))
    }
}

impl From<ResourceError> for RunError {
    fn from(err: ResourceError) -> Self {
        Self::Resource(err)
    }
}

/// A line/column pair, 1-based, in UTF-16 code units as editors count them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CodeLoc {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for CodeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One entry of a JavaScript stack trace, innermost first.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StackFrame {
    /// Function name, or `"<anonymous>"`.
    pub function: String,
    pub loc: Option<CodeLoc>,
}

/// A failure surfaced through the public embedding API.
///
/// Carries what JavaScript would see (`kind`/`message`) plus host-side
/// context (location, stack). Thrown non-Error values are rendered through
/// their string coercion with `kind` = `None`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Exception {
    /// The error constructor, when the thrown value was a native error.
    pub kind: Option<ExcKind>,
    pub message: String,
    pub loc: Option<CodeLoc>,
    pub stack: Vec<StackFrame>,
    /// True when the failure was a resource-limit violation rather than a
    /// JavaScript throw.
    pub resource_limit: bool,
}

impl Exception {
    pub(crate) fn new(kind: Option<ExcKind>, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            loc: None,
            stack: Vec::new(),
            resource_limit: false,
        }
    }

    pub(crate) fn syntax(message: impl Into<String>, loc: CodeLoc) -> Self {
        Self {
            kind: Some(ExcKind::SyntaxError),
            message: message.into(),
            loc: Some(loc),
            stack: Vec::new(),
            resource_limit: false,
        }
    }

    pub(crate) fn resource(err: ResourceError) -> Self {
        Self {
            kind: Some(ExcKind::RangeError),
            message: err.to_string(),
            loc: None,
            stack: Vec::new(),
            resource_limit: true,
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(kind) if !self.message.is_empty() => write!(f, "{}: {}", kind.name(), self.message)?,
            Some(kind) => write!(f, "{}", kind.name())?,
            None => write!(f, "{}", self.message)?,
        }
        if let Some(loc) = self.loc {
            write!(f, " (at {loc})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Exception {}

/// A lexer or parser diagnostic with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParseError {
    pub message: String,
    pub loc: CodeLoc,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            loc: CodeLoc { line, column },
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyntaxError: {} (at {})", self.message, self.loc)
    }
}

impl From<ParseError> for Exception {
    fn from(err: ParseError) -> Self {
        Self::syntax(err.message, err.loc)
    }
}

impl From<ParseError> for RunError {
    fn from(err: ParseError) -> Self {
        Self::Simple(SimpleException::new(
            ExcKind::SyntaxError,
            format!("{} (at {})", err.message, err.loc),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exc_kind_names() {
        assert_eq!(ExcKind::TypeError.name(), "TypeError");
        assert_eq!(ExcKind::UriError.name(), "URIError");
        assert_eq!(ExcKind::AggregateError.to_string(), "AggregateError");
    }

    #[test]
    fn simple_exception_display() {
        let e = SimpleException::new(ExcKind::RangeError, "invalid array length");
        assert_eq!(e.to_string(), "RangeError: invalid array length");
        let bare = SimpleException::new(ExcKind::Error, "");
        assert_eq!(bare.to_string(), "Error");
    }

    #[test]
    fn parse_error_into_exception() {
        let err = ParseError::new("unterminated string literal", 3, 14);
        let exc: Exception = err.into();
        assert_eq!(exc.kind, Some(ExcKind::SyntaxError));
        assert_eq!(exc.loc, Some(CodeLoc { line: 3, column: 14 }));
    }
}
