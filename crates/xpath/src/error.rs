use core::fmt;
use std::sync::Arc;

/// Error codes emitted by the compiler and evaluator.
///
/// Codes reuse the W3C `err:` names where XPath defines one for the
/// situation; the remaining variants are project specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    FOER0000, // generic failure (host functions, unsupported digest)
    FORG0001, // invalid lexical value for a conversion
    XPDY0002, // context node undefined
    XPST0003, // syntax error
    XPST0010, // unsupported axis
    XPST0017, // unknown function or wrong number of arguments
    XPST0081, // unresolved namespace prefix
    XPTY0004, // type error (e.g. node-set required)
    /// Fallback for codes produced outside the evaluator.
    Unknown,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::FOER0000 => "FOER0000",
            ErrorCode::FORG0001 => "FORG0001",
            ErrorCode::XPDY0002 => "XPDY0002",
            ErrorCode::XPST0003 => "XPST0003",
            ErrorCode::XPST0010 => "XPST0010",
            ErrorCode::XPST0017 => "XPST0017",
            ErrorCode::XPST0081 => "XPST0081",
            ErrorCode::XPTY0004 => "XPTY0004",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }

    pub fn from_code(s: &str) -> Self {
        match s.strip_prefix("err:").unwrap_or(s) {
            "FOER0000" => ErrorCode::FOER0000,
            "FORG0001" => ErrorCode::FORG0001,
            "XPDY0002" => ErrorCode::XPDY0002,
            "XPST0003" => ErrorCode::XPST0003,
            "XPST0010" => ErrorCode::XPST0010,
            "XPST0017" => ErrorCode::XPST0017,
            "XPST0081" => ErrorCode::XPST0081,
            "XPTY0004" => ErrorCode::XPTY0004,
            _ => ErrorCode::Unknown,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "err:{}", self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), source: None }
    }

    /// Compose an error with a source cause.
    #[must_use]
    pub fn with_source(
        mut self,
        source: impl Into<Option<Arc<dyn std::error::Error + Send + Sync>>>,
    ) -> Self {
        self.source = source.into();
        self
    }

    pub fn code_enum(&self) -> ErrorCode {
        self.code
    }

    /// Static (compile-time) errors: syntax, unknown names, unsupported axes.
    pub fn is_static(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::XPST0003 | ErrorCode::XPST0010 | ErrorCode::XPST0017 | ErrorCode::XPST0081
        )
    }

    pub(crate) fn type_error(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::XPTY0004, msg)
    }

    pub(crate) fn wrong_arity(name: &str, argc: usize) -> Self {
        Self::from_code(
            ErrorCode::XPST0017,
            format!("wrong number of arguments for {name}(): {argc}"),
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
