use std::fmt;

/// Coarse classification of engine failures.
///
/// Callers that only care about *what kind* of thing went wrong (a REPL
/// deciding whether to highlight a source column, a host deciding whether to
/// retry with a larger budget) match on this instead of the full [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input: bracket parity, misplaced operators, trailing tokens.
    Syntax,
    /// Mathematically undefined operation: `1/0`, `0^0`, opposite infinities.
    Domain,
    /// Invalid or reserved variable/function identifier.
    Name,
    /// The cooperative time budget was exceeded.
    Resource,
}

/// Errors produced by parsing, evaluation, and the operator algebra.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Syntax errors. Columns are 0-indexed internally, displayed 1-indexed.
    EmptyExpression,
    UnmatchedBracket {
        column: usize,
    },
    MismatchedBracket {
        column: usize,
    },
    UnknownOperator {
        text: String,
        column: usize,
    },
    MisplacedOperator {
        text: String,
    },
    UnexpectedToken {
        text: String,
    },
    WrongArity {
        name: String,
        expected: String,
        got: usize,
    },

    // Domain errors
    DivisionByZero,
    Undefined(&'static str),
    IncompatibleInfinities,

    // Name errors
    InvalidName(String),
    ReservedName(String),

    // Resource errors
    /// The cooperative cancellation budget ran out. This variant is a
    /// distinguished sentinel: intermediate code must propagate it untouched,
    /// and [`Error::wrap_parse`] refuses to reclassify it.
    Timeout,

    /// Catch-all applied by the top-level entry point to failures that carry
    /// no more specific classification. Preserves the original message.
    Parse {
        message: String,
        column: Option<usize>,
    },
}

impl Error {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyExpression
            | Error::UnmatchedBracket { .. }
            | Error::MismatchedBracket { .. }
            | Error::UnknownOperator { .. }
            | Error::MisplacedOperator { .. }
            | Error::UnexpectedToken { .. }
            | Error::WrongArity { .. }
            | Error::Parse { .. } => ErrorKind::Syntax,
            Error::DivisionByZero | Error::Undefined(_) | Error::IncompatibleInfinities => {
                ErrorKind::Domain
            }
            Error::InvalidName(_) | Error::ReservedName(_) => ErrorKind::Name,
            Error::Timeout => ErrorKind::Resource,
        }
    }

    /// True for the cancellation sentinel, which must never be swallowed or
    /// reclassified on its way up the stack.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Timeout)
    }

    /// The source column the error points at, when one is known.
    pub fn column(&self) -> Option<usize> {
        match self {
            Error::UnmatchedBracket { column }
            | Error::MismatchedBracket { column }
            | Error::UnknownOperator { column, .. } => Some(*column),
            Error::Parse { column, .. } => *column,
            _ => None,
        }
    }

    /// Normalize an error at the top-level parse boundary.
    ///
    /// Typed errors pass through unchanged — `Timeout` in particular is never
    /// folded. Kept as the single wrapping point so no intermediate layer is
    /// tempted to catch and reclassify.
    pub fn wrap_parse(self) -> Error {
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyExpression => write!(f, "expression is empty"),
            Error::UnmatchedBracket { column } => {
                write!(f, "unmatched bracket at column {}", column + 1)
            }
            Error::MismatchedBracket { column } => {
                write!(f, "mismatched bracket type at column {}", column + 1)
            }
            Error::UnknownOperator { text, column } => {
                write!(f, "unknown operator '{}' at column {}", text, column + 1)
            }
            Error::MisplacedOperator { text } => {
                write!(f, "misplaced operator '{}'", text)
            }
            Error::UnexpectedToken { text } => write!(f, "unexpected token '{}'", text),
            Error::WrongArity {
                name,
                expected,
                got,
            } => write!(
                f,
                "function '{}' expects {} argument(s), got {}",
                name, expected, got
            ),
            Error::DivisionByZero => write!(f, "division by zero"),
            Error::Undefined(what) => write!(f, "undefined: {}", what),
            Error::IncompatibleInfinities => {
                write!(f, "cannot combine infinities of opposite sign")
            }
            Error::InvalidName(name) => write!(f, "invalid identifier '{}'", name),
            Error::ReservedName(name) => write!(f, "'{}' is a reserved name", name),
            Error::Timeout => write!(f, "computation exceeded the configured time budget"),
            Error::Parse { message, column } => match column {
                Some(c) => write!(f, "parse error at column {}: {}", c + 1, message),
                None => write!(f, "parse error: {}", message),
            },
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            Error::UnmatchedBracket { column: 3 }.kind(),
            ErrorKind::Syntax
        );
        assert_eq!(Error::DivisionByZero.kind(), ErrorKind::Domain);
        assert_eq!(
            Error::ReservedName("pi".to_string()).kind(),
            ErrorKind::Name
        );
        assert_eq!(Error::Timeout.kind(), ErrorKind::Resource);
    }

    #[test]
    fn test_cancellation_is_never_wrapped() {
        let err = Error::Timeout.wrap_parse();
        assert!(err.is_cancellation());
        assert_eq!(err, Error::Timeout);
    }

    #[test]
    fn test_columns_display_one_indexed() {
        let err = Error::UnmatchedBracket { column: 0 };
        assert_eq!(err.column(), Some(0));
        assert!(format!("{}", err).contains("column 1"));
    }
}
