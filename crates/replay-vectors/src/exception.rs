//! Canonical exception identifiers

use std::fmt;

/// Separator vectors use to write a compound identifier
const ANY_OF_SEPARATOR: char = '|';

/// Fork- and client-independent name of a validation failure.
///
/// `AnyOf` pairs two root causes that a client may report with the same text;
/// a rejection satisfies it when it satisfies either cause.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExceptionId {
    /// One root cause
    Single(String),
    /// Either of two root causes
    AnyOf(String, String),
}

impl ExceptionId {
    /// Single identifier
    pub fn single(name: impl Into<String>) -> Self {
        ExceptionId::Single(name.into())
    }

    /// Compound identifier
    pub fn any_of(first: impl Into<String>, second: impl Into<String>) -> Self {
        ExceptionId::AnyOf(first.into(), second.into())
    }

    /// Parse the `A|B` notation used in vectors.
    ///
    /// Anything that is not exactly two non-empty names around one separator
    /// is kept whole as a single identifier.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let mut parts = text.split(ANY_OF_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), None) if !a.trim().is_empty() && !b.trim().is_empty() => {
                ExceptionId::any_of(a.trim(), b.trim())
            }
            _ => ExceptionId::single(text),
        }
    }

    /// The two causes of a compound identifier
    pub fn halves(&self) -> Option<(&str, &str)> {
        match self {
            ExceptionId::Single(_) => None,
            ExceptionId::AnyOf(a, b) => Some((a, b)),
        }
    }
}

impl fmt::Display for ExceptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceptionId::Single(name) => write!(f, "{}", name),
            ExceptionId::AnyOf(a, b) => write!(f, "{}{}{}", a, ANY_OF_SEPARATOR, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single() {
        assert_eq!(ExceptionId::parse("OutOfGas"), ExceptionId::single("OutOfGas"));
    }

    #[test]
    fn test_parse_compound() {
        let id = ExceptionId::parse(
            "TransactionException.SENDER_NOT_EOA|TransactionException.INSUFFICIENT_ACCOUNT_FUNDS",
        );
        assert_eq!(
            id.halves(),
            Some((
                "TransactionException.SENDER_NOT_EOA",
                "TransactionException.INSUFFICIENT_ACCOUNT_FUNDS"
            ))
        );
        assert_eq!(
            id.to_string(),
            "TransactionException.SENDER_NOT_EOA|TransactionException.INSUFFICIENT_ACCOUNT_FUNDS"
        );
    }

    #[test]
    fn test_parse_degenerate_separator() {
        assert_eq!(ExceptionId::parse("A|"), ExceptionId::single("A|"));
        assert_eq!(ExceptionId::parse("A|B|C"), ExceptionId::single("A|B|C"));
    }
}
