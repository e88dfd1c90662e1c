//! Result and error types for Cotejar.

use thiserror::Error;

/// Result type for Cotejar operations
pub type CotejarResult<T> = Result<T, CotejarError>;

/// Errors that can occur in Cotejar
#[derive(Debug, Error)]
pub enum CotejarError {
    /// Unknown transformation or metric name
    #[error("No {kind} registered under name '{name}'")]
    NotFound {
        /// What was looked up ("transformation" or "metric")
        kind: &'static str,
        /// The name that missed
        name: String,
    },

    /// Level outside the 0..=10 range
    #[error("Invalid level {level}: levels must be in 0..={max}", max = crate::level::MAX_LEVEL)]
    InvalidLevel {
        /// The offending level value
        level: u32,
    },

    /// Images handed to a metric do not share dimensions
    #[error("Incompatible input: original is {original_width}x{original_height}, comparison is {comparison_width}x{comparison_height}")]
    IncompatibleInput {
        /// Original image width
        original_width: u32,
        /// Original image height
        original_height: u32,
        /// Comparison image width
        comparison_width: u32,
        /// Comparison image height
        comparison_height: u32,
    },

    /// A metric produced a non-finite score (plugin contract violation)
    #[error("Metric '{metric}' produced non-finite score {value} at level {level}")]
    InvalidScore {
        /// Metric name
        metric: String,
        /// The non-finite value, stringified
        value: String,
        /// Level whose image was being rated
        level: u8,
    },

    /// Candidate ordering is not a permutation of the reference item set
    #[error("Set mismatch: {message}")]
    SetMismatch {
        /// What differs between the two item sets
        message: String,
    },

    /// Fewer than two ranked items
    #[error("Insufficient data: rank correlation needs at least 2 items, got {n}")]
    InsufficientData {
        /// Number of items supplied
        n: usize,
    },

    /// Symbol was never encoded for this key
    #[error("Unknown symbol '{symbol}' for key '{key}'")]
    UnknownSymbol {
        /// The pair key
        key: String,
        /// The symbol that missed
        symbol: char,
    },

    /// Key has no symbol map entry
    #[error("No symbol sequence encoded for key '{key}'")]
    UnknownKey {
        /// The pair key
        key: String,
    },

    /// Requested more symbols than the alphabet holds
    #[error("Symbol alphabet exhausted: need {needed} distinct symbols, alphabet has {available}")]
    SymbolCapacity {
        /// Symbols requested
        needed: usize,
        /// Symbols available
        available: usize,
    },

    /// A dataset row could not be parsed
    #[error("Malformed row {line}: {message}")]
    MalformedRow {
        /// 1-based line number in the source file
        line: usize,
        /// What is wrong with the row
        message: String,
    },

    /// Key or agent string did not parse
    #[error("Parse error: {message}")]
    Parse {
        /// What failed to parse
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CotejarError {
    /// Shorthand for a registry miss
    #[must_use]
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Shorthand for a set-mismatch failure
    #[must_use]
    pub fn set_mismatch(message: impl Into<String>) -> Self {
        Self::SetMismatch {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = CotejarError::not_found("metric", "cw_ssim");
        assert_eq!(err.to_string(), "No metric registered under name 'cw_ssim'");
    }

    #[test]
    fn test_invalid_level_display() {
        let err = CotejarError::InvalidLevel { level: 11 };
        assert!(err.to_string().contains("Invalid level 11"));
        assert!(err.to_string().contains("0..=10"));
    }

    #[test]
    fn test_incompatible_input_display() {
        let err = CotejarError::IncompatibleInput {
            original_width: 4,
            original_height: 4,
            comparison_width: 2,
            comparison_height: 2,
        };
        assert!(err.to_string().contains("4x4"));
        assert!(err.to_string().contains("2x2"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CotejarError = io.into();
        assert!(matches!(err, CotejarError::Io(_)));
    }
}
