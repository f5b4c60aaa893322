//! Error taxonomy shared by every stage of the trigger emulator

use thiserror::Error;

/// Result type alias for trigger operations
pub type Result<T> = std::result::Result<T, TriggerError>;

/// Coarse classification of a [`TriggerError`], used for abort accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    Configuration,
    Resolution,
    Invariant,
    Range,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Resolution => "resolution",
            ErrorKind::Invariant => "invariant",
            ErrorKind::Range => "range",
            ErrorKind::Io => "io",
        }
    }
}

/// Errors raised while building or evaluating trigger records.
///
/// None of these are recoverable inside the emulator: configuration errors stop
/// initialization, the others abort the event being processed.
#[derive(Error, Debug)]
pub enum TriggerError {
    /// Missing or invalid static parameter, unregistered detector type
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Identifier that cannot be translated by the channel map
    #[error("Resolution error: cannot resolve {id}: {reason}")]
    Resolution { id: String, reason: String },

    /// Duplicate record, locked record mutation, wrong processing state
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// Index outside a fixed-width payload or a fixed-size structure
    #[error("Range error: {what} index {index} outside [0, {limit})")]
    Range { what: &'static str, index: u64, limit: u64 },

    /// I/O errors while reading or writing lookup tables
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TriggerError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new resolution error for the offending identifier
    pub fn resolution(id: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::Resolution { id: id.to_string(), reason: reason.into() }
    }

    /// Create a new invariant violation
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Create a new range error
    pub fn range(what: &'static str, index: impl Into<u64>, limit: impl Into<u64>) -> Self {
        Self::Range { what, index: index.into(), limit: limit.into() }
    }

    /// Error attached to any mutation of a locked record
    pub fn locked(record: impl std::fmt::Display) -> Self {
        Self::Invariant(format!("record {record} is locked"))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TriggerError::Configuration(_) => ErrorKind::Configuration,
            TriggerError::Resolution { .. } => ErrorKind::Resolution,
            TriggerError::Invariant(_) => ErrorKind::Invariant,
            TriggerError::Range { .. } => ErrorKind::Range,
            TriggerError::Io(_) => ErrorKind::Io,
        }
    }
}

/// Check `index < limit`, returning a range error otherwise.
#[inline]
pub fn check_range(what: &'static str, index: usize, limit: usize) -> Result<()> {
    if index < limit {
        Ok(())
    } else {
        Err(TriggerError::range(what, index as u64, limit as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_classified() {
        assert_eq!(TriggerError::config("x").kind(), ErrorKind::Configuration);
        assert_eq!(TriggerError::resolution("eid", "nope").kind(), ErrorKind::Resolution);
        assert_eq!(TriggerError::invariant("dup").kind(), ErrorKind::Invariant);
        assert_eq!(TriggerError::range("bit", 5u64, 5u64).kind(), ErrorKind::Range);
    }

    #[test]
    fn messages_carry_context() {
        let err = TriggerError::range("zoning bit", 12u64, 10u64);
        assert_eq!(err.to_string(), "Range error: zoning bit index 12 outside [0, 10)");
        let err = TriggerError::resolution("GID[tracker 0.1.2]", "detector type not registered");
        assert!(err.to_string().contains("GID[tracker 0.1.2]"));
    }

    #[test]
    fn check_range_bounds() {
        assert!(check_range("row", 112, 113).is_ok());
        assert!(matches!(check_range("row", 113, 113), Err(TriggerError::Range { index: 113, .. })));
    }
}
