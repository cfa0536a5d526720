//! Error types shared across the crate.
//!
//! CPU faults (the on-fire condition, malformed instructions) are never
//! errors; they are reported through flags or resolved to defined behavior.
//! The types here cover the synchronous API boundaries: decoding persisted
//! state, attaching devices, and building disk media.

use std::io;

use thiserror::Error;

/// Failure to decode a persisted snapshot or floppy medium.
///
/// A decode that fails leaves the target untouched.
#[derive(Debug, Error)]
pub enum StateError {
    /// Reading the underlying byte stream failed, usually because it ended early.
    #[error("{format}: {source}")]
    Io {
        format: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{format}: invalid magic (expected {expected:#010x}, found {found:#010x})")]
    InvalidMagic {
        format: &'static str,
        expected: u32,
        found: u32,
    },

    #[error("{format}: unsupported version {found} (expected {expected})")]
    UnsupportedVersion {
        format: &'static str,
        expected: u32,
        found: u32,
    },

    #[error("{format}: corrupt data: {reason}")]
    Corrupt {
        format: &'static str,
        reason: &'static str,
    },
}

impl StateError {
    pub(crate) fn io(format: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| StateError::Io { format, source }
    }

    /// True if the input ended before a complete record was read.
    pub fn is_truncated(&self) -> bool {
        matches!(self, StateError::Io { source, .. } if source.kind() == io::ErrorKind::UnexpectedEof)
    }
}

/// Failure to attach a device to the CPU bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    /// Every hardware id that HWN can report is already taken.
    #[error("device bus is full ({capacity} devices)")]
    Full { capacity: usize },
}

/// Failure to build a floppy medium or ROM from a raw image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("image of {words} words exceeds the capacity of {capacity} words")]
    TooLarge { words: usize, capacity: usize },
}

/// Failure of a range construction or scaling operation.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RangeError {
    #[error("range minimum {min} must be less than maximum {max}")]
    Inverted { min: f64, max: f64 },

    #[error("value {value} is outside the range [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncation_is_detected() {
        let err = StateError::io("snapshot")(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(err.is_truncated());

        let err = StateError::Corrupt {
            format: "snapshot",
            reason: "negative queue length",
        };
        assert!(!err.is_truncated());
    }

    #[test]
    fn test_messages_name_the_format() {
        let err = StateError::InvalidMagic {
            format: "M35FD medium",
            expected: 0xdbb0_cae1,
            found: 0,
        };
        let message = err.to_string();
        assert!(message.starts_with("M35FD medium"));
        assert!(message.contains("0xdbb0cae1"));
    }
}
