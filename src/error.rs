//! Error taxonomy shared across subsystems.
//!
//! Transport and malformed-message errors are handled inline (logged and
//! skipped) per the error handling design; the variants here cover the
//! failures that are fatal at startup, where `main` should `?`-propagate
//! into an `anyhow::Error` and exit.

use thiserror::Error;

/// Errors produced while parsing a scenario file. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("io error reading scenario file: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: expected at least 3 whitespace-separated fields, got {found}")]
    TooFewFields { line: usize, found: usize },

    #[error("line {line}: could not parse time-of-day '{value}': {reason}")]
    BadTimestamp {
        line: usize,
        value: String,
        reason: String,
    },

    #[error("line {line}: could not parse floor '{value}'")]
    BadFloor { line: usize, value: String },

    #[error("line {line}: unrecognized record kind '{value}' (expected a direction, DOOR_ISSUE, or ELEVATOR_STUCK)")]
    UnknownKind { line: usize, value: String },

    #[error("line {line}: call record missing elevator number or request type")]
    IncompleteCall { line: usize },
}

/// Errors produced while encoding/decoding wire frames. Non-fatal: callers
/// drop the offending datagram and log a debug line.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("empty datagram")]
    Empty,

    #[error("unknown message tag {0}")]
    UnknownTag(u8),

    #[error("frame too short for tag {tag}: expected {expected} bytes, got {found}")]
    TooShort {
        tag: u8,
        expected: usize,
        found: usize,
    },

    #[error("elevator index {0} out of range")]
    CarOutOfRange(u8),

    #[error("bincode decode failed: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),
}
