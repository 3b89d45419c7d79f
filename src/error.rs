//! Error types for WIN32 decoding and encoding.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KwinError {
    #[error("stream too short: expected {expected} more bytes, got {actual}")]
    UnexpectedEof { expected: usize, actual: usize },

    #[error("invalid magic bytes: {0:#04X} {1:#04X}")]
    InvalidMagic(u8, u8),

    #[error("invalid info block marker: {0:#04X}")]
    InvalidInfoMarker(u8),

    #[error("info block length mismatch: declared {declared}, consumed {consumed}")]
    InfoLengthMismatch { declared: u32, consumed: u32 },

    #[error("channel records do not fill second block: declared {declared}, consumed {consumed}")]
    DataLengthMismatch { declared: u32, consumed: u32 },

    #[error("unknown pack mode: {0}")]
    UnknownPackMode(u8),

    #[error("invalid BCD nibble {nibble:#X} at digit {position}")]
    InvalidBcdDigit { nibble: u8, position: usize },

    #[error("invalid sign nibble: {0:#X}")]
    InvalidSignNibble(u8),

    #[error("unknown component unit kind: {0}")]
    UnknownUnitKind(u8),

    #[error("station code is not ASCII")]
    InvalidStationCode,

    #[error("component {channel_id:#06X} has zero gain or scale denominator")]
    InvalidCalibration { channel_id: u16 },

    #[error("station provides {0} components, pipeline needs 3")]
    MissingComponents(usize),

    #[error("station sample rate is zero")]
    ZeroSampleRate,

    #[error("encode error: {0}")]
    EncodeError(String),
}

pub type Result<T> = std::result::Result<T, KwinError>;
