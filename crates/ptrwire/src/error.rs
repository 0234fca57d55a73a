//! Error types for message decoding, message writing and accessor
//! compilation.

use thiserror::Error;

use crate::codec::pointer::{ElementSize, PointerKind};
use crate::model::NodeId;

/// Stable error codes for decode failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E001: Read outside the buffer
    OutOfBounds,
    /// E002: Pointer tag or list layout does not match the expected kind
    MalformedPointer,
    /// E003: Union member accessed while another member is active
    UnionNotActive,
    /// E004: Text is not valid UTF-8
    InvalidText,
    /// E005: Framing or nesting limits violated
    LimitExceeded,
    /// E006: Caller asked for something the compiled schema does not have
    InvalidAccess,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "E001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::OutOfBounds => "E001",
            ErrorCode::MalformedPointer => "E002",
            ErrorCode::UnionNotActive => "E003",
            ErrorCode::InvalidText => "E004",
            ErrorCode::LimitExceeded => "E005",
            ErrorCode::InvalidAccess => "E006",
        }
    }
}

/// Error while reading a message.
///
/// Every variant except the `E006` group means the message is corrupt (or
/// hostile) and decoding of the accessed value cannot continue. Null pointers
/// are never errors; accessors report them as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    // === E001: Out of bounds ===
    #[error("[E001] read of {len} bytes at offset {offset} exceeds buffer of {size} bytes")]
    OutOfBounds { offset: i64, len: usize, size: usize },

    #[error("[E001] unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    // === E002: Malformed pointer ===
    #[error("[E002] expected {expected} pointer, found {found} pointer")]
    MalformedPointer {
        expected: PointerKind,
        found: PointerKind,
    },

    #[error("[E002] {kind} pointers are not followed")]
    UnsupportedPointer { kind: PointerKind },

    #[error("[E002] {context} requires {expected:?} elements, found {found:?}")]
    ElementSizeMismatch {
        context: &'static str,
        expected: ElementSize,
        found: ElementSize,
    },

    #[error("[E002] malformed composite list: {context}")]
    MalformedCompositeList { context: &'static str },

    // === E003: Union ===
    #[error("[E003] union member with discriminant {expected} is not active (found {found})")]
    UnionNotActive { expected: u16, found: u16 },

    // === E004: Text ===
    #[error("[E004] invalid UTF-8 in {context}")]
    InvalidUtf8 { context: &'static str },

    // === E005: Limits ===
    #[error("[E005] pointer nesting exceeds limit of {limit}")]
    NestingLimitExceeded { limit: u32 },

    #[error("[E005] invalid segment table: {context}")]
    InvalidSegmentTable { context: &'static str },

    // === E006: Invalid access ===
    #[error("[E006] index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: u32, len: u32 },

    #[error("[E006] no field named {name:?}")]
    NoSuchField { name: String },

    #[error("[E006] field {name:?} is not pointer-typed and has no presence check")]
    NoPresenceCheck { name: String },

    #[error("[E006] node {id:#x} was not compiled as a struct")]
    NoSuchStruct { id: NodeId },
}

impl DecodeError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DecodeError::OutOfBounds { .. } | DecodeError::UnexpectedEof { .. } => {
                ErrorCode::OutOfBounds
            }
            DecodeError::MalformedPointer { .. }
            | DecodeError::UnsupportedPointer { .. }
            | DecodeError::ElementSizeMismatch { .. }
            | DecodeError::MalformedCompositeList { .. } => ErrorCode::MalformedPointer,
            DecodeError::UnionNotActive { .. } => ErrorCode::UnionNotActive,
            DecodeError::InvalidUtf8 { .. } => ErrorCode::InvalidText,
            DecodeError::NestingLimitExceeded { .. } | DecodeError::InvalidSegmentTable { .. } => {
                ErrorCode::LimitExceeded
            }
            DecodeError::IndexOutOfRange { .. }
            | DecodeError::NoSuchField { .. }
            | DecodeError::NoPresenceCheck { .. }
            | DecodeError::NoSuchStruct { .. } => ErrorCode::InvalidAccess,
        }
    }
}

/// Error while compiling a schema into accessors.
///
/// These are raised once at compile time and never reached while decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("explicit defaults not supported for field {field}")]
    UnsupportedDefault { field: String },

    #[error("default value of field {field} does not match its type")]
    DefaultTypeMismatch { field: String },

    #[error("node {id:#x} not found in schema")]
    UnknownNode { id: NodeId },

    #[error("node {id:#x} is not a struct")]
    NotAStruct { id: NodeId },

    #[error("node {id:#x} is not an enum")]
    NotAnEnum { id: NodeId },

    #[error("duplicate node id {id:#x}")]
    DuplicateNode { id: NodeId },

    #[error("field {field} has a discriminant but its struct has no union")]
    DiscriminantWithoutUnion { field: String },

    #[error("field {field} lies outside the {section} section of its struct")]
    SlotOutsideSection {
        field: String,
        section: &'static str,
    },

    #[error("nullable group {field} is invalid: {reason}")]
    InvalidNullableGroup {
        field: String,
        reason: &'static str,
    },
}

/// Error while writing a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("write of {len} bytes at offset {offset} exceeds segment of {size} bytes")]
    OutOfBounds { offset: usize, len: usize, size: usize },

    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },
}
