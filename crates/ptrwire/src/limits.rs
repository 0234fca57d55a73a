//! Wire constants and decoding limits.

/// Bytes per word. Every pointer, struct section and segment is word aligned.
pub const BYTES_PER_WORD: usize = 8;

/// Bits per word.
pub const BITS_PER_WORD: u64 = 64;

/// Default maximum depth of struct/list dereferences from the root.
///
/// Pointers are relative and untrusted, so a hostile message can form cycles.
/// Every dereference increments a depth counter that is checked against this.
pub const DEFAULT_NESTING_LIMIT: u32 = 64;

/// Maximum number of segments accepted in a stream frame header.
pub const MAX_SEGMENTS: usize = 512;

/// Maximum element count representable in a list pointer (29 bits).
pub const MAX_LIST_ELEMENTS: u32 = (1 << 29) - 1;

/// Largest word offset representable in a pointer (30 bits, signed).
pub const MAX_POINTER_OFFSET: i32 = (1 << 29) - 1;

/// Smallest word offset representable in a pointer.
pub const MIN_POINTER_OFFSET: i32 = -(1 << 29);
