//! ptrwire: zero-copy reader for a pointer-based, word-aligned binary format.
//!
//! Messages are read in place. A [`Blob`] is a borrowed buffer plus a base
//! offset; structs, lists and text are reached by following relative pointers
//! and nothing is copied or allocated along the way.
//!
//! # Overview
//!
//! The crate has two layers:
//! - **Wire decoding** ([`codec`]): pointer words, bounds-checked scalar reads,
//!   lazy lists and typed field descriptors for hand-written accessors
//! - **Accessor compilation** ([`compiler`]): turns a schema description
//!   ([`model`]) into per-field read procedures and exposes dynamic views
//!
//! # Quick Start
//!
//! ```rust
//! use ptrwire::{compile, CompileOptions, Message, MessageBuilder, Schema};
//! use ptrwire::model::{StructBuilder, Type};
//!
//! // struct Rectangle { topLeft @0 :Point; bottomRight @1 :Point; }
//! let schema = Schema::from_nodes([
//!     StructBuilder::new(1, "Point")
//!         .data_words(2)
//!         .slot("x", 0, Type::INT64)
//!         .slot("y", 1, Type::INT64)
//!         .build(),
//!     StructBuilder::new(2, "Rectangle")
//!         .pointers(2)
//!         .slot("topLeft", 0, Type::Struct(1))
//!         .slot("bottomRight", 1, Type::Struct(1))
//!         .build(),
//! ])
//! .unwrap();
//! let compiled = compile(&schema, [2], CompileOptions::default()).unwrap();
//!
//! let mut builder = MessageBuilder::new();
//! let rect = builder.init_root(0, 2).unwrap();
//! let corner = builder.init_struct(rect.pointer(1), 2, 0).unwrap();
//! builder.set_i64(corner.offset, 10).unwrap();
//! let bytes = builder.into_bytes();
//!
//! let message = Message::from_segment(&bytes).unwrap();
//! let rect = compiled.read_root(2, &message).unwrap().unwrap();
//! let corner = rect.get("bottomRight").unwrap().unwrap().as_struct().unwrap();
//! assert_eq!(corner.get("x").unwrap().unwrap().as_i64(), Some(10));
//! assert!(rect.get("topLeft").unwrap().is_none());
//! ```
//!
//! # Modules
//!
//! - [`codec`]: Blob, pointers, lists, field descriptors and message framing
//! - [`model`]: Schema nodes consumed by the compiler
//! - [`compiler`]: Accessor compiler and dynamic struct/list views
//! - [`error`]: Error types
//! - [`limits`]: Wire constants and decoding limits
//!
//! # Security
//!
//! The reader is designed to handle untrusted input:
//! - Every read is bounds checked against the whole buffer
//! - Pointer chains are bounded by a nesting limit
//! - Far and capability pointers are rejected rather than followed
//! - Field reads stay inside the sections a struct pointer declares: data
//!   past the data section reads as the default and missing pointers as null
//!
//! Null pointers are never an error. They are how absent pointer fields are
//! encoded, and every pointer read reports them as `None`.

pub mod codec;
pub mod compiler;
pub mod error;
pub mod limits;
pub mod model;

// Re-export commonly used types at crate root
pub use codec::{Blob, FromBlob, List, Message, MessageBuilder, ReadOptions, StructSize};
pub use compiler::{compile, CompileOptions, CompiledSchema, StructView, Value};
pub use error::{CompileError, DecodeError, EncodeError, ErrorCode};
pub use model::{NodeId, Schema};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
