//! # Protocol Layer
//!
//! The reader/writer port abstraction, the concrete ports, and the generic
//! struct codec that drives them.
//!
//! ## Components
//! - **Port**: `ProtocolReader` / `ProtocolWriter` capability traits
//! - **Binary**: Compact big-endian port over tokio byte streams
//! - **Token**: In-memory token port, JSON-serializable, for tests and debugging
//! - **Skip**: Schema-free consumption of unknown values
//! - **Codec**: Schema-driven record reader and writer
//! - **Editor**: Dirty-field tracking and partial-update patches

pub mod binary;
pub mod codec;
pub mod editor;
pub mod port;
pub mod skip;
pub mod token;

pub use binary::{BinaryReader, BinaryWriter, ReadLimits};
pub use codec::StructCodec;
pub use editor::RecordEditor;
pub use port::{FieldHeader, ListHeader, MapHeader, ProtocolReader, ProtocolWriter};
pub use skip::skip;
pub use token::{TokenReader, TokenWriter, WireToken};
