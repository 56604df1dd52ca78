//! # wire-codec
//!
//! Schema-driven codec for structured records with per-field presence
//! tracking.
//!
//! A record type is described at runtime by a [`StructDescriptor`]: an
//! ordered table of fields, each with a wire id, a name, a
//! [`TypeDescriptor`] and a requiredness. [`Record`] values carry one slot
//! per field plus an "is set" flag, and [`StructCodec`] reads and writes
//! any record through a pluggable port.
//!
//! ## Guarantees
//! - **Presence**: only set (or required) fields are written; a read marks
//!   exactly the fields that arrived
//! - **Forward compatibility**: unknown field ids are skipped, including
//!   arbitrarily nested structs and containers
//! - **Bounded recursion**: every descent holds a level of a
//!   [`RecursionGuard`](core::guard::RecursionGuard); exceeding the limit
//!   fails with [`CodecError::DepthExceeded`] without leaking a level
//! - **Value semantics**: [`deep_copy`], [`equals`] and [`hash_value`]
//!   agree with each other over arbitrarily nested values
//!
//! ## Example
//! ```no_run
//! use wire_codec::{BinaryReader, BinaryWriter, Record, StructCodec, StructDescriptor, TypeDescriptor};
//!
//! # async fn demo() -> wire_codec::Result<()> {
//! let point = StructDescriptor::builder("Point")
//!     .optional(1, "x", TypeDescriptor::I32)
//!     .optional(2, "y", TypeDescriptor::I32)
//!     .build()?;
//!
//! let record = Record::new(point.clone()).with("x", 3)?;
//! let codec = StructCodec::default();
//!
//! let mut writer = BinaryWriter::new(Vec::new());
//! codec.write(&mut writer, &record).await?;
//!
//! let bytes = writer.into_inner();
//! let mut reader = BinaryReader::new(bytes.as_slice());
//! let decoded = codec.read(&mut reader, &point).await?;
//! assert!(decoded.is_set("x") && !decoded.is_set("y"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use crate::config::{CodecConfig, WireConfig};
pub use crate::core::guard::RecursionGuard;
pub use crate::core::schema::{FieldDescriptor, Requiredness, StructDescriptor};
pub use crate::core::types::{EnumDescriptor, TypeDescriptor, TypeTag};
pub use crate::core::value::{deep_copy, equals, hash_value, Record, Value};
pub use crate::error::{CodecError, ErrorKind, Result};
pub use crate::protocol::{
    BinaryReader, BinaryWriter, ProtocolReader, ProtocolWriter, RecordEditor, StructCodec,
    TokenReader, TokenWriter, WireToken,
};
pub use crate::transport::RecordStream;
