//! # Reader/Writer Ports
//!
//! The capability set the struct codec is written against. A port frames
//! structs, fields, lists, sets and maps with symmetric begin/end calls and
//! reads or writes scalars. The byte layout is the port's business.
//!
//! Every method may suspend on I/O and is a single logical unit: a port never
//! exposes a partially read or written scalar or header. I/O failures surface
//! as [`CodecError::Transport`](crate::error::CodecError::Transport),
//! malformed framing as [`CodecError::Protocol`](crate::error::CodecError::Protocol).
//!
//! ## Field lists
//! A writer ends every field list with [`ProtocolWriter::write_field_stop`].
//! A reader reports that marker as a [`FieldHeader`] whose tag is
//! [`TypeTag::Stop`].

use async_trait::async_trait;

use crate::core::types::TypeTag;
use crate::error::Result;

/// Header of one field on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldHeader {
    /// Field name, when the port carries names
    pub name: Option<String>,
    pub tag: TypeTag,
    pub id: i16,
}

impl FieldHeader {
    pub fn new(name: impl Into<String>, tag: TypeTag, id: i16) -> Self {
        Self {
            name: Some(name.into()),
            tag,
            id,
        }
    }

    /// The end-of-fields marker
    pub fn stop() -> Self {
        Self {
            name: None,
            tag: TypeTag::Stop,
            id: 0,
        }
    }

    pub fn is_stop(&self) -> bool {
        self.tag == TypeTag::Stop
    }
}

/// Header of a list or set: element tag and element count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHeader {
    pub element: TypeTag,
    pub count: usize,
}

/// Header of a map: key tag, value tag and entry count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapHeader {
    pub key: TypeTag,
    pub value: TypeTag,
    pub count: usize,
}

#[async_trait]
pub trait ProtocolWriter: Send {
    async fn write_struct_begin(&mut self, name: &str) -> Result<()>;
    async fn write_struct_end(&mut self) -> Result<()>;

    async fn write_field_begin(&mut self, header: &FieldHeader) -> Result<()>;
    async fn write_field_end(&mut self) -> Result<()>;
    /// Terminate the field list of the current struct
    async fn write_field_stop(&mut self) -> Result<()>;

    async fn write_list_begin(&mut self, header: ListHeader) -> Result<()>;
    async fn write_list_end(&mut self) -> Result<()>;
    async fn write_set_begin(&mut self, header: ListHeader) -> Result<()>;
    async fn write_set_end(&mut self) -> Result<()>;
    async fn write_map_begin(&mut self, header: MapHeader) -> Result<()>;
    async fn write_map_end(&mut self) -> Result<()>;

    async fn write_bool(&mut self, value: bool) -> Result<()>;
    async fn write_i8(&mut self, value: i8) -> Result<()>;
    async fn write_i16(&mut self, value: i16) -> Result<()>;
    async fn write_i32(&mut self, value: i32) -> Result<()>;
    async fn write_i64(&mut self, value: i64) -> Result<()>;
    async fn write_float(&mut self, value: f32) -> Result<()>;
    async fn write_double(&mut self, value: f64) -> Result<()>;
    async fn write_string(&mut self, value: &str) -> Result<()>;
    async fn write_binary(&mut self, value: &[u8]) -> Result<()>;

    /// Push buffered output to the underlying stream
    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
pub trait ProtocolReader: Send {
    /// Returns the struct name when the port carries names
    async fn read_struct_begin(&mut self) -> Result<Option<String>>;
    async fn read_struct_end(&mut self) -> Result<()>;

    /// Returns a header tagged [`TypeTag::Stop`] at the end of the field list
    async fn read_field_begin(&mut self) -> Result<FieldHeader>;
    async fn read_field_end(&mut self) -> Result<()>;

    async fn read_list_begin(&mut self) -> Result<ListHeader>;
    async fn read_list_end(&mut self) -> Result<()>;
    async fn read_set_begin(&mut self) -> Result<ListHeader>;
    async fn read_set_end(&mut self) -> Result<()>;
    async fn read_map_begin(&mut self) -> Result<MapHeader>;
    async fn read_map_end(&mut self) -> Result<()>;

    async fn read_bool(&mut self) -> Result<bool>;
    async fn read_i8(&mut self) -> Result<i8>;
    async fn read_i16(&mut self) -> Result<i16>;
    async fn read_i32(&mut self) -> Result<i32>;
    async fn read_i64(&mut self) -> Result<i64>;
    async fn read_float(&mut self) -> Result<f32>;
    async fn read_double(&mut self) -> Result<f64>;
    async fn read_string(&mut self) -> Result<String>;
    async fn read_binary(&mut self) -> Result<Vec<u8>>;
}
