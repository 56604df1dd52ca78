//! # Token Port
//!
//! In-memory port that records the framing calls themselves as a flat
//! stream of [`WireToken`]s. Unlike the binary port it carries names and
//! explicit end markers, which makes it suited to fixtures and to checking
//! that framing is balanced.
//!
//! The reader keeps a stack of open frames. Inside a container every value
//! consumes one declared element slot (two per map entry); reading past the
//! declared count, ending a container early, or meeting an end token that
//! does not close the innermost frame is a protocol error.
//!
//! Floating point tokens serialize as their IEEE-754 bit pattern so that
//! NaN payloads, infinities and signed zeros survive a JSON fixture.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io;

use crate::core::types::TypeTag;
use crate::error::{constants, CodecError, Result};
use crate::protocol::port::{FieldHeader, ListHeader, MapHeader, ProtocolReader, ProtocolWriter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireToken {
    StructBegin(String),
    StructEnd,
    FieldBegin { name: String, tag: TypeTag, id: i16 },
    FieldEnd,
    FieldStop,
    ListBegin { element: TypeTag, count: usize },
    ListEnd,
    SetBegin { element: TypeTag, count: usize },
    SetEnd,
    MapBegin { key: TypeTag, value: TypeTag, count: usize },
    MapEnd,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Float(#[serde(with = "f32_bits")] f32),
    Double(#[serde(with = "f64_bits")] f64),
    String(String),
    Binary(Vec<u8>),
}

mod f32_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(value.to_bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        u32::deserialize(deserializer).map(f32::from_bits)
    }
}

mod f64_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.to_bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        u64::deserialize(deserializer).map(f64::from_bits)
    }
}

/// Collects tokens in memory
#[derive(Debug, Default)]
pub struct TokenWriter {
    tokens: Vec<WireToken>,
}

impl TokenWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> &[WireToken] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<WireToken> {
        self.tokens
    }

    /// Render the token stream as pretty JSON, for fixtures
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.tokens)
            .map_err(|e| CodecError::Protocol(format!("Failed to render tokens: {e}")))
    }

    fn push(&mut self, token: WireToken) -> Result<()> {
        self.tokens.push(token);
        Ok(())
    }
}

#[async_trait]
impl ProtocolWriter for TokenWriter {
    async fn write_struct_begin(&mut self, name: &str) -> Result<()> {
        self.push(WireToken::StructBegin(name.to_string()))
    }

    async fn write_struct_end(&mut self) -> Result<()> {
        self.push(WireToken::StructEnd)
    }

    async fn write_field_begin(&mut self, header: &FieldHeader) -> Result<()> {
        self.push(WireToken::FieldBegin {
            name: header.name.clone().unwrap_or_default(),
            tag: header.tag,
            id: header.id,
        })
    }

    async fn write_field_end(&mut self) -> Result<()> {
        self.push(WireToken::FieldEnd)
    }

    async fn write_field_stop(&mut self) -> Result<()> {
        self.push(WireToken::FieldStop)
    }

    async fn write_list_begin(&mut self, header: ListHeader) -> Result<()> {
        self.push(WireToken::ListBegin {
            element: header.element,
            count: header.count,
        })
    }

    async fn write_list_end(&mut self) -> Result<()> {
        self.push(WireToken::ListEnd)
    }

    async fn write_set_begin(&mut self, header: ListHeader) -> Result<()> {
        self.push(WireToken::SetBegin {
            element: header.element,
            count: header.count,
        })
    }

    async fn write_set_end(&mut self) -> Result<()> {
        self.push(WireToken::SetEnd)
    }

    async fn write_map_begin(&mut self, header: MapHeader) -> Result<()> {
        self.push(WireToken::MapBegin {
            key: header.key,
            value: header.value,
            count: header.count,
        })
    }

    async fn write_map_end(&mut self) -> Result<()> {
        self.push(WireToken::MapEnd)
    }

    async fn write_bool(&mut self, value: bool) -> Result<()> {
        self.push(WireToken::Bool(value))
    }

    async fn write_i8(&mut self, value: i8) -> Result<()> {
        self.push(WireToken::I8(value))
    }

    async fn write_i16(&mut self, value: i16) -> Result<()> {
        self.push(WireToken::I16(value))
    }

    async fn write_i32(&mut self, value: i32) -> Result<()> {
        self.push(WireToken::I32(value))
    }

    async fn write_i64(&mut self, value: i64) -> Result<()> {
        self.push(WireToken::I64(value))
    }

    async fn write_float(&mut self, value: f32) -> Result<()> {
        self.push(WireToken::Float(value))
    }

    async fn write_double(&mut self, value: f64) -> Result<()> {
        self.push(WireToken::Double(value))
    }

    async fn write_string(&mut self, value: &str) -> Result<()> {
        self.push(WireToken::String(value.to_string()))
    }

    async fn write_binary(&mut self, value: &[u8]) -> Result<()> {
        self.push(WireToken::Binary(value.to_vec()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Struct,
    List,
    Set,
    Map,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    /// Element slots still to be read; unused for structs
    remaining: usize,
}

/// Replays a token stream, verifying framing as it goes
#[derive(Debug)]
pub struct TokenReader {
    tokens: VecDeque<WireToken>,
    frames: Vec<Frame>,
}

impl TokenReader {
    pub fn new(tokens: impl Into<VecDeque<WireToken>>) -> Self {
        Self {
            tokens: tokens.into(),
            frames: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let tokens: Vec<WireToken> = serde_json::from_str(json)
            .map_err(|e| CodecError::Protocol(format!("Failed to parse tokens: {e}")))?;
        Ok(Self::new(tokens))
    }

    /// Tokens not yet consumed
    pub fn remaining(&self) -> usize {
        self.tokens.len()
    }

    fn exhausted() -> CodecError {
        CodecError::Transport(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "token stream exhausted",
        ))
    }

    fn next(&mut self) -> Result<WireToken> {
        self.tokens.pop_front().ok_or_else(Self::exhausted)
    }

    fn peek(&self) -> Result<WireToken> {
        self.tokens.front().cloned().ok_or_else(Self::exhausted)
    }

    /// Account for one value being read inside the innermost frame.
    fn consume_slot(&mut self) -> Result<()> {
        if let Some(frame) = self.frames.last_mut() {
            if frame.kind != FrameKind::Struct {
                if frame.remaining == 0 {
                    return Err(CodecError::protocol(constants::ERR_CONTAINER_OVERRUN));
                }
                frame.remaining -= 1;
            }
        }
        Ok(())
    }

    fn open(&mut self, kind: FrameKind, remaining: usize) -> Result<()> {
        self.consume_slot()?;
        self.frames.push(Frame { kind, remaining });
        Ok(())
    }

    fn close(&mut self, kind: FrameKind, expected: WireToken) -> Result<()> {
        match self.frames.last() {
            Some(frame) if frame.kind == kind => {
                if frame.remaining != 0 {
                    return Err(CodecError::protocol(constants::ERR_CONTAINER_UNDERRUN));
                }
            }
            _ => return Err(CodecError::protocol(constants::ERR_UNBALANCED_END)),
        }
        let token = self.next()?;
        if token != expected {
            return Err(CodecError::Protocol(format!(
                "{}: expected {expected:?}, found {token:?}",
                constants::ERR_UNBALANCED_END
            )));
        }
        self.frames.pop();
        Ok(())
    }

    fn mismatch(expected: &str, found: &WireToken) -> CodecError {
        CodecError::Protocol(format!("expected {expected}, found {found:?}"))
    }

    fn scalar(&mut self) -> Result<WireToken> {
        self.consume_slot()?;
        self.next()
    }
}

#[async_trait]
impl ProtocolReader for TokenReader {
    async fn read_struct_begin(&mut self) -> Result<Option<String>> {
        let token = self.peek()?;
        match token {
            WireToken::StructBegin(name) => {
                self.open(FrameKind::Struct, 0)?;
                self.next()?;
                Ok(Some(name))
            }
            other => Err(Self::mismatch("struct begin", &other)),
        }
    }

    async fn read_struct_end(&mut self) -> Result<()> {
        self.close(FrameKind::Struct, WireToken::StructEnd)
    }

    async fn read_field_begin(&mut self) -> Result<FieldHeader> {
        match self.next()? {
            WireToken::FieldBegin { name, tag, id } => Ok(FieldHeader {
                name: Some(name),
                tag,
                id,
            }),
            WireToken::FieldStop => Ok(FieldHeader::stop()),
            other => Err(Self::mismatch("field begin or stop", &other)),
        }
    }

    async fn read_field_end(&mut self) -> Result<()> {
        match self.next()? {
            WireToken::FieldEnd => Ok(()),
            other => Err(Self::mismatch("field end", &other)),
        }
    }

    async fn read_list_begin(&mut self) -> Result<ListHeader> {
        let token = self.peek()?;
        match token {
            WireToken::ListBegin { element, count } => {
                self.open(FrameKind::List, count)?;
                self.next()?;
                Ok(ListHeader { element, count })
            }
            other => Err(Self::mismatch("list begin", &other)),
        }
    }

    async fn read_list_end(&mut self) -> Result<()> {
        self.close(FrameKind::List, WireToken::ListEnd)
    }

    async fn read_set_begin(&mut self) -> Result<ListHeader> {
        let token = self.peek()?;
        match token {
            WireToken::SetBegin { element, count } => {
                self.open(FrameKind::Set, count)?;
                self.next()?;
                Ok(ListHeader { element, count })
            }
            other => Err(Self::mismatch("set begin", &other)),
        }
    }

    async fn read_set_end(&mut self) -> Result<()> {
        self.close(FrameKind::Set, WireToken::SetEnd)
    }

    async fn read_map_begin(&mut self) -> Result<MapHeader> {
        let token = self.peek()?;
        match token {
            WireToken::MapBegin { key, value, count } => {
                let slots = count.checked_mul(2).ok_or_else(|| {
                    CodecError::Protocol(format!("map size {count} overflows"))
                })?;
                self.open(FrameKind::Map, slots)?;
                self.next()?;
                Ok(MapHeader { key, value, count })
            }
            other => Err(Self::mismatch("map begin", &other)),
        }
    }

    async fn read_map_end(&mut self) -> Result<()> {
        self.close(FrameKind::Map, WireToken::MapEnd)
    }

    async fn read_bool(&mut self) -> Result<bool> {
        match self.scalar()? {
            WireToken::Bool(v) => Ok(v),
            other => Err(Self::mismatch("bool", &other)),
        }
    }

    async fn read_i8(&mut self) -> Result<i8> {
        match self.scalar()? {
            WireToken::I8(v) => Ok(v),
            other => Err(Self::mismatch("i8", &other)),
        }
    }

    async fn read_i16(&mut self) -> Result<i16> {
        match self.scalar()? {
            WireToken::I16(v) => Ok(v),
            other => Err(Self::mismatch("i16", &other)),
        }
    }

    async fn read_i32(&mut self) -> Result<i32> {
        match self.scalar()? {
            WireToken::I32(v) => Ok(v),
            other => Err(Self::mismatch("i32", &other)),
        }
    }

    async fn read_i64(&mut self) -> Result<i64> {
        match self.scalar()? {
            WireToken::I64(v) => Ok(v),
            other => Err(Self::mismatch("i64", &other)),
        }
    }

    async fn read_float(&mut self) -> Result<f32> {
        match self.scalar()? {
            WireToken::Float(v) => Ok(v),
            other => Err(Self::mismatch("float", &other)),
        }
    }

    async fn read_double(&mut self) -> Result<f64> {
        match self.scalar()? {
            WireToken::Double(v) => Ok(v),
            other => Err(Self::mismatch("double", &other)),
        }
    }

    async fn read_string(&mut self) -> Result<String> {
        match self.scalar()? {
            WireToken::String(v) => Ok(v),
            other => Err(Self::mismatch("string", &other)),
        }
    }

    async fn read_binary(&mut self) -> Result<Vec<u8>> {
        match self.scalar()? {
            WireToken::Binary(v) => Ok(v),
            other => Err(Self::mismatch("binary", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[allow(clippy::expect_used)]
    async fn test_list_count_must_match_terminator() {
        let mut reader = TokenReader::new(vec![
            WireToken::ListBegin {
                element: TypeTag::I32,
                count: 2,
            },
            WireToken::I32(1),
            WireToken::ListEnd,
        ]);
        let header = reader.read_list_begin().await.expect("begin");
        assert_eq!(header.count, 2);
        reader.read_i32().await.expect("first");
        assert!(matches!(
            reader.read_list_end().await,
            Err(CodecError::Protocol(_))
        ));
    }

    #[tokio::test]
    #[allow(clippy::expect_used)]
    async fn test_overrun_rejected() {
        let mut reader = TokenReader::new(vec![
            WireToken::SetBegin {
                element: TypeTag::I32,
                count: 1,
            },
            WireToken::I32(1),
            WireToken::I32(2),
            WireToken::SetEnd,
        ]);
        reader.read_set_begin().await.expect("begin");
        reader.read_i32().await.expect("first");
        assert!(matches!(
            reader.read_i32().await,
            Err(CodecError::Protocol(_))
        ));
    }

    #[tokio::test]
    #[allow(clippy::expect_used)]
    async fn test_missing_end_token_rejected() {
        let mut reader = TokenReader::new(vec![
            WireToken::MapBegin {
                key: TypeTag::String,
                value: TypeTag::I8,
                count: 1,
            },
            WireToken::String("k".into()),
            WireToken::I8(1),
            WireToken::StructEnd,
        ]);
        reader.read_map_begin().await.expect("begin");
        reader.read_string().await.expect("key");
        reader.read_i8().await.expect("value");
        assert!(matches!(
            reader.read_map_end().await,
            Err(CodecError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_exhausted_stream_is_transport_error() {
        let mut reader = TokenReader::new(Vec::new());
        assert!(matches!(
            reader.read_field_begin().await,
            Err(CodecError::Transport(_))
        ));
    }

    #[tokio::test]
    #[allow(clippy::expect_used)]
    async fn test_json_roundtrip() {
        let mut writer = TokenWriter::new();
        writer.write_struct_begin("Point").await.expect("begin");
        writer
            .write_field_begin(&FieldHeader::new("x", TypeTag::I32, 1))
            .await
            .expect("field");
        writer.write_i32(3).await.expect("value");
        writer.write_field_end().await.expect("field end");
        writer.write_field_stop().await.expect("stop");
        writer.write_struct_end().await.expect("end");

        let json = writer.to_json().expect("json");
        let reader = TokenReader::from_json(&json).expect("parse");
        assert_eq!(reader.remaining(), writer.tokens().len());
    }

    #[tokio::test]
    #[allow(clippy::expect_used)]
    async fn test_json_preserves_float_bits() {
        let doubles = [
            127_756_108_765.682_19_f64,
            f64::NAN,
            f64::INFINITY,
            f64::NEG_INFINITY,
            -0.0,
            f64::MIN_POSITIVE,
        ];
        let mut writer = TokenWriter::new();
        for value in doubles {
            writer.write_double(value).await.expect("double");
        }
        writer.write_float(f32::NAN).await.expect("float");
        writer.write_float(f32::NEG_INFINITY).await.expect("float");

        let json = writer.to_json().expect("json");
        let mut reader = TokenReader::from_json(&json).expect("parse");
        for value in doubles {
            let read = reader.read_double().await.expect("double");
            assert_eq!(read.to_bits(), value.to_bits());
        }
        assert!(reader.read_float().await.expect("float").is_nan());
        assert_eq!(
            reader.read_float().await.expect("float"),
            f32::NEG_INFINITY
        );
    }

    #[tokio::test]
    #[allow(clippy::expect_used)]
    async fn test_struct_begin_mismatch_leaves_frames_untouched() {
        let mut reader = TokenReader::new(vec![
            WireToken::ListBegin {
                element: TypeTag::Struct,
                count: 1,
            },
            WireToken::I32(7),
            WireToken::StructBegin("Point".into()),
            WireToken::StructEnd,
            WireToken::ListEnd,
        ]);
        reader.read_list_begin().await.expect("begin");
        assert!(matches!(
            reader.read_struct_begin().await,
            Err(CodecError::Protocol(_))
        ));
        assert_eq!(reader.remaining(), 4);
        assert_eq!(reader.frames.len(), 1);
        assert_eq!(reader.frames[0].remaining, 1);

        // The offending token is still queued; drop it and carry on.
        reader.tokens.pop_front();
        reader.read_struct_begin().await.expect("struct");
        reader.read_struct_end().await.expect("struct end");
        reader.read_list_end().await.expect("list end");
    }
}
