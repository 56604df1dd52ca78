//! # Binary Port
//!
//! Reference wire port over any tokio `AsyncRead` / `AsyncWrite`.
//!
//! ## Wire Format (big-endian)
//! ```text
//! field      [Tag(1)] [Id(2)]        stop  [0x00]
//! list/set   [ElemTag(1)] [Count(4)]
//! map        [KeyTag(1)] [ValTag(1)] [Count(4)]
//! string     [Len(4)] [UTF-8 bytes]  binary [Len(4)] [bytes]
//! bool       [0x00 | 0x01]           float/double IEEE-754 bits
//! ```
//! Struct begin/end and every end call emit nothing.
//!
//! ## Security
//! Declared string and container sizes are validated against configured
//! limits before any allocation.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::CodecConfig;
use crate::core::types::TypeTag;
use crate::error::{constants, CodecError, Result};
use crate::protocol::port::{FieldHeader, ListHeader, MapHeader, ProtocolReader, ProtocolWriter};

/// Size limits applied by [`BinaryReader`] before allocating
#[derive(Debug, Clone, Copy)]
pub struct ReadLimits {
    pub max_string_len: usize,
    pub max_container_len: usize,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self::from(&CodecConfig::default())
    }
}

impl From<&CodecConfig> for ReadLimits {
    fn from(config: &CodecConfig) -> Self {
        Self {
            max_string_len: config.max_string_len,
            max_container_len: config.max_container_len,
        }
    }
}

fn size_from_wire(raw: i32, limit: usize, what: &str) -> Result<usize> {
    let size = usize::try_from(raw).map_err(|_| {
        CodecError::Protocol(format!("{} ({what}): {raw}", constants::ERR_NEGATIVE_SIZE))
    })?;
    if size > limit {
        return Err(CodecError::Protocol(format!(
            "{what} size {size} exceeds limit {limit}"
        )));
    }
    Ok(size)
}

fn size_to_wire(size: usize, what: &str) -> Result<i32> {
    i32::try_from(size)
        .map_err(|_| CodecError::Protocol(format!("{what} size {size} does not fit the wire")))
}

pub struct BinaryWriter<W> {
    inner: W,
}

impl<W> BinaryWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    async fn write_tag(&mut self, tag: TypeTag) -> Result<()> {
        self.inner.write_u8(tag.to_byte()).await?;
        Ok(())
    }
}

#[async_trait]
impl<W> ProtocolWriter for BinaryWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_struct_begin(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn write_struct_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn write_field_begin(&mut self, header: &FieldHeader) -> Result<()> {
        self.write_tag(header.tag).await?;
        self.inner.write_i16(header.id).await?;
        Ok(())
    }

    async fn write_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn write_field_stop(&mut self) -> Result<()> {
        self.write_tag(TypeTag::Stop).await
    }

    async fn write_list_begin(&mut self, header: ListHeader) -> Result<()> {
        self.write_tag(header.element).await?;
        self.inner
            .write_i32(size_to_wire(header.count, "list")?)
            .await?;
        Ok(())
    }

    async fn write_list_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn write_set_begin(&mut self, header: ListHeader) -> Result<()> {
        self.write_tag(header.element).await?;
        self.inner.write_i32(size_to_wire(header.count, "set")?).await?;
        Ok(())
    }

    async fn write_set_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn write_map_begin(&mut self, header: MapHeader) -> Result<()> {
        self.write_tag(header.key).await?;
        self.write_tag(header.value).await?;
        self.inner.write_i32(size_to_wire(header.count, "map")?).await?;
        Ok(())
    }

    async fn write_map_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn write_bool(&mut self, value: bool) -> Result<()> {
        self.inner.write_u8(u8::from(value)).await?;
        Ok(())
    }

    async fn write_i8(&mut self, value: i8) -> Result<()> {
        self.inner.write_i8(value).await?;
        Ok(())
    }

    async fn write_i16(&mut self, value: i16) -> Result<()> {
        self.inner.write_i16(value).await?;
        Ok(())
    }

    async fn write_i32(&mut self, value: i32) -> Result<()> {
        self.inner.write_i32(value).await?;
        Ok(())
    }

    async fn write_i64(&mut self, value: i64) -> Result<()> {
        self.inner.write_i64(value).await?;
        Ok(())
    }

    async fn write_float(&mut self, value: f32) -> Result<()> {
        self.inner.write_u32(value.to_bits()).await?;
        Ok(())
    }

    async fn write_double(&mut self, value: f64) -> Result<()> {
        self.inner.write_u64(value.to_bits()).await?;
        Ok(())
    }

    async fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_binary(value.as_bytes()).await
    }

    async fn write_binary(&mut self, value: &[u8]) -> Result<()> {
        self.inner
            .write_i32(size_to_wire(value.len(), "binary")?)
            .await?;
        self.inner.write_all(value).await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.inner.flush().await?;
        Ok(())
    }
}

pub struct BinaryReader<R> {
    inner: R,
    limits: ReadLimits,
}

impl<R> BinaryReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(inner: R) -> Self {
        Self::with_limits(inner, ReadLimits::default())
    }

    pub fn with_limits(inner: R, limits: ReadLimits) -> Self {
        Self { inner, limits }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    async fn read_tag(&mut self) -> Result<TypeTag> {
        TypeTag::from_byte(self.inner.read_u8().await?)
    }

    async fn read_list_header(&mut self, what: &str) -> Result<ListHeader> {
        let element = self.read_tag().await?;
        let count = size_from_wire(
            self.inner.read_i32().await?,
            self.limits.max_container_len,
            what,
        )?;
        Ok(ListHeader { element, count })
    }
}

#[async_trait]
impl<R> ProtocolReader for BinaryReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_struct_begin(&mut self) -> Result<Option<String>> {
        Ok(None)
    }

    async fn read_struct_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn read_field_begin(&mut self) -> Result<FieldHeader> {
        let tag = self.read_tag().await?;
        if tag == TypeTag::Stop {
            return Ok(FieldHeader::stop());
        }
        let id = self.inner.read_i16().await?;
        Ok(FieldHeader {
            name: None,
            tag,
            id,
        })
    }

    async fn read_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn read_list_begin(&mut self) -> Result<ListHeader> {
        self.read_list_header("list").await
    }

    async fn read_list_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn read_set_begin(&mut self) -> Result<ListHeader> {
        self.read_list_header("set").await
    }

    async fn read_set_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn read_map_begin(&mut self) -> Result<MapHeader> {
        let key = self.read_tag().await?;
        let value = self.read_tag().await?;
        let count = size_from_wire(
            self.inner.read_i32().await?,
            self.limits.max_container_len,
            "map",
        )?;
        Ok(MapHeader { key, value, count })
    }

    async fn read_map_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn read_bool(&mut self) -> Result<bool> {
        Ok(self.inner.read_u8().await? != 0)
    }

    async fn read_i8(&mut self) -> Result<i8> {
        Ok(self.inner.read_i8().await?)
    }

    async fn read_i16(&mut self) -> Result<i16> {
        Ok(self.inner.read_i16().await?)
    }

    async fn read_i32(&mut self) -> Result<i32> {
        Ok(self.inner.read_i32().await?)
    }

    async fn read_i64(&mut self) -> Result<i64> {
        Ok(self.inner.read_i64().await?)
    }

    async fn read_float(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.inner.read_u32().await?))
    }

    async fn read_double(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.inner.read_u64().await?))
    }

    async fn read_string(&mut self) -> Result<String> {
        let raw = self.read_binary().await?;
        String::from_utf8(raw).map_err(|_| CodecError::protocol(constants::ERR_INVALID_UTF8))
    }

    async fn read_binary(&mut self) -> Result<Vec<u8>> {
        let len = size_from_wire(
            self.inner.read_i32().await?,
            self.limits.max_string_len,
            "string",
        )?;
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).await?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[allow(clippy::expect_used)]
    async fn test_scalar_layout() {
        let mut writer = BinaryWriter::new(Vec::new());
        writer
            .write_field_begin(&FieldHeader::new("x", TypeTag::I32, 1))
            .await
            .expect("field");
        writer.write_i32(3).await.expect("i32");
        writer.write_field_stop().await.expect("stop");

        let bytes = writer.into_inner();
        assert_eq!(bytes, vec![8, 0, 1, 0, 0, 0, 3, 0]);

        let mut reader = BinaryReader::new(&bytes[..]);
        let header = reader.read_field_begin().await.expect("field");
        assert_eq!(header.tag, TypeTag::I32);
        assert_eq!(header.id, 1);
        assert_eq!(header.name, None);
        assert_eq!(reader.read_i32().await.expect("i32"), 3);
        assert!(reader.read_field_begin().await.expect("stop").is_stop());
    }

    #[tokio::test]
    async fn test_negative_count_rejected() {
        let bytes = [TypeTag::I32.to_byte(), 0xFF, 0xFF, 0xFF, 0xFF];
        let mut reader = BinaryReader::new(&bytes[..]);
        assert!(matches!(
            reader.read_list_begin().await,
            Err(CodecError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_string_limit_checked_before_allocation() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&i32::MAX.to_be_bytes());
        let limits = ReadLimits {
            max_string_len: 16,
            max_container_len: 16,
        };
        let mut reader = BinaryReader::with_limits(&bytes[..], limits);
        assert!(matches!(
            reader.read_string().await,
            Err(CodecError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_truncated_input_is_transport_error() {
        let bytes = [0u8, 0];
        let mut reader = BinaryReader::new(&bytes[..]);
        assert!(matches!(
            reader.read_i32().await,
            Err(CodecError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_utf8_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2i32.to_be_bytes());
        bytes.extend_from_slice(&[0xC3, 0x28]);
        let mut reader = BinaryReader::new(&bytes[..]);
        assert!(matches!(
            reader.read_string().await,
            Err(CodecError::Protocol(_))
        ));
    }
}
