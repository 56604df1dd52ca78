//! Depth bounds and guard release on failure and cancellation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use wire_codec::core::guard::{DEFAULT_MAX_DEPTH, MAX_DEPTH_LIMIT};
use wire_codec::protocol::{FieldHeader, ListHeader, MapHeader};
use wire_codec::{
    BinaryReader, BinaryWriter, CodecConfig, CodecError, ProtocolReader, ProtocolWriter, Record,
    RecursionGuard, Result, StructCodec, StructDescriptor, TokenReader, TokenWriter,
    TypeDescriptor, TypeTag, Value,
};

/// A record with one field holding `lists` nested lists around an i32.
/// Its total depth is `lists + 1`.
fn nested(lists: usize) -> (Arc<StructDescriptor>, Record) {
    let mut ty = TypeDescriptor::I32;
    let mut value = Value::I32(1);
    for _ in 0..lists {
        ty = TypeDescriptor::list(ty);
        value = Value::List(vec![value]);
    }
    let desc = StructDescriptor::builder("Deep")
        .optional(1, "v", ty)
        .build()
        .unwrap();
    let record = Record::new(Arc::clone(&desc)).with("v", value).unwrap();
    (desc, record)
}

fn codec(max_depth: usize) -> StructCodec {
    StructCodec::new(CodecConfig {
        max_depth,
        ..CodecConfig::default()
    })
}

/// Bytes for a struct whose unknown field 1 opens `lists` nested list
/// headers and never closes them.
async fn hostile(lists: usize) -> Vec<u8> {
    let mut writer = BinaryWriter::new(Vec::new());
    writer
        .write_field_begin(&FieldHeader::new("v", TypeTag::List, 1))
        .await
        .unwrap();
    for _ in 0..lists {
        writer
            .write_list_begin(ListHeader {
                element: TypeTag::List,
                count: 1,
            })
            .await
            .unwrap();
    }
    writer.into_inner()
}

#[tokio::test]
async fn test_default_depth_boundary() {
    let codec = StructCodec::default();

    let (desc, at_limit) = nested(DEFAULT_MAX_DEPTH - 1);
    let mut writer = BinaryWriter::new(Vec::new());
    codec.write(&mut writer, &at_limit).await.expect("depth == max");
    let bytes = writer.into_inner();
    let decoded = codec
        .read(&mut BinaryReader::new(bytes.as_slice()), &desc)
        .await
        .expect("read at max");
    assert_eq!(decoded, at_limit);

    let (_, over) = nested(DEFAULT_MAX_DEPTH);
    let err = codec
        .write(&mut BinaryWriter::new(Vec::new()), &over)
        .await
        .expect_err("depth == max + 1");
    assert!(matches!(err, CodecError::DepthExceeded { depth, max }
        if depth == DEFAULT_MAX_DEPTH + 1 && max == DEFAULT_MAX_DEPTH));
}

#[tokio::test]
async fn test_hostile_nesting_fails_cleanly_with_oversized_max() {
    // Validation rejects this maximum; the guard clamps it anyway.
    let codec = codec(4096);
    assert!(!codec.config().validate().is_empty());

    let bytes = hostile(5000).await;
    let bare = StructDescriptor::builder("Deep").build().unwrap();
    let err = codec
        .read(&mut BinaryReader::new(bytes.as_slice()), &bare)
        .await
        .expect_err("nesting beyond the limit");
    assert!(matches!(err, CodecError::DepthExceeded { depth, max }
        if depth == MAX_DEPTH_LIMIT + 1 && max == MAX_DEPTH_LIMIT));
}

#[tokio::test]
async fn test_read_depth_exceeded_on_known_and_unknown_fields() {
    let (desc, record) = nested(8);
    let mut writer = BinaryWriter::new(Vec::new());
    codec(16).write(&mut writer, &record).await.unwrap();
    let bytes = writer.into_inner();

    let strict_depth = codec(8);
    let guard = strict_depth.new_guard();
    let err = strict_depth
        .read_with_guard(&mut BinaryReader::new(bytes.as_slice()), &desc, &guard)
        .await
        .expect_err("known field too deep");
    assert!(matches!(err, CodecError::DepthExceeded { depth: 9, max: 8 }));
    assert_eq!(guard.depth(), 0);

    // same bytes against a schema that does not know the field: skip is bounded too
    let bare = StructDescriptor::builder("Deep").build().unwrap();
    let err = strict_depth
        .read_with_guard(&mut BinaryReader::new(bytes.as_slice()), &bare, &guard)
        .await
        .expect_err("unknown field too deep");
    assert!(matches!(err, CodecError::DepthExceeded { .. }));
    assert_eq!(guard.depth(), 0);
}

#[tokio::test]
async fn test_guard_reusable_after_failure() {
    let (desc, record) = nested(3);
    let codec = codec(4);
    let guard = RecursionGuard::new(4);

    let (_, too_deep) = nested(4);
    assert!(codec
        .write_with_guard(&mut TokenWriter::new(), &too_deep, &guard)
        .await
        .is_err());
    assert_eq!(guard.depth(), 0);

    let mut writer = TokenWriter::new();
    codec
        .write_with_guard(&mut writer, &record, &guard)
        .await
        .unwrap();
    let decoded = codec
        .read_with_guard(&mut TokenReader::new(writer.into_tokens()), &desc, &guard)
        .await
        .unwrap();
    assert_eq!(decoded, record);
    assert_eq!(guard.depth(), 0);
}

/// Delegates to a token reader but never completes an i32 read.
struct StallingReader {
    inner: TokenReader,
}

#[async_trait]
impl ProtocolReader for StallingReader {
    async fn read_struct_begin(&mut self) -> Result<Option<String>> {
        self.inner.read_struct_begin().await
    }
    async fn read_struct_end(&mut self) -> Result<()> {
        self.inner.read_struct_end().await
    }
    async fn read_field_begin(&mut self) -> Result<FieldHeader> {
        self.inner.read_field_begin().await
    }
    async fn read_field_end(&mut self) -> Result<()> {
        self.inner.read_field_end().await
    }
    async fn read_list_begin(&mut self) -> Result<ListHeader> {
        self.inner.read_list_begin().await
    }
    async fn read_list_end(&mut self) -> Result<()> {
        self.inner.read_list_end().await
    }
    async fn read_set_begin(&mut self) -> Result<ListHeader> {
        self.inner.read_set_begin().await
    }
    async fn read_set_end(&mut self) -> Result<()> {
        self.inner.read_set_end().await
    }
    async fn read_map_begin(&mut self) -> Result<MapHeader> {
        self.inner.read_map_begin().await
    }
    async fn read_map_end(&mut self) -> Result<()> {
        self.inner.read_map_end().await
    }
    async fn read_bool(&mut self) -> Result<bool> {
        self.inner.read_bool().await
    }
    async fn read_i8(&mut self) -> Result<i8> {
        self.inner.read_i8().await
    }
    async fn read_i16(&mut self) -> Result<i16> {
        self.inner.read_i16().await
    }
    async fn read_i32(&mut self) -> Result<i32> {
        std::future::pending().await
    }
    async fn read_i64(&mut self) -> Result<i64> {
        self.inner.read_i64().await
    }
    async fn read_float(&mut self) -> Result<f32> {
        self.inner.read_float().await
    }
    async fn read_double(&mut self) -> Result<f64> {
        self.inner.read_double().await
    }
    async fn read_string(&mut self) -> Result<String> {
        self.inner.read_string().await
    }
    async fn read_binary(&mut self) -> Result<Vec<u8>> {
        self.inner.read_binary().await
    }
}

#[tokio::test]
async fn test_cancelled_read_releases_guard() {
    let (desc, record) = nested(5);
    let codec = codec(16);
    let mut writer = TokenWriter::new();
    codec.write(&mut writer, &record).await.unwrap();

    let mut stalling = StallingReader {
        inner: TokenReader::new(writer.into_tokens()),
    };
    let guard = codec.new_guard();
    let outcome = tokio::time::timeout(
        Duration::from_millis(20),
        codec.read_with_guard(&mut stalling, &desc, &guard),
    )
    .await;

    assert!(outcome.is_err(), "read should still be pending");
    assert_eq!(guard.depth(), 0);
}
