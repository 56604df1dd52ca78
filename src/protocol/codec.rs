//! # Struct Codec
//!
//! One generic read/write algorithm for every record type, driven by the
//! record's [`StructDescriptor`] instead of per-type generated code.
//!
//! ## Write path
//! Fields are written in declaration order. A field is written when it is
//! present or required; unset required fields carry their default. The field
//! list ends with the stop marker.
//!
//! ## Read path
//! Fields are matched by wire id, in whatever order they arrive. A known id
//! whose wire tag agrees with the descriptor is decoded and marked present.
//! Unknown ids and disagreeing tags are consumed through [`skip`] and leave
//! the slot unset, unless `strict_types` is on, in which case a disagreeing
//! tag fails with `SchemaMismatch`. Missing required fields do not fail the
//! read; [`Record::validate`] is there for callers that care.
//!
//! ## Containers
//! Counts are written up front from the caller's value and on read exactly
//! the declared number of elements is consumed before the matching end call.
//! Sets and maps keep the last of duplicate elements or keys.
//!
//! Every struct and container descent holds a level of the recursion guard
//! for its whole body, on the write path as well as the read path.

use futures::future::{BoxFuture, FutureExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::CodecConfig;
use crate::core::guard::RecursionGuard;
use crate::core::schema::StructDescriptor;
use crate::core::types::{TypeDescriptor, TypeTag};
use crate::core::value::{Record, Value};
use crate::error::{constants, CodecError, Result};
use crate::protocol::binary::{BinaryReader, BinaryWriter, ReadLimits};
use crate::protocol::port::{FieldHeader, ListHeader, MapHeader, ProtocolReader, ProtocolWriter};
use crate::protocol::skip::skip;
use crate::utils::metrics::CodecMetrics;

/// Upper bound on capacity reserved from a wire-declared count
const PREALLOC_LIMIT: usize = 1024;

/// Result of decoding one value against its descriptor
enum Decoded {
    Value(Value),
    /// The wire carried a different shape somewhere inside; it was consumed
    /// and discarded.
    Skipped { expected: TypeTag, found: TypeTag },
}

/// Schema-driven codec for records and values
#[derive(Debug, Clone, Default)]
pub struct StructCodec {
    config: CodecConfig,
    metrics: Option<Arc<CodecMetrics>>,
}

impl StructCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    /// Report counters into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<CodecMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn metrics(&self) -> Option<&Arc<CodecMetrics>> {
        self.metrics.as_ref()
    }

    /// A fresh guard sized from the configuration
    pub fn new_guard(&self) -> RecursionGuard {
        RecursionGuard::new(self.config.max_depth)
    }

    fn walker<'c>(&'c self, guard: &'c RecursionGuard) -> Walker<'c> {
        Walker {
            config: &self.config,
            guard,
            metrics: self.metrics.as_deref(),
        }
    }

    fn observe<T>(&self, result: &Result<T>) {
        if let (Some(metrics), Err(err)) = (&self.metrics, result) {
            metrics.error(err);
        }
    }

    /// Write `record` as one struct
    #[instrument(level = "trace", skip_all, fields(record = %record.name()))]
    pub async fn write<W>(&self, port: &mut W, record: &Record) -> Result<()>
    where
        W: ProtocolWriter + ?Sized,
    {
        let guard = self.new_guard();
        self.write_with_guard(port, record, &guard).await
    }

    /// Write `record` under a caller-owned guard
    pub async fn write_with_guard<W>(
        &self,
        port: &mut W,
        record: &Record,
        guard: &RecursionGuard,
    ) -> Result<()>
    where
        W: ProtocolWriter + ?Sized,
    {
        let result = async {
            self.walker(guard).write_struct(&mut *port, record).await?;
            port.flush().await
        }
        .await;
        self.observe(&result);
        if result.is_ok() {
            if let Some(metrics) = &self.metrics {
                metrics.record_written();
            }
        }
        result
    }

    /// Read one struct described by `descriptor`
    #[instrument(level = "trace", skip_all, fields(record = %descriptor.name()))]
    pub async fn read<R>(&self, port: &mut R, descriptor: &Arc<StructDescriptor>) -> Result<Record>
    where
        R: ProtocolReader + ?Sized,
    {
        let guard = self.new_guard();
        self.read_with_guard(port, descriptor, &guard).await
    }

    /// Read one struct under a caller-owned guard
    pub async fn read_with_guard<R>(
        &self,
        port: &mut R,
        descriptor: &Arc<StructDescriptor>,
        guard: &RecursionGuard,
    ) -> Result<Record>
    where
        R: ProtocolReader + ?Sized,
    {
        let result = self.walker(guard).read_struct(port, descriptor).await;
        self.observe(&result);
        if result.is_ok() {
            if let Some(metrics) = &self.metrics {
                metrics.record_read();
            }
        }
        result
    }

    /// Write a standalone value of shape `ty`
    pub async fn write_value<W>(&self, port: &mut W, ty: &TypeDescriptor, value: &Value) -> Result<()>
    where
        W: ProtocolWriter + ?Sized,
    {
        let guard = self.new_guard();
        let result = async {
            self.walker(&guard)
                .write_value(&mut *port, ty, value, "<value>")
                .await?;
            port.flush().await
        }
        .await;
        self.observe(&result);
        result
    }

    /// Read a standalone value of shape `ty`. A value that cannot be
    /// decoded against `ty` fails with `SchemaMismatch`, there being no
    /// field to leave unset.
    pub async fn read_value<R>(&self, port: &mut R, ty: &TypeDescriptor) -> Result<Value>
    where
        R: ProtocolReader + ?Sized,
    {
        let guard = self.new_guard();
        let result = match self
            .walker(&guard)
            .read_value(port, ty, ty.tag(), "<value>")
            .await
        {
            Ok(Decoded::Value(value)) => Ok(value),
            Ok(Decoded::Skipped { expected, found }) => Err(CodecError::SchemaMismatch {
                field: "<value>".to_string(),
                expected,
                found,
            }),
            Err(err) => Err(err),
        };
        self.observe(&result);
        result
    }

    /// Consume one value of wire shape `tag` without decoding it
    pub async fn skip<R>(&self, port: &mut R, tag: TypeTag) -> Result<()>
    where
        R: ProtocolReader + ?Sized,
    {
        let guard = self.new_guard();
        let result = skip(port, tag, &guard).await;
        self.observe(&result);
        result
    }

    /// Encode `record` with the binary port into a fresh buffer
    pub async fn encode_to_vec(&self, record: &Record) -> Result<Vec<u8>> {
        let mut port = BinaryWriter::new(Vec::new());
        self.write(&mut port, record).await?;
        Ok(port.into_inner())
    }

    /// Decode one binary-encoded struct that must span all of `bytes`
    pub async fn decode_from_slice(
        &self,
        bytes: &[u8],
        descriptor: &Arc<StructDescriptor>,
    ) -> Result<Record> {
        let mut port = BinaryReader::with_limits(bytes, ReadLimits::from(&self.config));
        let record = self.read(&mut port, descriptor).await?;
        if !port.get_ref().is_empty() {
            return Err(CodecError::Protocol(format!(
                "{}: {}",
                constants::ERR_TRAILING_BYTES,
                port.get_ref().len()
            )));
        }
        Ok(record)
    }
}

/// Read a numeric value tagged `wire` and widen it to f64.
async fn read_as_f64<R>(port: &mut R, wire: TypeTag) -> Result<f64>
where
    R: ProtocolReader + ?Sized,
{
    Ok(match wire {
        TypeTag::I8 => f64::from(port.read_i8().await?),
        TypeTag::I16 => f64::from(port.read_i16().await?),
        TypeTag::I32 => f64::from(port.read_i32().await?),
        TypeTag::I64 => port.read_i64().await? as f64,
        TypeTag::Float => f64::from(port.read_float().await?),
        _ => port.read_double().await?,
    })
}

/// Per-invocation view of the codec: configuration, guard and metrics
#[derive(Clone, Copy)]
struct Walker<'c> {
    config: &'c CodecConfig,
    guard: &'c RecursionGuard,
    metrics: Option<&'c CodecMetrics>,
}

impl<'c> Walker<'c> {
    /// Whether a value tagged `wire` can be decoded as `ty`.
    fn accepts_tag(&self, ty: &TypeDescriptor, wire: TypeTag) -> bool {
        let declared = ty.tag();
        if declared == wire {
            return true;
        }
        if matches!(ty, TypeDescriptor::Enum(_)) && wire == TypeTag::String {
            return true;
        }
        if self.config.promote_integers {
            if let (Some(from), Some(to)) = (wire.int_rank(), declared.int_rank()) {
                return from < to;
            }
        }
        if self.config.promote_floats && declared.is_float() {
            return wire.is_float() || wire.int_rank().is_some();
        }
        false
    }

    fn note_skipped(&self) {
        if let Some(metrics) = self.metrics {
            metrics.field_skipped();
        }
    }

    fn write_struct<'a, W>(self, port: &'a mut W, record: &'a Record) -> BoxFuture<'a, Result<()>>
    where
        W: ProtocolWriter + ?Sized,
        'c: 'a,
    {
        async move {
            let _level = self.guard.enter()?;
            port.write_struct_begin(record.name()).await?;
            for (field, value, isset) in record.iter_all() {
                if !isset && !field.is_required() {
                    continue;
                }
                let header = FieldHeader::new(field.name(), field.tag(), field.id());
                port.write_field_begin(&header).await?;
                self.write_value(&mut *port, field.ty(), value, field.name())
                    .await?;
                port.write_field_end().await?;
            }
            port.write_field_stop().await?;
            port.write_struct_end().await
        }
        .boxed()
    }

    fn write_value<'a, W>(
        self,
        port: &'a mut W,
        ty: &'a TypeDescriptor,
        value: &'a Value,
        field: &'a str,
    ) -> BoxFuture<'a, Result<()>>
    where
        W: ProtocolWriter + ?Sized,
        'c: 'a,
    {
        async move {
            match (ty, value) {
                (TypeDescriptor::Bool, Value::Bool(v)) => port.write_bool(*v).await,
                (TypeDescriptor::I8, Value::I8(v)) => port.write_i8(*v).await,
                (TypeDescriptor::I16, Value::I16(v)) => port.write_i16(*v).await,
                (TypeDescriptor::I32 | TypeDescriptor::Enum(_), Value::I32(v)) => {
                    port.write_i32(*v).await
                }
                (TypeDescriptor::I64, Value::I64(v)) => port.write_i64(*v).await,
                (TypeDescriptor::Float, Value::Float(v)) => port.write_float(*v).await,
                (TypeDescriptor::Double, Value::Double(v)) => port.write_double(*v).await,
                (TypeDescriptor::String, Value::String(v)) => port.write_string(v).await,
                (TypeDescriptor::Binary, Value::Binary(v)) => port.write_binary(v).await,
                (TypeDescriptor::Struct(desc), Value::Struct(record))
                    if record.descriptor().same_shape(desc) =>
                {
                    self.write_struct(port, record).await
                }
                (TypeDescriptor::List(elem), Value::List(items)) => {
                    let _level = self.guard.enter()?;
                    port.write_list_begin(ListHeader {
                        element: elem.tag(),
                        count: items.len(),
                    })
                    .await?;
                    for item in items {
                        self.write_value(&mut *port, elem, item, field).await?;
                    }
                    port.write_list_end().await
                }
                (TypeDescriptor::Set(elem), Value::Set(items)) => {
                    let _level = self.guard.enter()?;
                    port.write_set_begin(ListHeader {
                        element: elem.tag(),
                        count: items.len(),
                    })
                    .await?;
                    for item in items {
                        self.write_value(&mut *port, elem, item, field).await?;
                    }
                    port.write_set_end().await
                }
                (TypeDescriptor::Map(key_ty, value_ty), Value::Map(entries)) => {
                    let _level = self.guard.enter()?;
                    port.write_map_begin(MapHeader {
                        key: key_ty.tag(),
                        value: value_ty.tag(),
                        count: entries.len(),
                    })
                    .await?;
                    for (key, val) in entries {
                        self.write_value(&mut *port, key_ty, key, field).await?;
                        self.write_value(&mut *port, value_ty, val, field).await?;
                    }
                    port.write_map_end().await
                }
                _ => Err(CodecError::SchemaMismatch {
                    field: field.to_string(),
                    expected: ty.tag(),
                    found: value.tag(),
                }),
            }
        }
        .boxed()
    }

    fn read_struct<'a, R>(
        self,
        port: &'a mut R,
        descriptor: &'a Arc<StructDescriptor>,
    ) -> BoxFuture<'a, Result<Record>>
    where
        R: ProtocolReader + ?Sized,
        'c: 'a,
    {
        async move {
            let _level = self.guard.enter()?;
            port.read_struct_begin().await?;
            let mut record = Record::new(Arc::clone(descriptor));

            loop {
                let header = port.read_field_begin().await?;
                if header.is_stop() {
                    break;
                }

                match descriptor.field_by_id(header.id) {
                    Some((index, field)) if self.accepts_tag(field.ty(), header.tag) => {
                        match self
                            .read_value(&mut *port, field.ty(), header.tag, field.name())
                            .await?
                        {
                            Decoded::Value(value) => record.set_decoded(index, value),
                            Decoded::Skipped { expected, found } => {
                                debug!(
                                    record = descriptor.name(),
                                    field_id = header.id,
                                    %expected,
                                    %found,
                                    "Discarded field with mismatched element shape"
                                );
                                self.note_skipped();
                            }
                        }
                    }
                    Some((_, field)) => {
                        if self.config.strict_types {
                            return Err(CodecError::SchemaMismatch {
                                field: field.name().to_string(),
                                expected: field.tag(),
                                found: header.tag,
                            });
                        }
                        debug!(
                            record = descriptor.name(),
                            field_id = header.id,
                            expected = %field.tag(),
                            wire_tag = %header.tag,
                            "Skipping field with mismatched type"
                        );
                        skip(&mut *port, header.tag, self.guard).await?;
                        self.note_skipped();
                    }
                    None => {
                        debug!(
                            record = descriptor.name(),
                            field_id = header.id,
                            wire_tag = %header.tag,
                            "Skipping unknown field"
                        );
                        skip(&mut *port, header.tag, self.guard).await?;
                        self.note_skipped();
                    }
                }

                port.read_field_end().await?;
            }

            port.read_struct_end().await?;
            Ok(record)
        }
        .boxed()
    }

    /// Decode one value tagged `wire`, which must satisfy `accepts_tag(ty, wire)`.
    fn read_value<'a, R>(
        self,
        port: &'a mut R,
        ty: &'a TypeDescriptor,
        wire: TypeTag,
        field: &'a str,
    ) -> BoxFuture<'a, Result<Decoded>>
    where
        R: ProtocolReader + ?Sized,
        'c: 'a,
    {
        async move {
            let value = match ty {
                TypeDescriptor::Bool => Value::Bool(port.read_bool().await?),
                TypeDescriptor::I8 => Value::I8(port.read_i8().await?),
                TypeDescriptor::I16 => match wire {
                    TypeTag::I8 => Value::I16(i16::from(port.read_i8().await?)),
                    _ => Value::I16(port.read_i16().await?),
                },
                TypeDescriptor::I32 => match wire {
                    TypeTag::I8 => Value::I32(i32::from(port.read_i8().await?)),
                    TypeTag::I16 => Value::I32(i32::from(port.read_i16().await?)),
                    _ => Value::I32(port.read_i32().await?),
                },
                TypeDescriptor::I64 => match wire {
                    TypeTag::I8 => Value::I64(i64::from(port.read_i8().await?)),
                    TypeTag::I16 => Value::I64(i64::from(port.read_i16().await?)),
                    TypeTag::I32 => Value::I64(i64::from(port.read_i32().await?)),
                    _ => Value::I64(port.read_i64().await?),
                },
                TypeDescriptor::Float => match wire {
                    TypeTag::Float => Value::Float(port.read_float().await?),
                    _ => Value::Float(read_as_f64(&mut *port, wire).await? as f32),
                },
                TypeDescriptor::Double => Value::Double(read_as_f64(&mut *port, wire).await?),
                TypeDescriptor::String => Value::String(port.read_string().await?),
                TypeDescriptor::Binary => Value::Binary(port.read_binary().await?.into()),
                TypeDescriptor::Enum(desc) => match wire {
                    TypeTag::String => {
                        let symbol = port.read_string().await?;
                        match desc.value_of(&symbol) {
                            Some(v) => Value::I32(v),
                            None => {
                                debug!(enum_name = desc.name(), %symbol, "Unknown enum symbol");
                                return self.discard(field, TypeTag::I32, TypeTag::String);
                            }
                        }
                    }
                    _ => Value::I32(port.read_i32().await?),
                },
                TypeDescriptor::Struct(desc) => Value::Struct(self.read_struct(port, desc).await?),
                TypeDescriptor::List(elem) => {
                    let _level = self.guard.enter()?;
                    let header = port.read_list_begin().await?;
                    let items = self
                        .read_elements(&mut *port, elem, header.element, header.count, field)
                        .await?;
                    port.read_list_end().await?;
                    match items {
                        Ok(items) => Value::List(items),
                        Err((expected, found)) => return Ok(Decoded::Skipped { expected, found }),
                    }
                }
                TypeDescriptor::Set(elem) => {
                    let _level = self.guard.enter()?;
                    let header = port.read_set_begin().await?;
                    let items = self
                        .read_elements(&mut *port, elem, header.element, header.count, field)
                        .await?;
                    port.read_set_end().await?;
                    match items {
                        Ok(items) => {
                            let mut set = BTreeSet::new();
                            for item in items {
                                set.replace(item);
                            }
                            Value::Set(set)
                        }
                        Err((expected, found)) => return Ok(Decoded::Skipped { expected, found }),
                    }
                }
                TypeDescriptor::Map(key_ty, value_ty) => {
                    let _level = self.guard.enter()?;
                    let header = port.read_map_begin().await?;
                    let entries = self
                        .read_entries(&mut *port, key_ty, value_ty, header, field)
                        .await?;
                    port.read_map_end().await?;
                    match entries {
                        Ok(entries) => Value::Map(entries),
                        Err((expected, found)) => return Ok(Decoded::Skipped { expected, found }),
                    }
                }
            };
            Ok(Decoded::Value(value))
        }
        .boxed()
    }

    /// Shape disagreement below field level: an error in strict mode,
    /// otherwise the enclosing field is dropped.
    fn discard(&self, field: &str, expected: TypeTag, found: TypeTag) -> Result<Decoded> {
        if self.config.strict_types {
            return Err(CodecError::SchemaMismatch {
                field: field.to_string(),
                expected,
                found,
            });
        }
        Ok(Decoded::Skipped { expected, found })
    }

    /// Read exactly `count` elements. The inner `Err` carries the
    /// (expected, found) tags when the elements were consumed but discarded.
    async fn read_elements<R>(
        self,
        port: &mut R,
        elem: &TypeDescriptor,
        wire: TypeTag,
        count: usize,
        field: &str,
    ) -> Result<std::result::Result<Vec<Value>, (TypeTag, TypeTag)>>
    where
        R: ProtocolReader + ?Sized,
    {
        if count == 0 {
            return Ok(Ok(Vec::new()));
        }

        let mut mismatch = None;
        if !self.accepts_tag(elem, wire) {
            if let Decoded::Skipped { expected, found } = self.discard(field, elem.tag(), wire)? {
                mismatch = Some((expected, found));
            }
        }

        let mut items = Vec::with_capacity(count.min(PREALLOC_LIMIT));
        for _ in 0..count {
            if mismatch.is_some() {
                skip(&mut *port, wire, self.guard).await?;
                continue;
            }
            match self.read_value(&mut *port, elem, wire, field).await? {
                Decoded::Value(value) => items.push(value),
                Decoded::Skipped { expected, found } => mismatch = Some((expected, found)),
            }
        }

        Ok(match mismatch {
            Some(tags) => Err(tags),
            None => Ok(items),
        })
    }

    async fn read_entries<R>(
        self,
        port: &mut R,
        key_ty: &TypeDescriptor,
        value_ty: &TypeDescriptor,
        header: MapHeader,
        field: &str,
    ) -> Result<std::result::Result<BTreeMap<Value, Value>, (TypeTag, TypeTag)>>
    where
        R: ProtocolReader + ?Sized,
    {
        let mut entries = BTreeMap::new();
        if header.count == 0 {
            return Ok(Ok(entries));
        }

        let mut mismatch = None;
        for (ty, wire) in [(key_ty, header.key), (value_ty, header.value)] {
            if mismatch.is_none() && !self.accepts_tag(ty, wire) {
                if let Decoded::Skipped { expected, found } = self.discard(field, ty.tag(), wire)? {
                    mismatch = Some((expected, found));
                }
            }
        }

        for _ in 0..header.count {
            if mismatch.is_some() {
                skip(&mut *port, header.key, self.guard).await?;
                skip(&mut *port, header.value, self.guard).await?;
                continue;
            }
            let key = self.read_value(&mut *port, key_ty, header.key, field).await?;
            let value = match key {
                Decoded::Skipped { expected, found } => {
                    mismatch = Some((expected, found));
                    skip(&mut *port, header.value, self.guard).await?;
                    continue;
                }
                Decoded::Value(key) => {
                    match self
                        .read_value(&mut *port, value_ty, header.value, field)
                        .await?
                    {
                        Decoded::Value(value) => (key, value),
                        Decoded::Skipped { expected, found } => {
                            mismatch = Some((expected, found));
                            continue;
                        }
                    }
                }
            };
            entries.insert(value.0, value.1);
        }

        Ok(match mismatch {
            Some(tags) => Err(tags),
            None => Ok(entries),
        })
    }
}
