//! # Type Tags and Type Descriptors
//!
//! A [`TypeTag`] is the wire-level shape of a single value. A
//! [`TypeDescriptor`] is the schema-level shape: scalars carry no parameters,
//! containers carry the descriptors of their elements, keys and values, and
//! struct/enum descriptors point at their definitions.
//!
//! ## Wire Bytes
//! ```text
//! Stop=0  Bool=2  I8=3  Double=4  I16=6  I32=8  I64=10
//! String=11  Struct=12  Map=13  Set=14  List=15  Float=16  Binary=17
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::core::schema::StructDescriptor;
use crate::core::value::{Record, Value};
use crate::error::{constants, CodecError, Result};

/// Wire shape of a field or element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    /// Terminates a field list; never describes a value.
    Stop,
    Bool,
    I8,
    I16,
    I32,
    I64,
    Float,
    Double,
    String,
    Binary,
    Struct,
    Map,
    Set,
    List,
}

impl TypeTag {
    /// Get the identifier byte for the wire protocol
    pub fn to_byte(self) -> u8 {
        match self {
            TypeTag::Stop => 0,
            TypeTag::Bool => 2,
            TypeTag::I8 => 3,
            TypeTag::Double => 4,
            TypeTag::I16 => 6,
            TypeTag::I32 => 8,
            TypeTag::I64 => 10,
            TypeTag::String => 11,
            TypeTag::Struct => 12,
            TypeTag::Map => 13,
            TypeTag::Set => 14,
            TypeTag::List => 15,
            TypeTag::Float => 16,
            TypeTag::Binary => 17,
        }
    }

    /// Decode a tag from its identifier byte
    pub fn from_byte(byte: u8) -> Result<Self> {
        let tag = match byte {
            0 => TypeTag::Stop,
            2 => TypeTag::Bool,
            3 => TypeTag::I8,
            4 => TypeTag::Double,
            6 => TypeTag::I16,
            8 => TypeTag::I32,
            10 => TypeTag::I64,
            11 => TypeTag::String,
            12 => TypeTag::Struct,
            13 => TypeTag::Map,
            14 => TypeTag::Set,
            15 => TypeTag::List,
            16 => TypeTag::Float,
            17 => TypeTag::Binary,
            other => {
                return Err(CodecError::Protocol(format!(
                    "{}: {other}",
                    constants::ERR_UNKNOWN_TYPE_TAG
                )))
            }
        };
        Ok(tag)
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Stop => "stop",
            TypeTag::Bool => "bool",
            TypeTag::I8 => "i8",
            TypeTag::I16 => "i16",
            TypeTag::I32 => "i32",
            TypeTag::I64 => "i64",
            TypeTag::Float => "float",
            TypeTag::Double => "double",
            TypeTag::String => "string",
            TypeTag::Binary => "binary",
            TypeTag::Struct => "struct",
            TypeTag::Map => "map",
            TypeTag::Set => "set",
            TypeTag::List => "list",
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, TypeTag::List | TypeTag::Set | TypeTag::Map)
    }

    /// Width rank for signed integers, used by integer promotion.
    pub(crate) fn int_rank(self) -> Option<u8> {
        match self {
            TypeTag::I8 => Some(1),
            TypeTag::I16 => Some(2),
            TypeTag::I32 => Some(3),
            TypeTag::I64 => Some(4),
            _ => None,
        }
    }

    pub(crate) fn is_float(self) -> bool {
        matches!(self, TypeTag::Float | TypeTag::Double)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Symbol table for an enumeration carried on the wire as `i32`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    name: String,
    symbols: Vec<(String, i32)>,
}

impl EnumDescriptor {
    pub fn new<N, I, S>(name: N, symbols: I) -> Arc<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = (S, i32)>,
        S: Into<String>,
    {
        Arc::new(Self {
            name: name.into(),
            symbols: symbols.into_iter().map(|(s, v)| (s.into(), v)).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Numeric value of a symbol
    pub fn value_of(&self, symbol: &str) -> Option<i32> {
        self.symbols
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, v)| *v)
    }

    /// Symbol for a numeric value
    pub fn symbol_of(&self, value: i32) -> Option<&str> {
        self.symbols
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(s, _)| s.as_str())
    }
}

/// Schema-level shape of a value, recursive through containers.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Float,
    Double,
    String,
    Binary,
    Enum(Arc<EnumDescriptor>),
    Struct(Arc<StructDescriptor>),
    List(Box<TypeDescriptor>),
    Set(Box<TypeDescriptor>),
    Map(Box<TypeDescriptor>, Box<TypeDescriptor>),
}

impl TypeDescriptor {
    pub fn list(element: TypeDescriptor) -> Self {
        TypeDescriptor::List(Box::new(element))
    }

    pub fn set(element: TypeDescriptor) -> Self {
        TypeDescriptor::Set(Box::new(element))
    }

    pub fn map(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Map(Box::new(key), Box::new(value))
    }

    pub fn structure(descriptor: &Arc<StructDescriptor>) -> Self {
        TypeDescriptor::Struct(Arc::clone(descriptor))
    }

    /// The tag this descriptor is carried under on the wire.
    pub fn tag(&self) -> TypeTag {
        match self {
            TypeDescriptor::Bool => TypeTag::Bool,
            TypeDescriptor::I8 => TypeTag::I8,
            TypeDescriptor::I16 => TypeTag::I16,
            TypeDescriptor::I32 | TypeDescriptor::Enum(_) => TypeTag::I32,
            TypeDescriptor::I64 => TypeTag::I64,
            TypeDescriptor::Float => TypeTag::Float,
            TypeDescriptor::Double => TypeTag::Double,
            TypeDescriptor::String => TypeTag::String,
            TypeDescriptor::Binary => TypeTag::Binary,
            TypeDescriptor::Struct(_) => TypeTag::Struct,
            TypeDescriptor::List(_) => TypeTag::List,
            TypeDescriptor::Set(_) => TypeTag::Set,
            TypeDescriptor::Map(_, _) => TypeTag::Map,
        }
    }

    /// Zero value used for unset fields without a declared default.
    pub fn default_value(&self) -> Value {
        match self {
            TypeDescriptor::Bool => Value::Bool(false),
            TypeDescriptor::I8 => Value::I8(0),
            TypeDescriptor::I16 => Value::I16(0),
            TypeDescriptor::I32 | TypeDescriptor::Enum(_) => Value::I32(0),
            TypeDescriptor::I64 => Value::I64(0),
            TypeDescriptor::Float => Value::Float(0.0),
            TypeDescriptor::Double => Value::Double(0.0),
            TypeDescriptor::String => Value::String(String::new()),
            TypeDescriptor::Binary => Value::Binary(bytes::Bytes::new()),
            TypeDescriptor::Struct(desc) => Value::Struct(Record::new(Arc::clone(desc))),
            TypeDescriptor::List(_) => Value::List(Vec::new()),
            TypeDescriptor::Set(_) => Value::Set(Default::default()),
            TypeDescriptor::Map(_, _) => Value::Map(Default::default()),
        }
    }

    /// Whether `value` has this shape, recursively through containers and records.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeDescriptor::Bool, Value::Bool(_))
            | (TypeDescriptor::I8, Value::I8(_))
            | (TypeDescriptor::I16, Value::I16(_))
            | (TypeDescriptor::I32, Value::I32(_))
            | (TypeDescriptor::I64, Value::I64(_))
            | (TypeDescriptor::Float, Value::Float(_))
            | (TypeDescriptor::Double, Value::Double(_))
            | (TypeDescriptor::String, Value::String(_))
            | (TypeDescriptor::Binary, Value::Binary(_)) => true,
            (TypeDescriptor::Enum(desc), Value::I32(v)) => desc.symbol_of(*v).is_some(),
            (TypeDescriptor::Struct(desc), Value::Struct(record)) => {
                record.descriptor().same_shape(desc)
            }
            (TypeDescriptor::List(elem), Value::List(items)) => {
                items.iter().all(|v| elem.accepts(v))
            }
            (TypeDescriptor::Set(elem), Value::Set(items)) => items.iter().all(|v| elem.accepts(v)),
            (TypeDescriptor::Map(k, v), Value::Map(entries)) => entries
                .iter()
                .all(|(key, val)| k.accepts(key) && v.accepts(val)),
            _ => false,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Enum(desc) => write!(f, "enum {}", desc.name()),
            TypeDescriptor::Struct(desc) => write!(f, "struct {}", desc.name()),
            TypeDescriptor::List(elem) => write!(f, "list<{elem}>"),
            TypeDescriptor::Set(elem) => write!(f, "set<{elem}>"),
            TypeDescriptor::Map(k, v) => write!(f, "map<{k},{v}>"),
            scalar => f.write_str(scalar.tag().name()),
        }
    }
}
