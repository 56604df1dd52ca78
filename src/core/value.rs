//! # Values and Records
//!
//! In-memory representation of decoded data and the structural operations
//! over it: deep copy, equality and a combining hash.
//!
//! ## Presence
//! Every field slot of a [`Record`] carries its value and an independent
//! presence flag. An unset slot holds the field default and is ignored by
//! equality and hashing, so a field explicitly set to its default is
//! distinguishable from an absent one.
//!
//! ## Ordering
//! `Value` has a total order consistent with equality. Floating point values
//! compare by `total_cmp`, so `NaN` equals itself and `0.0` differs from
//! `-0.0`. This lets sets and maps hold any value, records included, and
//! gives sets and maps a deterministic iteration (and write) order.
//!
//! ## Hashing
//! Sequences hash in order. Sets and maps combine element hashes with a
//! commutative sum so that equal unordered containers always hash equally.

use bytes::Bytes;
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::core::schema::{FieldDescriptor, StructDescriptor};
use crate::core::types::TypeTag;
use crate::error::{CodecError, Result};

/// A decoded or caller-built value of any shape.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Float(f32),
    Double(f64),
    String(String),
    Binary(Bytes),
    Struct(Record),
    List(Vec<Value>),
    Set(BTreeSet<Value>),
    Map(BTreeMap<Value, Value>),
}

impl Value {
    /// Wire tag of this value. Enum fields hold `I32` values.
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Bool(_) => TypeTag::Bool,
            Value::I8(_) => TypeTag::I8,
            Value::I16(_) => TypeTag::I16,
            Value::I32(_) => TypeTag::I32,
            Value::I64(_) => TypeTag::I64,
            Value::Float(_) => TypeTag::Float,
            Value::Double(_) => TypeTag::Double,
            Value::String(_) => TypeTag::String,
            Value::Binary(_) => TypeTag::Binary,
            Value::Struct(_) => TypeTag::Struct,
            Value::List(_) => TypeTag::List,
            Value::Set(_) => TypeTag::Set,
            Value::Map(_) => TypeTag::Map,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::I8(_) => 1,
            Value::I16(_) => 2,
            Value::I32(_) => 3,
            Value::I64(_) => 4,
            Value::Float(_) => 5,
            Value::Double(_) => 6,
            Value::String(_) => 7,
            Value::Binary(_) => 8,
            Value::Struct(_) => 9,
            Value::List(_) => 10,
            Value::Set(_) => 11,
            Value::Map(_) => 12,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Any signed integer widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I8(v) => Some(i64::from(*v)),
            Value::I16(v) => Some(i64::from(*v)),
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Struct(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Struct(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&BTreeSet<Value>> {
        match self {
            Value::Set(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<Value, Value>> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Number of elements (or entries) of a container, `None` for scalars.
    pub fn container_len(&self) -> Option<usize> {
        match self {
            Value::List(v) => Some(v.len()),
            Value::Set(v) => Some(v.len()),
            Value::Map(v) => Some(v.len()),
            _ => None,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::I8(a), Value::I8(b)) => a.cmp(b),
            (Value::I16(a), Value::I16(b)) => a.cmp(b),
            (Value::I32(a), Value::I32(b)) => a.cmp(b),
            (Value::I64(a), Value::I64(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Binary(a), Value::Binary(b)) => a.cmp(b),
            (Value::Struct(a), Value::Struct(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Set(a), Value::Set(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Bool(v) => v.hash(state),
            Value::I8(v) => v.hash(state),
            Value::I16(v) => v.hash(state),
            Value::I32(v) => v.hash(state),
            Value::I64(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::String(v) => v.hash(state),
            Value::Binary(v) => v.hash(state),
            Value::Struct(r) => r.hash(state),
            Value::List(items) => {
                items.len().hash(state);
                for item in items {
                    item.hash(state);
                }
            }
            Value::Set(items) => {
                items.len().hash(state);
                combine_unordered(items.iter().map(hash_value)).hash(state);
            }
            Value::Map(entries) => {
                entries.len().hash(state);
                combine_unordered(entries.iter().map(|(k, v)| {
                    let mut hasher = DefaultHasher::new();
                    k.hash(&mut hasher);
                    v.hash(&mut hasher);
                    hasher.finish()
                }))
                .hash(state);
            }
        }
    }
}

fn combine_unordered(hashes: impl Iterator<Item = u64>) -> u64 {
    hashes.fold(0u64, u64::wrapping_add)
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => Float,
    f64 => Double,
    String => String,
    Bytes => Binary,
    Record => Struct,
    Vec<Value> => List,
    BTreeSet<Value> => Set,
    BTreeMap<Value, Value> => Map,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(Bytes::from(v))
    }
}

/// One field of a record: its current value and its presence flag.
#[derive(Debug, Clone)]
struct FieldSlot {
    value: Value,
    isset: bool,
}

/// An instance of a record type described by a [`StructDescriptor`].
#[derive(Debug, Clone)]
pub struct Record {
    descriptor: Arc<StructDescriptor>,
    slots: Vec<FieldSlot>,
}

impl Record {
    /// A record with every field unset and holding its default.
    pub fn new(descriptor: Arc<StructDescriptor>) -> Self {
        let slots = descriptor
            .fields()
            .iter()
            .map(|field| FieldSlot {
                value: field.default_value(),
                isset: false,
            })
            .collect();
        Self { descriptor, slots }
    }

    pub fn descriptor(&self) -> &Arc<StructDescriptor> {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.descriptor
            .field_by_name(name)
            .map(|(index, _)| index)
            .ok_or_else(|| CodecError::UnknownField(format!("{}.{name}", self.name())))
    }

    fn index_of_id(&self, id: i16) -> Result<usize> {
        self.descriptor
            .field_by_id(id)
            .map(|(index, _)| index)
            .ok_or_else(|| CodecError::UnknownField(format!("{}#{id}", self.name())))
    }

    fn set_index(&mut self, index: usize, value: Value) -> Result<()> {
        let field = &self.descriptor.fields()[index];
        if !field.ty().accepts(&value) {
            return Err(CodecError::SchemaMismatch {
                field: field.name().to_string(),
                expected: field.tag(),
                found: value.tag(),
            });
        }
        self.slots[index] = FieldSlot { value, isset: true };
        Ok(())
    }

    /// Store a value and mark the field present.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let index = self.index_of(name)?;
        self.set_index(index, value.into())
    }

    pub fn set_by_id(&mut self, id: i16, value: impl Into<Value>) -> Result<()> {
        let index = self.index_of_id(id)?;
        self.set_index(index, value.into())
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Clear the presence flag and restore the default value.
    pub fn unset(&mut self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        self.slots[index] = FieldSlot {
            value: self.descriptor.fields()[index].default_value(),
            isset: false,
        };
        Ok(())
    }

    /// Current value of a field, the default when unset. `None` for unknown names.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.descriptor
            .field_by_name(name)
            .map(|(index, _)| &self.slots[index].value)
    }

    pub fn get_by_id(&self, id: i16) -> Option<&Value> {
        self.descriptor
            .field_by_id(id)
            .map(|(index, _)| &self.slots[index].value)
    }

    /// Mutable access to a present field. Unset fields yield `None` so the
    /// presence flag never changes behind the caller's back.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        let (index, _) = self.descriptor.field_by_name(name)?;
        let slot = &mut self.slots[index];
        if slot.isset {
            Some(&mut slot.value)
        } else {
            None
        }
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.descriptor
            .field_by_name(name)
            .is_some_and(|(index, _)| self.slots[index].isset)
    }

    pub fn is_set_by_id(&self, id: i16) -> bool {
        self.descriptor
            .field_by_id(id)
            .is_some_and(|(index, _)| self.slots[index].isset)
    }

    /// Present fields in declaration order
    pub fn iter_set(&self) -> impl Iterator<Item = (&FieldDescriptor, &Value)> {
        self.descriptor
            .fields()
            .iter()
            .zip(&self.slots)
            .filter(|(_, slot)| slot.isset)
            .map(|(field, slot)| (field, &slot.value))
    }

    /// Every field in declaration order with its value and presence flag
    pub fn iter_all(&self) -> impl Iterator<Item = (&FieldDescriptor, &Value, bool)> {
        self.descriptor
            .fields()
            .iter()
            .zip(&self.slots)
            .map(|(field, slot)| (field, &slot.value, slot.isset))
    }

    /// Check that every required field is present, recursing into present
    /// nested records. The codec never calls this; requiredness is a
    /// caller concern.
    pub fn validate(&self) -> Result<()> {
        for (field, value, isset) in self.iter_all() {
            if field.is_required() && !isset {
                return Err(CodecError::MissingRequired {
                    record: self.name().to_string(),
                    field: field.name().to_string(),
                });
            }
            if isset {
                if let Value::Struct(nested) = value {
                    nested.validate()?;
                }
            }
        }
        Ok(())
    }

    /// Install a decoded value without re-validating its shape.
    pub(crate) fn set_decoded(&mut self, index: usize, value: Value) {
        self.slots[index] = FieldSlot { value, isset: true };
    }

    pub fn deep_copy(&self) -> Record {
        Record {
            descriptor: Arc::clone(&self.descriptor),
            slots: self
                .slots
                .iter()
                .map(|slot| FieldSlot {
                    value: deep_copy(&slot.value),
                    isset: slot.isset,
                })
                .collect(),
        }
    }

    fn field_ids(&self) -> Vec<i16> {
        self.descriptor.fields().iter().map(FieldDescriptor::id).collect()
    }
}

impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name()
            .cmp(other.name())
            .then_with(|| {
                if self.descriptor.same_shape(&other.descriptor) {
                    Ordering::Equal
                } else {
                    self.field_ids().cmp(&other.field_ids())
                }
            })
            .then_with(|| {
                for (a, b) in self.slots.iter().zip(&other.slots) {
                    let ord = match (a.isset, b.isset) {
                        (false, false) => Ordering::Equal,
                        (false, true) => Ordering::Less,
                        (true, false) => Ordering::Greater,
                        (true, true) => a.value.cmp(&b.value),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                self.slots.len().cmp(&other.slots.len())
            })
    }
}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
        for (field, slot) in self.descriptor.fields().iter().zip(&self.slots) {
            slot.isset.hash(state);
            if slot.isset {
                field.id().hash(state);
                slot.value.hash(state);
            }
        }
    }
}

fn write_joined<'v, I>(f: &mut fmt::Formatter<'_>, items: I) -> fmt::Result
where
    I: IntoIterator<Item = &'v Value>,
{
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Human readable rendering: strings quoted, binary as hex, sets and maps
/// in their sorted order.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::Binary(bytes) => {
                f.write_str("0x")?;
                for byte in bytes.iter() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Value::Struct(record) => write!(f, "{record}"),
            Value::List(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
            Value::Set(items) => {
                f.write_str("{")?;
                write_joined(f, items)?;
                f.write_str("}")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// `Name(field: value, ...)` over the present fields only.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name())?;
        for (i, (field, value)) in self.iter_set().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {value}", field.name())?;
        }
        f.write_str(")")
    }
}

/// A copy sharing no storage with `value`, binary buffers included.
pub fn deep_copy(value: &Value) -> Value {
    match value {
        Value::Binary(b) => Value::Binary(Bytes::copy_from_slice(b)),
        Value::String(s) => Value::String(s.clone()),
        Value::Struct(r) => Value::Struct(r.deep_copy()),
        Value::List(items) => Value::List(items.iter().map(deep_copy).collect()),
        Value::Set(items) => Value::Set(items.iter().map(deep_copy).collect()),
        Value::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| (deep_copy(k), deep_copy(v)))
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}

/// Structural equality, presence-aware for records.
pub fn equals(a: &Value, b: &Value) -> bool {
    a == b
}

/// Combining hash consistent with [`equals`].
pub fn hash_value(value: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TypeDescriptor;

    #[allow(clippy::expect_used)]
    fn point() -> Arc<StructDescriptor> {
        StructDescriptor::builder("Point")
            .optional(1, "x", TypeDescriptor::I32)
            .optional(2, "y", TypeDescriptor::I32)
            .build()
            .expect("valid schema")
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_presence_distinguishes_default_from_absent() {
        let desc = point();
        let a = Record::new(Arc::clone(&desc)).with("x", 3).expect("set x");
        let b = Record::new(Arc::clone(&desc)).with("x", 3).expect("set x");
        let c = a.clone().with("y", 0).expect("set y");

        assert_eq!(a, b);
        assert_eq!(a.get("y"), Some(&Value::I32(0)));
        assert!(!a.is_set("y"));
        assert_ne!(a, c);
        assert_eq!(hash_value(&Value::Struct(a.clone())), hash_value(&Value::Struct(b)));
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_unset_value_ignored_by_equality() {
        let desc = point();
        let mut a = Record::new(Arc::clone(&desc));
        a.set("y", 42).expect("set");
        a.unset("y").expect("unset");
        let b = Record::new(desc);
        assert_eq!(a, b);
        assert_eq!(a.get("y"), Some(&Value::I32(0)));
    }

    #[test]
    fn test_set_rejects_wrong_shape() {
        let mut rec = Record::new(point());
        assert!(matches!(
            rec.set("x", "three"),
            Err(CodecError::SchemaMismatch { .. })
        ));
        assert!(matches!(rec.set("z", 1), Err(CodecError::UnknownField(_))));
        assert!(!rec.is_set("x"));
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_get_mut_only_for_present_fields() {
        let mut rec = Record::new(point());
        assert!(rec.get_mut("x").is_none());
        rec.set("x", 1).expect("set");
        if let Some(v) = rec.get_mut("x") {
            *v = Value::I32(5);
        }
        assert_eq!(rec.get("x").and_then(Value::as_i32), Some(5));
    }

    #[test]
    fn test_set_insertion_order_irrelevant() {
        let a: BTreeSet<Value> = [3, 1, 2].into_iter().map(Value::I32).collect();
        let b: BTreeSet<Value> = [2, 3, 1].into_iter().map(Value::I32).collect();
        assert_eq!(Value::Set(a.clone()), Value::Set(b.clone()));
        assert_eq!(hash_value(&Value::Set(a)), hash_value(&Value::Set(b)));
    }

    #[test]
    fn test_list_order_matters() {
        let a = Value::List(vec![Value::I32(1), Value::I32(2)]);
        let b = Value::List(vec![Value::I32(2), Value::I32(1)]);
        assert_ne!(a, b);
        assert_ne!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn test_float_total_equality() {
        assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_ne!(Value::Double(0.0), Value::Double(-0.0));
        assert_ne!(Value::I32(1), Value::I64(1));
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_deep_copy_is_independent() {
        let desc = StructDescriptor::builder("Bag")
            .optional(1, "items", TypeDescriptor::list(TypeDescriptor::Binary))
            .build()
            .expect("valid schema");
        let original = Record::new(desc)
            .with("items", vec![Value::from(vec![1u8, 2, 3])])
            .expect("set");
        let mut copy = original.deep_copy();
        assert_eq!(copy, original);

        if let Some(items) = copy.get_mut("items").and_then(Value::as_list_mut) {
            items.push(Value::from(vec![9u8]));
        }
        assert_ne!(copy, original);
        assert_eq!(
            original.get("items").and_then(Value::container_len),
            Some(1)
        );
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_validate_required() {
        let desc = StructDescriptor::builder("Req")
            .required(1, "id", TypeDescriptor::I64)
            .optional(2, "note", TypeDescriptor::String)
            .build()
            .expect("valid schema");
        let rec = Record::new(Arc::clone(&desc));
        assert!(matches!(
            rec.validate(),
            Err(CodecError::MissingRequired { .. })
        ));
        let rec = rec.with("id", 7i64).expect("set");
        assert!(rec.validate().is_ok());
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_display_renders_present_fields() {
        let desc = StructDescriptor::builder("Shape")
            .optional(1, "label", TypeDescriptor::String)
            .optional(2, "corners", TypeDescriptor::list(TypeDescriptor::structure(&point())))
            .optional(3, "raw", TypeDescriptor::Binary)
            .optional(4, "scale", TypeDescriptor::Double)
            .build()
            .expect("valid schema");
        let corner = Record::new(point()).with("x", 1).expect("set x");
        let record = Record::new(desc)
            .with("label", "box")
            .expect("set label")
            .with("corners", Value::List(vec![Value::Struct(corner)]))
            .expect("set corners")
            .with("raw", vec![0x0a_u8, 0xff])
            .expect("set raw");

        assert_eq!(
            record.to_string(),
            r#"Shape(label: "box", corners: [Point(x: 1)], raw: 0x0aff)"#
        );
    }

    #[test]
    fn test_display_sets_and_maps_sorted() {
        let set: BTreeSet<Value> = [Value::I32(3), Value::I32(1)].into_iter().collect();
        assert_eq!(Value::Set(set).to_string(), "{1, 3}");

        let map: BTreeMap<Value, Value> = [
            (Value::from("b"), Value::Bool(false)),
            (Value::from("a"), Value::Bool(true)),
        ]
        .into_iter()
        .collect();
        assert_eq!(Value::Map(map).to_string(), r#"{"a": true, "b": false}"#);
    }
}
