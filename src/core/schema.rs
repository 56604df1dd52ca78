//! # Field Descriptor Tables
//!
//! A [`StructDescriptor`] is the ordered list of fields of one record type.
//! Declaration order drives the write path; the read path looks fields up by
//! wire id, so descriptors are never assumed to be sorted by id.
//!
//! ## Usage
//! ```rust
//! use wire_codec::core::schema::StructDescriptor;
//! use wire_codec::core::types::TypeDescriptor;
//!
//! let point = StructDescriptor::builder("Point")
//!     .optional(1, "x", TypeDescriptor::I32)
//!     .optional(2, "y", TypeDescriptor::I32)
//!     .build()
//!     .unwrap();
//! assert_eq!(point.field_by_id(2).map(|(_, f)| f.name()), Some("y"));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::types::{TypeDescriptor, TypeTag};
use crate::core::value::Value;
use crate::error::{CodecError, Result};

/// Whether a field is written when its presence flag is clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Requiredness {
    /// Written only when set.
    #[default]
    Optional,
    /// Always written, using the default value when unset.
    Required,
}

/// One entry of a field descriptor table.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    id: i16,
    name: String,
    ty: TypeDescriptor,
    requiredness: Requiredness,
    default: Option<Value>,
}

impl FieldDescriptor {
    pub fn new(id: i16, name: impl Into<String>, ty: TypeDescriptor, requiredness: Requiredness) -> Self {
        Self {
            id,
            name: name.into(),
            ty,
            requiredness,
            default: None,
        }
    }

    pub fn optional(id: i16, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self::new(id, name, ty, Requiredness::Optional)
    }

    pub fn required(id: i16, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self::new(id, name, ty, Requiredness::Required)
    }

    /// The same field, written only when set.
    pub fn to_optional(&self) -> Self {
        Self {
            requiredness: Requiredness::Optional,
            ..self.clone()
        }
    }

    /// Declare the value an unset slot holds.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn id(&self) -> i16 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }

    pub fn tag(&self) -> TypeTag {
        self.ty.tag()
    }

    pub fn requiredness(&self) -> Requiredness {
        self.requiredness
    }

    pub fn is_required(&self) -> bool {
        self.requiredness == Requiredness::Required
    }

    /// Value of an unset slot: the declared default or the type's zero value.
    pub fn default_value(&self) -> Value {
        match &self.default {
            Some(value) => value.clone(),
            None => self.ty.default_value(),
        }
    }
}

/// Ordered field table of one record type, indexed by id and by name.
#[derive(Debug)]
pub struct StructDescriptor {
    name: String,
    fields: Vec<FieldDescriptor>,
    by_id: HashMap<i16, usize>,
    by_name: HashMap<String, usize>,
}

impl StructDescriptor {
    /// Build a descriptor, rejecting duplicate ids or names and defaults
    /// that do not match their field type.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Result<Arc<Self>> {
        let name = name.into();
        let mut by_id = HashMap::with_capacity(fields.len());
        let mut by_name = HashMap::with_capacity(fields.len());

        for (index, field) in fields.iter().enumerate() {
            if by_id.insert(field.id, index).is_some() {
                return Err(CodecError::InvalidSchema(format!(
                    "duplicate field id {} in '{name}'",
                    field.id
                )));
            }
            if by_name.insert(field.name.clone(), index).is_some() {
                return Err(CodecError::InvalidSchema(format!(
                    "duplicate field name '{}' in '{name}'",
                    field.name
                )));
            }
            if let Some(default) = &field.default {
                if !field.ty.accepts(default) {
                    return Err(CodecError::InvalidSchema(format!(
                        "default of '{name}.{}' does not match {}",
                        field.name, field.ty
                    )));
                }
            }
        }

        Ok(Arc::new(Self {
            name,
            fields,
            by_id,
            by_name,
        }))
    }

    pub fn builder(name: impl Into<String>) -> StructDescriptorBuilder {
        StructDescriptorBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_by_id(&self, id: i16) -> Option<(usize, &FieldDescriptor)> {
        self.by_id.get(&id).map(|&index| (index, &self.fields[index]))
    }

    pub fn field_by_name(&self, name: &str) -> Option<(usize, &FieldDescriptor)> {
        self.by_name
            .get(name)
            .map(|&index| (index, &self.fields[index]))
    }

    /// Same definition, either the same allocation or field-for-field equal.
    pub fn same_shape(&self, other: &StructDescriptor) -> bool {
        std::ptr::eq(self, other) || self == other
    }
}

impl PartialEq for StructDescriptor {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || (self.name == other.name && self.fields == other.fields)
    }
}

/// Incremental construction of a [`StructDescriptor`].
#[derive(Debug)]
pub struct StructDescriptorBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl StructDescriptorBuilder {
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn optional(self, id: i16, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.field(FieldDescriptor::optional(id, name, ty))
    }

    pub fn required(self, id: i16, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.field(FieldDescriptor::required(id, name, ty))
    }

    pub fn build(self) -> Result<Arc<StructDescriptor>> {
        StructDescriptor::new(self.name, self.fields)
    }
}
