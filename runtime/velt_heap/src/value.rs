//! Decoded value instances.
//!
//! A [`ValueInstance`] is the in-register form of a value object: its
//! descriptor handle plus one [`FieldValue`] per declared field. Storage
//! operations decode slots into instances and encode instances into slots;
//! the substitutability engine compares instances field by field.
//!
//! Equality on `FieldValue` is *bit* equality: floats compare by raw bits
//! (`NaN == NaN`, `+0.0 != -0.0`) so the relation stays reflexive and
//! total, and references compare by handle.

use std::fmt;

use velt_types::{DescriptorId, DescriptorTable, FieldType, PrimType};

use crate::heap::ObjRef;

/// One decoded field of a value instance.
#[derive(Clone, Debug)]
pub enum FieldValue {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Reference field, or a value-typed field stored by reference.
    /// `None` is the null reference.
    Ref(Option<ObjRef>),
    /// Value-typed field flattened into the payload.
    Value(ValueInstance),
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            // Raw bit equality, not IEEE: reflexive for NaN, distinguishes
            // signed zeros.
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Ref(a), Self::Ref(b)) => a == b,
            (Self::Value(a), Self::Value(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl FieldValue {
    /// The zero value for a declared field type.
    pub fn zero_for(table: &DescriptorTable, ty: FieldType, inlined: bool) -> Self {
        match ty {
            FieldType::Prim(PrimType::Bool) => Self::Bool(false),
            FieldType::Prim(PrimType::Byte) => Self::Byte(0),
            FieldType::Prim(PrimType::Short) => Self::Short(0),
            FieldType::Prim(PrimType::Char) => Self::Char(0),
            FieldType::Prim(PrimType::Int) => Self::Int(0),
            FieldType::Prim(PrimType::Long) => Self::Long(0),
            FieldType::Prim(PrimType::Float) => Self::Float(0.0),
            FieldType::Prim(PrimType::Double) => Self::Double(0.0),
            FieldType::Reference => Self::Ref(None),
            FieldType::Value(id) if inlined => Self::Value(ValueInstance::default_for(table, id)),
            FieldType::Value(_) => Self::Ref(None),
        }
    }

    /// True when this field value can be stored into a field of the given
    /// declared type.
    fn matches(&self, ty: FieldType, inlined: bool) -> bool {
        match (self, ty) {
            (Self::Bool(_), FieldType::Prim(PrimType::Bool))
            | (Self::Byte(_), FieldType::Prim(PrimType::Byte))
            | (Self::Short(_), FieldType::Prim(PrimType::Short))
            | (Self::Char(_), FieldType::Prim(PrimType::Char))
            | (Self::Int(_), FieldType::Prim(PrimType::Int))
            | (Self::Long(_), FieldType::Prim(PrimType::Long))
            | (Self::Float(_), FieldType::Prim(PrimType::Float))
            | (Self::Double(_), FieldType::Prim(PrimType::Double))
            | (Self::Ref(_), FieldType::Reference) => true,
            (Self::Value(instance), FieldType::Value(id)) => {
                inlined && instance.descriptor() == id
            }
            (Self::Ref(_), FieldType::Value(_)) => !inlined,
            _ => false,
        }
    }
}

/// A decoded value object: descriptor handle plus field values.
#[derive(Clone, PartialEq, Eq)]
pub struct ValueInstance {
    descriptor: DescriptorId,
    fields: Vec<FieldValue>,
}

impl ValueInstance {
    /// Construct an instance, checking the field values against the
    /// descriptor's declared fields.
    ///
    /// # Panics
    /// Panics if the field count or any field kind does not match the
    /// descriptor. Constructing a malformed instance is API misuse, like
    /// looking up a foreign handle.
    pub fn new(
        table: &DescriptorTable,
        descriptor: DescriptorId,
        fields: impl IntoIterator<Item = FieldValue>,
    ) -> Self {
        let desc = table.get(descriptor);
        let fields: Vec<FieldValue> = fields.into_iter().collect();
        assert_eq!(
            fields.len(),
            desc.fields().len(),
            "wrong field count for {}",
            desc.name()
        );
        for (value, field) in fields.iter().zip(desc.fields()) {
            assert!(
                value.matches(field.ty, field.inlined),
                "field `{}` of {} given an incompatible value",
                field.name,
                desc.name()
            );
        }
        Self { descriptor, fields }
    }

    /// The canonical instance of an empty value type.
    pub fn empty(descriptor: DescriptorId) -> Self {
        Self {
            descriptor,
            fields: Vec::new(),
        }
    }

    /// The all-zero instance of a value type: numeric fields zero,
    /// references null, flattened value fields recursively zero.
    pub fn default_for(table: &DescriptorTable, descriptor: DescriptorId) -> Self {
        let desc = table.get(descriptor);
        let fields = desc
            .fields()
            .iter()
            .map(|f| FieldValue::zero_for(table, f.ty, f.inlined))
            .collect();
        Self { descriptor, fields }
    }

    /// The value type of this instance.
    #[inline]
    pub fn descriptor(&self) -> DescriptorId {
        self.descriptor
    }

    /// Field values in declaration order.
    #[inline]
    pub fn fields(&self) -> &[FieldValue] {
        &self.fields
    }
}

impl fmt::Debug for ValueInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueInstance")
            .field("descriptor", &self.descriptor)
            .field("fields", &self.fields)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use velt_types::FieldDecl;

    #[test]
    fn float_fields_compare_by_bits() {
        assert_eq!(FieldValue::Float(f32::NAN), FieldValue::Float(f32::NAN));
        assert_ne!(FieldValue::Double(0.0), FieldValue::Double(-0.0));
        assert_eq!(FieldValue::Double(1.5), FieldValue::Double(1.5));
    }

    #[test]
    fn default_instance_zeroes_every_field() {
        let table = DescriptorTable::new();
        let id = table
            .register(
                "Sample",
                vec![
                    FieldDecl::prim("n", PrimType::Int),
                    FieldDecl::reference("r"),
                ],
                true,
            )
            .unwrap();
        let instance = ValueInstance::default_for(&table, id);

        assert_eq!(instance.fields()[0], FieldValue::Int(0));
        assert_eq!(instance.fields()[1], FieldValue::Ref(None));
    }

    #[test]
    #[should_panic(expected = "wrong field count")]
    fn wrong_arity_panics() {
        let table = DescriptorTable::new();
        let id = table
            .register("One", vec![FieldDecl::prim("v", PrimType::Int)], true)
            .unwrap();
        let _ = ValueInstance::new(&table, id, vec![]);
    }

    #[test]
    #[should_panic(expected = "incompatible value")]
    fn wrong_field_kind_panics() {
        let table = DescriptorTable::new();
        let id = table
            .register("One", vec![FieldDecl::prim("v", PrimType::Int)], true)
            .unwrap();
        let _ = ValueInstance::new(&table, id, vec![FieldValue::Long(1)]);
    }
}
