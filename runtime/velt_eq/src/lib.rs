//! Substitutability: the equality relation behind `==` for value objects.
//!
//! Ordinary identity objects compare by handle; value objects compare by
//! recursive field contents. The result never depends on whether an
//! operand happens to be boxed or flattened at comparison time: a boxed
//! value object is dereferenced and compared by payload, so the relation
//! is representation-transparent.
//!
//! Floating-point fields compare by **raw bits**, not IEEE numeric
//! equality: `NaN` equals itself and `+0.0` differs from `-0.0`. That
//! keeps the relation reflexive and total, which `==` requires.
//!
//! Comparison is a pure function of the operands, the descriptor table,
//! and the heap; it holds no locks and allocates nothing.

use velt_heap::{FieldValue, Heap, HeapObject, ObjRef, ValueInstance};
use velt_types::DescriptorTable;

/// One comparison operand: a null reference, an object reference, or a
/// decoded value payload (e.g. loaded from a flat slot).
#[derive(Clone, Debug)]
pub enum Operand {
    /// The null reference.
    Null,
    /// A reference to a heap object, either an identity object or a
    /// boxed value.
    Ref(ObjRef),
    /// A decoded value payload with no identity.
    Payload(ValueInstance),
}

/// Compare two operands for substitutability.
///
/// - Both null: equal. Exactly one null: unequal.
/// - Identity objects: handle equality.
/// - Value payloads of the same runtime type: field-wise comparison.
///   Integral fields compare by bit pattern, floats by raw bits,
///   reference fields by identity-or-substitutability (recursing through
///   boxed values), and flattened value fields recursively.
/// - Provably-unrelated runtime types: unequal.
pub fn substitutable(table: &DescriptorTable, heap: &Heap, a: &Operand, b: &Operand) -> bool {
    match (a, b) {
        (Operand::Null, Operand::Null) => true,
        (Operand::Null, _) | (_, Operand::Null) => false,
        (Operand::Ref(x), Operand::Ref(y)) => ref_eq(table, heap, *x, *y),
        (Operand::Ref(x), Operand::Payload(p)) | (Operand::Payload(p), Operand::Ref(x)) => {
            match heap.get(*x) {
                HeapObject::ValueBox(q) => payload_eq(table, heap, p, &q),
                // A value payload is never substitutable for an identity
                // object.
                HeapObject::Identity => false,
            }
        }
        (Operand::Payload(p), Operand::Payload(q)) => payload_eq(table, heap, p, q),
    }
}

/// Reference comparison: same handle is trivially substitutable; two
/// distinct boxed values compare by contents; anything involving an
/// identity object compares by handle alone.
fn ref_eq(table: &DescriptorTable, heap: &Heap, x: ObjRef, y: ObjRef) -> bool {
    if x == y {
        return true;
    }
    match (heap.get(x), heap.get(y)) {
        (HeapObject::ValueBox(p), HeapObject::ValueBox(q)) => payload_eq(table, heap, &p, &q),
        _ => false,
    }
}

fn payload_eq(table: &DescriptorTable, heap: &Heap, p: &ValueInstance, q: &ValueInstance) -> bool {
    if p.descriptor() != q.descriptor() {
        return false;
    }
    p.fields()
        .iter()
        .zip(q.fields())
        .all(|(a, b)| field_eq(table, heap, a, b))
}

fn field_eq(table: &DescriptorTable, heap: &Heap, a: &FieldValue, b: &FieldValue) -> bool {
    match (a, b) {
        (FieldValue::Ref(x), FieldValue::Ref(y)) => match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) => ref_eq(table, heap, *x, *y),
            _ => false,
        },
        (FieldValue::Value(p), FieldValue::Value(q)) => payload_eq(table, heap, p, q),
        // Scalars: FieldValue equality is already bit equality (raw bits
        // for floats).
        _ => a == b,
    }
}

#[cfg(test)]
mod tests;
