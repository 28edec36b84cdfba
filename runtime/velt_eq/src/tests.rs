use super::*;
use pretty_assertions::assert_eq;
use velt_heap::{StoreCtx, ValArray};
use velt_types::{DescriptorId, FieldDecl, LayoutCache, LayoutPolicy, PrimType};

struct Fixture {
    table: DescriptorTable,
    heap: Heap,
}

impl Fixture {
    fn new() -> Self {
        Self {
            table: DescriptorTable::new(),
            heap: Heap::new(),
        }
    }

    fn float_pair(&self) -> DescriptorId {
        self.table
            .register(
                "FloatPair",
                vec![
                    FieldDecl::prim("x", PrimType::Float),
                    FieldDecl::prim("y", PrimType::Double),
                ],
                true,
            )
            .unwrap()
    }

    fn holder(&self) -> DescriptorId {
        self.table
            .register("Holder", vec![FieldDecl::reference("target")], true)
            .unwrap()
    }
}

fn floats(f: &Fixture, id: DescriptorId, x: f32, y: f64) -> ValueInstance {
    ValueInstance::new(
        &f.table,
        id,
        vec![FieldValue::Float(x), FieldValue::Double(y)],
    )
}

#[test]
fn null_operands() {
    let f = Fixture::new();
    let id = f.float_pair();
    let v = Operand::Payload(floats(&f, id, 1.0, 2.0));

    assert!(substitutable(&f.table, &f.heap, &Operand::Null, &Operand::Null));
    assert!(!substitutable(&f.table, &f.heap, &v, &Operand::Null));
    assert!(!substitutable(&f.table, &f.heap, &Operand::Null, &v));
}

#[test]
fn reflexive_including_nan() {
    let f = Fixture::new();
    let id = f.float_pair();
    let v = Operand::Payload(floats(&f, id, f32::NAN, f64::NAN));

    assert!(substitutable(&f.table, &f.heap, &v, &v));
}

#[test]
fn equal_nan_payloads_compare_equal() {
    let f = Fixture::new();
    let id = f.float_pair();
    let a = Operand::Payload(floats(&f, id, f32::NAN, 0.5));
    let b = Operand::Payload(floats(&f, id, f32::NAN, 0.5));

    assert!(substitutable(&f.table, &f.heap, &a, &b));
}

#[test]
fn signed_zeros_compare_unequal() {
    let f = Fixture::new();
    let id = f.float_pair();
    let pos = Operand::Payload(floats(&f, id, 0.0, 0.0));
    let neg = Operand::Payload(floats(&f, id, -0.0, 0.0));

    assert!(!substitutable(&f.table, &f.heap, &pos, &neg));
}

#[test]
fn identity_objects_compare_by_handle() {
    let f = Fixture::new();
    let a = f.heap.alloc_identity();
    let b = f.heap.alloc_identity();

    assert!(substitutable(&f.table, &f.heap, &Operand::Ref(a), &Operand::Ref(a)));
    assert!(!substitutable(&f.table, &f.heap, &Operand::Ref(a), &Operand::Ref(b)));
}

#[test]
fn distinct_boxes_with_equal_contents_are_substitutable() {
    let f = Fixture::new();
    let id = f.float_pair();
    let x = f.heap.alloc_value_box(floats(&f, id, 1.5, 2.5));
    let y = f.heap.alloc_value_box(floats(&f, id, 1.5, 2.5));

    assert!(substitutable(&f.table, &f.heap, &Operand::Ref(x), &Operand::Ref(y)));
}

#[test]
fn payload_is_substitutable_for_its_box() {
    let f = Fixture::new();
    let id = f.float_pair();
    let v = floats(&f, id, 3.0, 4.0);
    let boxed = f.heap.alloc_value_box(v.clone());

    assert!(substitutable(
        &f.table,
        &f.heap,
        &Operand::Payload(v),
        &Operand::Ref(boxed)
    ));
}

#[test]
fn payload_is_not_substitutable_for_identity() {
    let f = Fixture::new();
    let id = f.float_pair();
    let v = Operand::Payload(floats(&f, id, 0.0, 0.0));
    let identity = Operand::Ref(f.heap.alloc_identity());

    assert!(!substitutable(&f.table, &f.heap, &v, &identity));
}

#[test]
fn unrelated_types_compare_unequal() {
    let f = Fixture::new();
    let a = f.float_pair();
    let b = f
        .table
        .register(
            "OtherPair",
            vec![
                FieldDecl::prim("x", PrimType::Float),
                FieldDecl::prim("y", PrimType::Double),
            ],
            true,
        )
        .unwrap();

    let pa = Operand::Payload(floats(&f, a, 1.0, 1.0));
    let pb = Operand::Payload(floats(&f, b, 1.0, 1.0));
    assert!(!substitutable(&f.table, &f.heap, &pa, &pb));
}

#[test]
fn reference_fields_recurse_through_value_boxes() {
    let f = Fixture::new();
    let pair = f.float_pair();
    let holder = f.holder();

    let x = f.heap.alloc_value_box(floats(&f, pair, 7.0, 8.0));
    let y = f.heap.alloc_value_box(floats(&f, pair, 7.0, 8.0));
    let a = ValueInstance::new(&f.table, holder, vec![FieldValue::Ref(Some(x))]);
    let b = ValueInstance::new(&f.table, holder, vec![FieldValue::Ref(Some(y))]);

    assert!(substitutable(
        &f.table,
        &f.heap,
        &Operand::Payload(a),
        &Operand::Payload(b)
    ));
}

#[test]
fn identity_reference_fields_compare_by_handle() {
    let f = Fixture::new();
    let holder = f.holder();
    let obj_a = f.heap.alloc_identity();
    let obj_b = f.heap.alloc_identity();

    let a = ValueInstance::new(&f.table, holder, vec![FieldValue::Ref(Some(obj_a))]);
    let b = ValueInstance::new(&f.table, holder, vec![FieldValue::Ref(Some(obj_b))]);
    let a2 = ValueInstance::new(&f.table, holder, vec![FieldValue::Ref(Some(obj_a))]);

    assert!(!substitutable(
        &f.table,
        &f.heap,
        &Operand::Payload(a.clone()),
        &Operand::Payload(b)
    ));
    assert!(substitutable(
        &f.table,
        &f.heap,
        &Operand::Payload(a),
        &Operand::Payload(a2)
    ));
}

#[test]
fn nested_flattened_fields_compare_recursively() {
    let f = Fixture::new();
    let pair = f.float_pair();
    let nest = f
        .table
        .register("Nest", vec![FieldDecl::value("inner", pair)], true)
        .unwrap();

    let a = ValueInstance::new(
        &f.table,
        nest,
        vec![FieldValue::Value(floats(&f, pair, f32::NAN, 1.0))],
    );
    let b = ValueInstance::new(
        &f.table,
        nest,
        vec![FieldValue::Value(floats(&f, pair, f32::NAN, 1.0))],
    );
    let c = ValueInstance::new(
        &f.table,
        nest,
        vec![FieldValue::Value(floats(&f, pair, 2.0, 1.0))],
    );

    assert!(substitutable(
        &f.table,
        &f.heap,
        &Operand::Payload(a.clone()),
        &Operand::Payload(b)
    ));
    assert!(!substitutable(
        &f.table,
        &f.heap,
        &Operand::Payload(a),
        &Operand::Payload(c)
    ));
}

/// The same logical value stored boxed and flat must compare exactly as
/// two boxed copies would.
#[test]
fn equality_is_layout_independent() {
    let f = Fixture::new();
    let cache = LayoutCache::new();
    let ctx = StoreCtx::new(&f.table, &cache, &f.heap);
    let id = f.float_pair();
    let v = floats(&f, id, 9.0, -0.0);

    let flat =
        ValArray::null_restricted_atomic(ctx, id, 1, &v, LayoutPolicy::default()).unwrap();
    let boxed = ValArray::boxed(ctx, id, 1, Some(&v)).unwrap();
    assert!(flat.is_flat());
    assert!(!boxed.is_flat());

    let from_flat = Operand::Payload(flat.get(ctx, 0).unwrap().unwrap());
    let from_boxed = Operand::Payload(boxed.get(ctx, 0).unwrap().unwrap());
    let reference = Operand::Payload(v);

    assert!(substitutable(&f.table, &f.heap, &from_flat, &from_boxed));
    assert!(substitutable(&f.table, &f.heap, &from_flat, &reference));
    assert!(substitutable(&f.table, &f.heap, &from_boxed, &reference));
}

#[test]
fn empty_values_of_same_type_are_equal() {
    let f = Fixture::new();
    let id = f.table.register("Unit", vec![], true).unwrap();
    let a = Operand::Payload(ValueInstance::empty(id));
    let b = Operand::Payload(ValueInstance::empty(id));

    assert_eq!(substitutable(&f.table, &f.heap, &a, &b), true);
}
