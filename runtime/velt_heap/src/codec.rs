//! Slot byte codec: field packing and the null marker.
//!
//! Encoding is little-endian at the offsets resolved into the descriptor,
//! on every host. References (and value-typed fields stored by reference)
//! occupy one 64-bit handle word; zero encodes null.
//!
//! For nullable flat layouts one marker byte lives at
//! `layout.null_marker_offset`: `0` is "absent", `1` is "present", fixed
//! for the Layout's lifetime. [`write_value`] fills the payload before
//! setting the marker, so a reader of the published bytes never sees
//! "present" ahead of the payload; the atomic slot layer publishes marker
//! and payload in the same atomic unit.

use velt_types::{DescriptorId, DescriptorTable, FieldType, Layout, PrimType};

use crate::heap::ObjRef;
use crate::value::{FieldValue, ValueInstance};

/// Marker byte for a nullable flat slot holding no value.
pub const MARKER_ABSENT: u8 = 0;
/// Marker byte for a nullable flat slot holding a value.
pub const MARKER_PRESENT: u8 = 1;

/// Read the null marker of a nullable flat slot.
///
/// # Panics
/// Panics if the layout has no null marker.
#[inline]
pub fn is_null(layout: &Layout, bytes: &[u8]) -> bool {
    let offset = layout
        .null_marker_offset
        .unwrap_or_else(|| panic!("layout {layout} has no null marker"));
    bytes[offset as usize] == MARKER_ABSENT
}

/// Mark a nullable flat slot absent. The payload bytes are left as they
/// are and are unspecified until the next [`write_value`].
#[inline]
pub fn write_null(layout: &Layout, bytes: &mut [u8]) {
    let offset = layout
        .null_marker_offset
        .unwrap_or_else(|| panic!("layout {layout} has no null marker"));
    bytes[offset as usize] = MARKER_ABSENT;
}

/// Encode a value into a slot buffer: payload first, marker (if the layout
/// carries one) set "present" last.
pub fn write_value(
    layout: &Layout,
    table: &DescriptorTable,
    instance: &ValueInstance,
    bytes: &mut [u8],
) {
    encode_instance(table, instance, bytes);
    if let Some(offset) = layout.null_marker_offset {
        bytes[offset as usize] = MARKER_PRESENT;
    }
}

/// Encode an instance's payload at the start of `buf`.
///
/// `buf` must hold at least the descriptor's payload size.
pub fn encode_instance(table: &DescriptorTable, instance: &ValueInstance, buf: &mut [u8]) {
    encode_at(table, instance, buf, 0);
}

fn encode_at(table: &DescriptorTable, instance: &ValueInstance, buf: &mut [u8], base: usize) {
    let descriptor = table.get(instance.descriptor());
    for (value, field) in instance.fields().iter().zip(descriptor.fields()) {
        let at = base + field.offset_bytes as usize;
        match value {
            FieldValue::Bool(v) => buf[at] = u8::from(*v),
            FieldValue::Byte(v) => buf[at] = v.to_le_bytes()[0],
            FieldValue::Short(v) => buf[at..at + 2].copy_from_slice(&v.to_le_bytes()),
            FieldValue::Char(v) => buf[at..at + 2].copy_from_slice(&v.to_le_bytes()),
            FieldValue::Int(v) => buf[at..at + 4].copy_from_slice(&v.to_le_bytes()),
            FieldValue::Long(v) => buf[at..at + 8].copy_from_slice(&v.to_le_bytes()),
            FieldValue::Float(v) => buf[at..at + 4].copy_from_slice(&v.to_bits().to_le_bytes()),
            FieldValue::Double(v) => buf[at..at + 8].copy_from_slice(&v.to_bits().to_le_bytes()),
            FieldValue::Ref(handle) => {
                let raw = handle.map_or(0, ObjRef::raw);
                buf[at..at + 8].copy_from_slice(&raw.to_le_bytes());
            }
            FieldValue::Value(inner) => encode_at(table, inner, buf, at),
        }
    }
}

/// Decode an instance's payload from the start of `buf`.
pub fn decode_instance(table: &DescriptorTable, id: DescriptorId, buf: &[u8]) -> ValueInstance {
    decode_at(table, id, buf, 0)
}

fn decode_at(table: &DescriptorTable, id: DescriptorId, buf: &[u8], base: usize) -> ValueInstance {
    let descriptor = table.get(id);
    let fields: Vec<FieldValue> = descriptor
        .fields()
        .iter()
        .map(|field| {
            let at = base + field.offset_bytes as usize;
            match field.ty {
                FieldType::Prim(p) => decode_prim(p, buf, at),
                FieldType::Reference => decode_ref(buf, at),
                FieldType::Value(inner) if field.inlined => {
                    FieldValue::Value(decode_at(table, inner, buf, at))
                }
                FieldType::Value(_) => decode_ref(buf, at),
            }
        })
        .collect();
    ValueInstance::new(table, id, fields)
}

fn decode_prim(prim: PrimType, buf: &[u8], at: usize) -> FieldValue {
    match prim {
        PrimType::Bool => FieldValue::Bool(buf[at] != 0),
        PrimType::Byte => FieldValue::Byte(i8::from_le_bytes([buf[at]])),
        PrimType::Short => FieldValue::Short(i16::from_le_bytes(slice2(buf, at))),
        PrimType::Char => FieldValue::Char(u16::from_le_bytes(slice2(buf, at))),
        PrimType::Int => FieldValue::Int(i32::from_le_bytes(slice4(buf, at))),
        PrimType::Long => FieldValue::Long(i64::from_le_bytes(slice8(buf, at))),
        PrimType::Float => FieldValue::Float(f32::from_bits(u32::from_le_bytes(slice4(buf, at)))),
        PrimType::Double => FieldValue::Double(f64::from_bits(u64::from_le_bytes(slice8(buf, at)))),
    }
}

fn decode_ref(buf: &[u8], at: usize) -> FieldValue {
    let raw = u64::from_le_bytes(slice8(buf, at));
    FieldValue::Ref((raw != 0).then(|| ObjRef::from_raw(raw)))
}

#[inline]
fn slice2(buf: &[u8], at: usize) -> [u8; 2] {
    [buf[at], buf[at + 1]]
}

#[inline]
fn slice4(buf: &[u8], at: usize) -> [u8; 4] {
    [buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]
}

#[inline]
fn slice8(buf: &[u8], at: usize) -> [u8; 8] {
    [
        buf[at],
        buf[at + 1],
        buf[at + 2],
        buf[at + 3],
        buf[at + 4],
        buf[at + 5],
        buf[at + 6],
        buf[at + 7],
    ]
}

/// Pack slot bytes into 64-bit words, little-endian, zero-padded.
pub fn bytes_to_words(bytes: &[u8]) -> Vec<u64> {
    bytes
        .chunks(8)
        .map(|chunk| {
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            u64::from_le_bytes(word)
        })
        .collect()
}

/// Unpack 64-bit words into `len` slot bytes.
pub fn words_to_bytes(words: &[u64], len: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(words.len() * 8);
    for word in words {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    bytes.truncate(len);
    bytes
}
