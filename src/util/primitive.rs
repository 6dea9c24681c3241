//! Primitive types and values as they are reported to tools.

use strum_macros::{Display, EnumIter, FromRepr};

/// The type of a primitive value. The discriminant is the type's descriptor
/// character, which is also the value tools receive for it.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumIter, FromRepr)]
pub enum PrimitiveType {
    Boolean = b'Z',
    Byte = b'B',
    Char = b'C',
    Short = b'S',
    Int = b'I',
    Long = b'J',
    Float = b'F',
    Double = b'D',
}

impl PrimitiveType {
    /// Size of one value of this type in bytes.
    pub const fn size(self) -> usize {
        match self {
            PrimitiveType::Boolean | PrimitiveType::Byte => 1,
            PrimitiveType::Char | PrimitiveType::Short => 2,
            PrimitiveType::Int | PrimitiveType::Float => 4,
            PrimitiveType::Long | PrimitiveType::Double => 8,
        }
    }

    /// The descriptor character of this type.
    pub const fn descriptor(self) -> char {
        self as u8 as char
    }

    pub fn from_descriptor(c: char) -> Option<PrimitiveType> {
        u8::try_from(c).ok().and_then(PrimitiveType::from_repr)
    }
}

/// The type of a field or of the elements of an array.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Primitive(PrimitiveType),
    Reference,
}

impl FieldType {
    pub fn is_primitive(self) -> bool {
        matches!(self, FieldType::Primitive(_))
    }

    /// Size of one slot of this type, assuming references take one word.
    pub fn size(self) -> usize {
        match self {
            FieldType::Primitive(ty) => ty.size(),
            FieldType::Reference => std::mem::size_of::<usize>(),
        }
    }
}

/// A primitive value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum JValue {
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl JValue {
    /// The zero value of a type.
    pub fn zero(ty: PrimitiveType) -> JValue {
        match ty {
            PrimitiveType::Boolean => JValue::Boolean(false),
            PrimitiveType::Byte => JValue::Byte(0),
            PrimitiveType::Char => JValue::Char(0),
            PrimitiveType::Short => JValue::Short(0),
            PrimitiveType::Int => JValue::Int(0),
            PrimitiveType::Long => JValue::Long(0),
            PrimitiveType::Float => JValue::Float(0.0),
            PrimitiveType::Double => JValue::Double(0.0),
        }
    }

    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            JValue::Boolean(_) => PrimitiveType::Boolean,
            JValue::Byte(_) => PrimitiveType::Byte,
            JValue::Char(_) => PrimitiveType::Char,
            JValue::Short(_) => PrimitiveType::Short,
            JValue::Int(_) => PrimitiveType::Int,
            JValue::Long(_) => PrimitiveType::Long,
            JValue::Float(_) => PrimitiveType::Float,
            JValue::Double(_) => PrimitiveType::Double,
        }
    }

    /// Write the value in native byte order into `dest`, which must be exactly
    /// `self.primitive_type().size()` bytes long.
    pub fn write_ne_bytes(&self, dest: &mut [u8]) {
        match *self {
            JValue::Boolean(v) => dest.copy_from_slice(&[v as u8]),
            JValue::Byte(v) => dest.copy_from_slice(&v.to_ne_bytes()),
            JValue::Char(v) => dest.copy_from_slice(&v.to_ne_bytes()),
            JValue::Short(v) => dest.copy_from_slice(&v.to_ne_bytes()),
            JValue::Int(v) => dest.copy_from_slice(&v.to_ne_bytes()),
            JValue::Long(v) => dest.copy_from_slice(&v.to_ne_bytes()),
            JValue::Float(v) => dest.copy_from_slice(&v.to_ne_bytes()),
            JValue::Double(v) => dest.copy_from_slice(&v.to_ne_bytes()),
        }
    }

    /// Read a value of type `ty` from native-order bytes. Returns `None` if
    /// `bytes` does not have the size of `ty`.
    pub fn from_ne_bytes(ty: PrimitiveType, bytes: &[u8]) -> Option<JValue> {
        if bytes.len() != ty.size() {
            return None;
        }
        Some(match ty {
            PrimitiveType::Boolean => JValue::Boolean(bytes[0] != 0),
            PrimitiveType::Byte => JValue::Byte(i8::from_ne_bytes(bytes.try_into().ok()?)),
            PrimitiveType::Char => JValue::Char(u16::from_ne_bytes(bytes.try_into().ok()?)),
            PrimitiveType::Short => JValue::Short(i16::from_ne_bytes(bytes.try_into().ok()?)),
            PrimitiveType::Int => JValue::Int(i32::from_ne_bytes(bytes.try_into().ok()?)),
            PrimitiveType::Long => JValue::Long(i64::from_ne_bytes(bytes.try_into().ok()?)),
            PrimitiveType::Float => JValue::Float(f32::from_ne_bytes(bytes.try_into().ok()?)),
            PrimitiveType::Double => JValue::Double(f64::from_ne_bytes(bytes.try_into().ok()?)),
        })
    }
}
