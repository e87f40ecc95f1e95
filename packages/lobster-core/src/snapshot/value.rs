//! Field values and JVM type signatures
//!
//! Field data inside a dump is typed by HPROF "basic type" codes; the model
//! keeps the JVM descriptor view (`Z`, `B`, `I`, ... with `L`/`[` collapsed
//! into `Object`) because that is what class records and query pages speak.

use lobster_utils::bytes::BeReader;
use lobster_utils::{to_hex, ByteError};
use serde::Serialize;
use std::fmt;

/// Arena index of a heap thing inside a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjId(pub u32);

impl ObjId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// HPROF basic type codes (see the HPROF binary format notes)
pub const TYPE_OBJECT: u8 = 2;
pub const TYPE_BOOLEAN: u8 = 4;
pub const TYPE_CHAR: u8 = 5;
pub const TYPE_FLOAT: u8 = 6;
pub const TYPE_DOUBLE: u8 = 7;
pub const TYPE_BYTE: u8 = 8;
pub const TYPE_SHORT: u8 = 9;
pub const TYPE_INT: u8 = 10;
pub const TYPE_LONG: u8 = 11;

/// Field type signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signature {
    Object,
    Boolean,
    Char,
    Float,
    Double,
    Byte,
    Short,
    Int,
    Long,
}

impl Signature {
    pub fn from_type_code(code: u8) -> Option<Self> {
        match code {
            TYPE_OBJECT => Some(Signature::Object),
            TYPE_BOOLEAN => Some(Signature::Boolean),
            TYPE_CHAR => Some(Signature::Char),
            TYPE_FLOAT => Some(Signature::Float),
            TYPE_DOUBLE => Some(Signature::Double),
            TYPE_BYTE => Some(Signature::Byte),
            TYPE_SHORT => Some(Signature::Short),
            TYPE_INT => Some(Signature::Int),
            TYPE_LONG => Some(Signature::Long),
            _ => None,
        }
    }

    /// JVM descriptor character (`L` stands in for any reference type)
    pub fn descriptor(self) -> char {
        match self {
            Signature::Object => 'L',
            Signature::Boolean => 'Z',
            Signature::Char => 'C',
            Signature::Float => 'F',
            Signature::Double => 'D',
            Signature::Byte => 'B',
            Signature::Short => 'S',
            Signature::Int => 'I',
            Signature::Long => 'J',
        }
    }

    /// Size in bytes inside instance data
    pub fn size(self, id_size: usize) -> usize {
        match self {
            Signature::Object => id_size,
            Signature::Boolean | Signature::Byte => 1,
            Signature::Char | Signature::Short => 2,
            Signature::Float | Signature::Int => 4,
            Signature::Double | Signature::Long => 8,
        }
    }

    pub fn is_object(self) -> bool {
        matches!(self, Signature::Object)
    }

    /// Synthetic class name for a primitive array of this element type
    pub fn primitive_array_name(self) -> &'static str {
        match self {
            Signature::Object => "[L<other>;",
            Signature::Boolean => "[Z",
            Signature::Char => "[C",
            Signature::Float => "[F",
            Signature::Double => "[D",
            Signature::Byte => "[B",
            Signature::Short => "[S",
            Signature::Int => "[I",
            Signature::Long => "[J",
        }
    }
}

/// A decoded field or array element value
///
/// Object references come in three flavors: `Null` for id 0, `Ref` once the
/// target exists in the snapshot, and `Unresolved` carrying the raw heap id
/// when it does not (dangling references are legal in truncated dumps).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Null,
    Ref(ObjId),
    Unresolved(u64),
    Boolean(bool),
    Char(u16),
    Float(f32),
    Double(f64),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
}

impl Value {
    /// Read one raw value; object ids are left unresolved
    pub fn read_raw(
        reader: &mut BeReader<'_>,
        signature: Signature,
        id_size: usize,
    ) -> Result<Self, ByteError> {
        Ok(match signature {
            Signature::Object => {
                let id = reader.id(id_size)?;
                if id == 0 {
                    Value::Null
                } else {
                    Value::Unresolved(id)
                }
            }
            Signature::Boolean => Value::Boolean(reader.u8()? != 0),
            Signature::Char => Value::Char(reader.u16()?),
            Signature::Float => Value::Float(reader.f32()?),
            Signature::Double => Value::Double(reader.f64()?),
            Signature::Byte => Value::Byte(reader.i8()?),
            Signature::Short => Value::Short(reader.i16()?),
            Signature::Int => Value::Int(reader.i32()?),
            Signature::Long => Value::Long(reader.i64()?),
        })
    }

    pub fn as_obj(&self) -> Option<ObjId> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "<null>"),
            Value::Ref(id) => write!(f, "<object #{}>", id.0),
            Value::Unresolved(id) => write!(f, "<unresolved {}>", to_hex(*id)),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Char(v) => match char::from_u32(*v as u32) {
                Some(c) if !c.is_control() => write!(f, "{}", c),
                _ => write!(f, "\\u{:04x}", v),
            },
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_code_round_trip() {
        for code in [
            TYPE_OBJECT,
            TYPE_BOOLEAN,
            TYPE_CHAR,
            TYPE_FLOAT,
            TYPE_DOUBLE,
            TYPE_BYTE,
            TYPE_SHORT,
            TYPE_INT,
            TYPE_LONG,
        ] {
            assert!(Signature::from_type_code(code).is_some());
        }
        assert!(Signature::from_type_code(3).is_none());
        assert!(Signature::from_type_code(12).is_none());
    }

    #[test]
    fn test_signature_sizes() {
        assert_eq!(Signature::Object.size(4), 4);
        assert_eq!(Signature::Object.size(8), 8);
        assert_eq!(Signature::Long.size(4), 8);
        assert_eq!(Signature::Boolean.size(8), 1);
    }

    #[test]
    fn test_read_raw_null_vs_unresolved() {
        let data = [0u8, 0, 0, 0, 0, 0, 0, 0x2a];
        let mut r = BeReader::new(&data);
        assert_eq!(
            Value::read_raw(&mut r, Signature::Object, 4).unwrap(),
            Value::Null
        );
        assert_eq!(
            Value::read_raw(&mut r, Signature::Object, 4).unwrap(),
            Value::Unresolved(0x2a)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "<null>");
        assert_eq!(Value::Int(-7).to_string(), "-7");
        assert_eq!(Value::Char('x' as u16).to_string(), "x");
        assert_eq!(Value::Unresolved(0xff).to_string(), "<unresolved 0xff>");
    }
}
