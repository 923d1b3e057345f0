//! UNO type descriptions and values as they travel over URP.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use super::error::UrpError;

pub const XINTERFACE: &str = "com.sun.star.uno.XInterface";
pub const RUNTIME_EXCEPTION: &str = "com.sun.star.uno.RuntimeException";

/// Wire values of `com.sun.star.uno.TypeClass`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TypeClass {
    Void = 0,
    Char = 1,
    Boolean = 2,
    Byte = 3,
    Short = 4,
    UnsignedShort = 5,
    Long = 6,
    UnsignedLong = 7,
    Hyper = 8,
    UnsignedHyper = 9,
    Float = 10,
    Double = 11,
    String = 12,
    Type = 13,
    Any = 14,
    Enum = 15,
    Struct = 17,
    Exception = 19,
    Sequence = 20,
    Interface = 22,
    InterfaceMethod = 25,
    InterfaceAttribute = 26,
    Unknown = 27,
}

impl TypeClass {
    pub fn from_wire(byte: u8) -> Option<Self> {
        let class = match byte {
            0 => TypeClass::Void,
            1 => TypeClass::Char,
            2 => TypeClass::Boolean,
            3 => TypeClass::Byte,
            4 => TypeClass::Short,
            5 => TypeClass::UnsignedShort,
            6 => TypeClass::Long,
            7 => TypeClass::UnsignedLong,
            8 => TypeClass::Hyper,
            9 => TypeClass::UnsignedHyper,
            10 => TypeClass::Float,
            11 => TypeClass::Double,
            12 => TypeClass::String,
            13 => TypeClass::Type,
            14 => TypeClass::Any,
            15 => TypeClass::Enum,
            17 => TypeClass::Struct,
            19 => TypeClass::Exception,
            20 => TypeClass::Sequence,
            22 => TypeClass::Interface,
            25 => TypeClass::InterfaceMethod,
            26 => TypeClass::InterfaceAttribute,
            27 => TypeClass::Unknown,
            _ => return None,
        };
        Some(class)
    }

    /// Simple types are sent as a bare class byte, never cached
    pub fn is_simple(self) -> bool {
        (self as u8) <= TypeClass::Any as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnoType {
    Void,
    Char,
    Boolean,
    Byte,
    Short,
    UnsignedShort,
    Long,
    UnsignedLong,
    Hyper,
    UnsignedHyper,
    Float,
    Double,
    String,
    Type,
    Any,
    Enum(Arc<str>),
    Struct(Arc<str>),
    Exception(Arc<str>),
    Sequence(Box<UnoType>),
    Interface(Arc<str>),
    /// Named sequence element whose class cannot be told from the name alone
    Opaque(Arc<str>),
}

impl UnoType {
    pub fn interface(name: &str) -> Self {
        UnoType::Interface(Arc::from(name))
    }

    pub fn sequence_of(element: UnoType) -> Self {
        UnoType::Sequence(Box::new(element))
    }

    pub fn class(&self) -> TypeClass {
        match self {
            UnoType::Void => TypeClass::Void,
            UnoType::Char => TypeClass::Char,
            UnoType::Boolean => TypeClass::Boolean,
            UnoType::Byte => TypeClass::Byte,
            UnoType::Short => TypeClass::Short,
            UnoType::UnsignedShort => TypeClass::UnsignedShort,
            UnoType::Long => TypeClass::Long,
            UnoType::UnsignedLong => TypeClass::UnsignedLong,
            UnoType::Hyper => TypeClass::Hyper,
            UnoType::UnsignedHyper => TypeClass::UnsignedHyper,
            UnoType::Float => TypeClass::Float,
            UnoType::Double => TypeClass::Double,
            UnoType::String => TypeClass::String,
            UnoType::Type => TypeClass::Type,
            UnoType::Any => TypeClass::Any,
            UnoType::Enum(_) => TypeClass::Enum,
            UnoType::Struct(_) => TypeClass::Struct,
            UnoType::Exception(_) => TypeClass::Exception,
            UnoType::Sequence(_) => TypeClass::Sequence,
            UnoType::Interface(_) => TypeClass::Interface,
            UnoType::Opaque(_) => TypeClass::Unknown,
        }
    }

    pub fn name(&self) -> Cow<'_, str> {
        match self {
            UnoType::Enum(name)
            | UnoType::Struct(name)
            | UnoType::Exception(name)
            | UnoType::Interface(name)
            | UnoType::Opaque(name) => Cow::Borrowed(name),
            UnoType::Sequence(element) => Cow::Owned(format!("[]{}", element.name())),
            simple => Cow::Borrowed(simple_name(simple.class())),
        }
    }

    /// Rebuild a type from the class byte and name received on the wire
    pub fn from_wire(class: TypeClass, name: &str) -> Result<Self, UrpError> {
        let ty = match class {
            TypeClass::Enum => UnoType::Enum(Arc::from(name)),
            TypeClass::Struct => UnoType::Struct(Arc::from(name)),
            TypeClass::Exception => UnoType::Exception(Arc::from(name)),
            TypeClass::Interface => UnoType::Interface(Arc::from(name)),
            TypeClass::Sequence => match name.strip_prefix("[]") {
                Some(element) => UnoType::sequence_of(parse_name(element)),
                None => return Err(UrpError::protocol(format!("bad sequence type {name}"))),
            },
            other => {
                return Err(UrpError::protocol(format!(
                    "type class {other:?} cannot carry a name"
                )))
            }
        };
        Ok(ty)
    }

    pub fn simple(class: TypeClass) -> Option<Self> {
        let ty = match class {
            TypeClass::Void => UnoType::Void,
            TypeClass::Char => UnoType::Char,
            TypeClass::Boolean => UnoType::Boolean,
            TypeClass::Byte => UnoType::Byte,
            TypeClass::Short => UnoType::Short,
            TypeClass::UnsignedShort => UnoType::UnsignedShort,
            TypeClass::Long => UnoType::Long,
            TypeClass::UnsignedLong => UnoType::UnsignedLong,
            TypeClass::Hyper => UnoType::Hyper,
            TypeClass::UnsignedHyper => UnoType::UnsignedHyper,
            TypeClass::Float => UnoType::Float,
            TypeClass::Double => UnoType::Double,
            TypeClass::String => UnoType::String,
            TypeClass::Type => UnoType::Type,
            TypeClass::Any => UnoType::Any,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for UnoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

fn simple_name(class: TypeClass) -> &'static str {
    match class {
        TypeClass::Void => "void",
        TypeClass::Char => "char",
        TypeClass::Boolean => "boolean",
        TypeClass::Byte => "byte",
        TypeClass::Short => "short",
        TypeClass::UnsignedShort => "unsigned short",
        TypeClass::Long => "long",
        TypeClass::UnsignedLong => "unsigned long",
        TypeClass::Hyper => "hyper",
        TypeClass::UnsignedHyper => "unsigned hyper",
        TypeClass::Float => "float",
        TypeClass::Double => "double",
        TypeClass::String => "string",
        TypeClass::Type => "type",
        TypeClass::Any => "any",
        _ => "unknown",
    }
}

fn parse_name(name: &str) -> UnoType {
    if let Some(element) = name.strip_prefix("[]") {
        return UnoType::sequence_of(parse_name(element));
    }
    let simple = [
        TypeClass::Void,
        TypeClass::Char,
        TypeClass::Boolean,
        TypeClass::Byte,
        TypeClass::Short,
        TypeClass::UnsignedShort,
        TypeClass::Long,
        TypeClass::UnsignedLong,
        TypeClass::Hyper,
        TypeClass::UnsignedHyper,
        TypeClass::Float,
        TypeClass::Double,
        TypeClass::String,
        TypeClass::Type,
        TypeClass::Any,
    ];
    simple
        .into_iter()
        .find(|class| simple_name(*class) == name)
        .and_then(UnoType::simple)
        .unwrap_or_else(|| UnoType::Opaque(Arc::from(name)))
}

/// Object identifier of a remote UNO object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Oid(Arc<str>);

impl Oid {
    pub fn new(oid: impl Into<Arc<str>>) -> Self {
        Oid(oid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unsigned values keep their bit pattern in the signed variant of the same width.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Void,
    Bool(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Long(i32),
    Hyper(i64),
    Float(f32),
    Double(f64),
    String(String),
    Type(UnoType),
    Enum(i32),
    Object(Option<Oid>),
    Bytes(Vec<u8>),
    Sequence(Vec<Value>),
}

impl Value {
    pub fn into_object(self) -> Option<Oid> {
        match self {
            Value::Object(oid) => oid,
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i32> {
        match self {
            Value::Long(n) | Value::Enum(n) => Some(*n),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_sequence(self) -> Option<Vec<Value>> {
        match self {
            Value::Sequence(items) => Some(items),
            Value::Bytes(bytes) => Some(bytes.into_iter().map(|b| Value::Byte(b as i8)).collect()),
            _ => None,
        }
    }
}
