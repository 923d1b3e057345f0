//! URP wire encoding: big-endian integers, compressed lengths and the
//! receiver-side type/OID/TID caches.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::error::UrpError;
use super::types::{Oid, TypeClass, UnoType, Value};

pub(crate) const CACHE_SIZE: usize = 256;
pub(crate) const IGNORE_CACHE: u16 = 0xFFFF;

/// Outgoing messages never populate the peer's caches, every entry is sent in full.
pub(crate) struct Marshal {
    buf: BytesMut,
}

impl Marshal {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(128),
        }
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.put_u16(v);
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.put_u32(v);
    }

    pub fn compressed(&mut self, n: usize) {
        if n < 0xFF {
            self.buf.put_u8(n as u8);
        } else {
            self.buf.put_u8(0xFF);
            self.buf.put_u32(n as u32);
        }
    }

    pub fn string(&mut self, s: &str) {
        self.bytes(s.as_bytes());
    }

    pub fn bytes(&mut self, b: &[u8]) {
        self.compressed(b.len());
        self.buf.put_slice(b);
    }

    pub fn uno_type(&mut self, ty: &UnoType) {
        let class = ty.class();
        if class.is_simple() {
            self.u8(class as u8);
        } else {
            self.u8(class as u8 | 0x80);
            self.u16(IGNORE_CACHE);
            self.string(&ty.name());
        }
    }

    pub fn oid(&mut self, oid: Option<&Oid>) {
        match oid {
            Some(oid) => self.string(oid.as_str()),
            None => self.string(""),
        }
        self.u16(IGNORE_CACHE);
    }

    pub fn tid(&mut self, tid: &[u8]) {
        self.bytes(tid);
        self.u16(IGNORE_CACHE);
    }

    pub fn value(&mut self, value: &Value) {
        match value {
            Value::Void => {}
            Value::Bool(b) => self.u8(u8::from(*b)),
            Value::Byte(b) => self.buf.put_i8(*b),
            Value::Char(c) => self.u16(*c),
            Value::Short(n) => self.buf.put_i16(*n),
            Value::Long(n) | Value::Enum(n) => self.buf.put_i32(*n),
            Value::Hyper(n) => self.buf.put_i64(*n),
            Value::Float(f) => self.buf.put_f32(*f),
            Value::Double(f) => self.buf.put_f64(*f),
            Value::String(s) => self.string(s),
            Value::Type(ty) => self.uno_type(ty),
            Value::Object(oid) => self.oid(oid.as_ref()),
            Value::Bytes(b) => self.bytes(b),
            Value::Sequence(items) => {
                self.compressed(items.len());
                for item in items {
                    self.value(item);
                }
            }
        }
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Caches filled by the peer's outgoing marshaller
pub(crate) struct InboundCaches {
    types: Vec<Option<UnoType>>,
    oids: Vec<Option<Oid>>,
    tids: Vec<Option<Bytes>>,
}

impl Default for InboundCaches {
    fn default() -> Self {
        Self {
            types: vec![None; CACHE_SIZE],
            oids: vec![None; CACHE_SIZE],
            tids: vec![None; CACHE_SIZE],
        }
    }
}

pub(crate) struct Unmarshal<'a> {
    buf: &'a mut Bytes,
    caches: &'a mut InboundCaches,
}

impl<'a> Unmarshal<'a> {
    pub fn new(buf: &'a mut Bytes, caches: &'a mut InboundCaches) -> Self {
        Self { buf, caches }
    }

    fn need(&self, n: usize) -> Result<(), UrpError> {
        if self.buf.remaining() < n {
            return Err(UrpError::protocol(format!(
                "message truncated: need {n} bytes, {} left",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    pub fn u8(&mut self) -> Result<u8, UrpError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn u16(&mut self) -> Result<u16, UrpError> {
        self.need(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn u32(&mut self) -> Result<u32, UrpError> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn i32(&mut self) -> Result<i32, UrpError> {
        self.need(4)?;
        Ok(self.buf.get_i32())
    }

    fn cache_index(&mut self) -> Result<u16, UrpError> {
        let idx = self.u16()?;
        if idx != IGNORE_CACHE && idx as usize >= CACHE_SIZE {
            return Err(UrpError::protocol(format!("cache index {idx} out of range")));
        }
        Ok(idx)
    }

    pub fn compressed(&mut self) -> Result<usize, UrpError> {
        let n = self.u8()?;
        if n == 0xFF {
            Ok(self.u32()? as usize)
        } else {
            Ok(n as usize)
        }
    }

    pub fn bytes(&mut self) -> Result<Bytes, UrpError> {
        let n = self.compressed()?;
        self.need(n)?;
        Ok(self.buf.split_to(n))
    }

    pub fn string(&mut self) -> Result<String, UrpError> {
        let raw = self.bytes()?;
        String::from_utf8(raw.to_vec()).map_err(|_| UrpError::protocol("string is not UTF-8"))
    }

    pub fn uno_type(&mut self) -> Result<UnoType, UrpError> {
        let flags = self.u8()?;
        let class = TypeClass::from_wire(flags & 0x7F)
            .ok_or_else(|| UrpError::protocol(format!("unknown type class {}", flags & 0x7F)))?;

        if let Some(simple) = UnoType::simple(class) {
            if flags & 0x80 != 0 {
                return Err(UrpError::protocol("simple type with cache flag"));
            }
            return Ok(simple);
        }

        let idx = self.cache_index()?;
        if flags & 0x80 == 0 {
            return self
                .caches
                .types
                .get(idx as usize)
                .and_then(|ty| ty.clone())
                .ok_or_else(|| UrpError::protocol(format!("unknown type cache index {idx}")));
        }

        let name = self.string()?;
        let ty = UnoType::from_wire(class, &name)?;
        if idx != IGNORE_CACHE {
            self.caches.types[idx as usize] = Some(ty.clone());
        }
        Ok(ty)
    }

    /// `None` is the null reference
    pub fn oid(&mut self) -> Result<Option<Oid>, UrpError> {
        let raw = self.string()?;
        if !raw.is_ascii() {
            return Err(UrpError::protocol("OID contains non-ASCII character"));
        }
        let idx = self.cache_index()?;
        if raw.is_empty() {
            if idx == IGNORE_CACHE {
                return Ok(None);
            }
            return self.caches.oids[idx as usize]
                .clone()
                .map(Some)
                .ok_or_else(|| UrpError::protocol(format!("unknown OID cache index {idx}")));
        }
        let oid = Oid::new(raw);
        if idx != IGNORE_CACHE {
            self.caches.oids[idx as usize] = Some(oid.clone());
        }
        Ok(Some(oid))
    }

    pub fn tid(&mut self) -> Result<Bytes, UrpError> {
        let raw = self.bytes()?;
        let idx = self.cache_index()?;
        if raw.is_empty() {
            if idx == IGNORE_CACHE {
                return Err(UrpError::protocol("empty TID"));
            }
            return self.caches.tids[idx as usize]
                .clone()
                .ok_or_else(|| UrpError::protocol(format!("unknown TID cache index {idx}")));
        }
        if idx != IGNORE_CACHE {
            self.caches.tids[idx as usize] = Some(raw.clone());
        }
        Ok(raw)
    }

    /// An `any`: the carried type followed by a value of that type
    pub fn any(&mut self) -> Result<(UnoType, Value), UrpError> {
        let ty = self.uno_type()?;
        let value = self.value(&ty)?;
        Ok((ty, value))
    }

    pub fn value(&mut self, ty: &UnoType) -> Result<Value, UrpError> {
        let value = match ty {
            UnoType::Void => Value::Void,
            UnoType::Boolean => match self.u8()? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => return Err(UrpError::protocol(format!("bad boolean {other}"))),
            },
            UnoType::Byte => Value::Byte(self.u8()? as i8),
            UnoType::Char => Value::Char(self.u16()?),
            UnoType::Short | UnoType::UnsignedShort => Value::Short(self.u16()? as i16),
            UnoType::Long | UnoType::UnsignedLong => Value::Long(self.i32()?),
            UnoType::Enum(_) => Value::Enum(self.i32()?),
            UnoType::Hyper | UnoType::UnsignedHyper => {
                self.need(8)?;
                Value::Hyper(self.buf.get_i64())
            }
            UnoType::Float => {
                self.need(4)?;
                Value::Float(self.buf.get_f32())
            }
            UnoType::Double => {
                self.need(8)?;
                Value::Double(self.buf.get_f64())
            }
            UnoType::String => Value::String(self.string()?),
            UnoType::Type => Value::Type(self.uno_type()?),
            UnoType::Any => self.any()?.1,
            UnoType::Interface(_) => Value::Object(self.oid()?),
            UnoType::Sequence(element) if **element == UnoType::Byte => {
                Value::Bytes(self.bytes()?.to_vec())
            }
            UnoType::Sequence(element) => {
                let n = self.compressed()?;
                let mut items = Vec::with_capacity(n.min(1024));
                for _ in 0..n {
                    items.push(self.value(element)?);
                }
                Value::Sequence(items)
            }
            UnoType::Struct(name) | UnoType::Exception(name) | UnoType::Opaque(name) => {
                return Err(UrpError::protocol(format!("cannot decode value of {name}")))
            }
        };
        Ok(value)
    }
}
