//! Primitive values and their portable byte layout.
//!
//! Every table column is made of these primitives. The byte order and the
//! width of [`TypeTag::Real`] columns are not chosen per value; they come from
//! the [`Layout`] declared once in the document header.

use std::fmt::Display;

use num_complex::Complex64;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Expected a value of type {expected}, found {found}")]
    TypeMismatch {
        expected: TypeTag,
        found: &'static str,
    },

    #[error("Text of {len} bytes doesn't fit in a fixed-width field of {width} bytes")]
    TextTooLong { width: usize, len: usize },

    #[error("Text contains a NUL byte, which can't be stored")]
    TextContainsNul,

    #[error("Text is not valid UTF-8")]
    InvalidUtf8,

    #[error("{0} is not exactly representable in single precision")]
    LossyReal(f64),

    #[error("Text of {0} bytes is too long to be length-prefixed")]
    LengthOverflow(usize),

    #[error("Needed {needed} more bytes but only {remaining} remain")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("{0} unexpected trailing bytes after the value")]
    TrailingBytes(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl Endianness {
    pub fn as_byte(self) -> u8 {
        match self {
            Endianness::Little => b'L',
            Endianness::Big => b'B',
        }
    }

    pub fn from_byte(b: u8) -> Option<Endianness> {
        match b {
            b'L' => Some(Endianness::Little),
            b'B' => Some(Endianness::Big),
            _ => None,
        }
    }
}

/// The width used for [`TypeTag::Real`] columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    Single,
    #[default]
    Double,
}

impl Precision {
    /// The number of bytes a real occupies.
    pub fn width(self) -> u8 {
        match self {
            Precision::Single => 4,
            Precision::Double => 8,
        }
    }

    pub fn from_width(width: u8) -> Option<Precision> {
        match width {
            4 => Some(Precision::Single),
            8 => Some(Precision::Double),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Layout {
    pub endianness: Endianness,
    pub precision: Precision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// A float whose width is given by the header [`Precision`]. Held in
    /// memory as [`Value::F64`].
    Real,
    /// A pair of f64 (real, imaginary).
    Complex,
    /// UTF-8 text padded with NULs to exactly this many bytes.
    FixedText(usize),
    /// UTF-8 text prefixed by its u32 byte length.
    Text,
    /// f64 seconds since the epoch declared in the header.
    Timestamp,
}

impl TypeTag {
    /// A short, stable code for this tag. This is what schema fingerprints are
    /// computed over, so it must never change for an existing tag.
    pub fn code(&self) -> String {
        match self {
            TypeTag::I8 => "I8".to_string(),
            TypeTag::I16 => "I16".to_string(),
            TypeTag::I32 => "I32".to_string(),
            TypeTag::I64 => "I64".to_string(),
            TypeTag::U8 => "U8".to_string(),
            TypeTag::U16 => "U16".to_string(),
            TypeTag::U32 => "U32".to_string(),
            TypeTag::U64 => "U64".to_string(),
            TypeTag::F32 => "F32".to_string(),
            TypeTag::F64 => "F64".to_string(),
            TypeTag::Real => "R".to_string(),
            TypeTag::Complex => "C128".to_string(),
            TypeTag::FixedText(width) => format!("A{width}"),
            TypeTag::Text => "PA".to_string(),
            TypeTag::Timestamp => "T".to_string(),
        }
    }

    /// Does this (non-null) value belong to this tag?
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (TypeTag::I8, Value::I8(_))
                | (TypeTag::I16, Value::I16(_))
                | (TypeTag::I32, Value::I32(_))
                | (TypeTag::I64, Value::I64(_))
                | (TypeTag::U8, Value::U8(_))
                | (TypeTag::U16, Value::U16(_))
                | (TypeTag::U32, Value::U32(_))
                | (TypeTag::U64, Value::U64(_))
                | (TypeTag::F32, Value::F32(_))
                | (TypeTag::F64 | TypeTag::Real, Value::F64(_))
                | (TypeTag::Complex, Value::Complex(_))
                | (TypeTag::FixedText(_) | TypeTag::Text, Value::Text(_))
                | (TypeTag::Timestamp, Value::Timestamp(_))
        )
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Complex(Complex64),
    Text(String),
    Timestamp(f64),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Complex(_) => "complex",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

macro_rules! impl_from_for_value {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Value {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_for_value!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    f32 => F32, f64 => F64, Complex64 => Complex, String => Text,
);

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Value {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

macro_rules! put_num {
    ($fn_name:ident, $t:ty) => {
        pub fn $fn_name(&mut self, v: $t) {
            match self.layout.endianness {
                Endianness::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
                Endianness::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
            }
        }
    };
}

/// Accumulates bytes in a fixed [`Layout`].
#[derive(Debug, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
    layout: Layout,
}

impl ByteWriter {
    pub fn new(layout: Layout) -> ByteWriter {
        ByteWriter {
            buf: vec![],
            layout,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    put_num!(put_u8, u8);
    put_num!(put_u16, u16);
    put_num!(put_u32, u32);
    put_num!(put_u64, u64);
    put_num!(put_i8, i8);
    put_num!(put_i16, i16);
    put_num!(put_i32, i32);
    put_num!(put_i64, i64);
    put_num!(put_f32, f32);
    put_num!(put_f64, f64);

    /// Write u32-length-prefixed UTF-8.
    pub fn put_text(&mut self, s: &str) -> Result<(), CodecError> {
        let len: u32 = s
            .len()
            .try_into()
            .map_err(|_| CodecError::LengthOverflow(s.len()))?;
        self.put_u32(len);
        self.put_bytes(s.as_bytes());
        Ok(())
    }
}

macro_rules! get_num {
    ($fn_name:ident, $t:ty) => {
        pub fn $fn_name(&mut self) -> Result<$t, CodecError> {
            const N: usize = std::mem::size_of::<$t>();
            let mut raw = [0; N];
            raw.copy_from_slice(self.take(N)?);
            Ok(match self.layout.endianness {
                Endianness::Little => <$t>::from_le_bytes(raw),
                Endianness::Big => <$t>::from_be_bytes(raw),
            })
        }
    };
}

/// Consumes bytes in a fixed [`Layout`].
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
    layout: Layout,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8], layout: Layout) -> ByteReader<'a> {
        ByteReader {
            buf,
            pos: 0,
            layout,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Switch layouts mid-stream. The container reads its endianness marker
    /// before it knows how to read anything else.
    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    get_num!(get_u8, u8);
    get_num!(get_u16, u16);
    get_num!(get_u32, u32);
    get_num!(get_u64, u64);
    get_num!(get_i8, i8);
    get_num!(get_i16, i16);
    get_num!(get_i32, i32);
    get_num!(get_i64, i64);
    get_num!(get_f32, f32);
    get_num!(get_f64, f64);

    pub fn get_text(&mut self) -> Result<String, CodecError> {
        let len = self.get_u32()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }
}

fn to_single(v: f64) -> Result<f32, CodecError> {
    let single = v as f32;
    if !v.is_nan() && f64::from(single) != v {
        return Err(CodecError::LossyReal(v));
    }
    Ok(single)
}

fn check_fixed_text(s: &str, width: usize) -> Result<(), CodecError> {
    if s.contains('\0') {
        return Err(CodecError::TextContainsNul);
    }
    if s.len() > width {
        return Err(CodecError::TextTooLong {
            width,
            len: s.len(),
        });
    }
    Ok(())
}

/// Check that `value` can be encoded as `tag` exactly when reals are written
/// in `precision`, without encoding it.
pub fn check(value: &Value, tag: TypeTag, precision: Precision) -> Result<(), CodecError> {
    match (tag, value) {
        (TypeTag::FixedText(width), Value::Text(s)) => check_fixed_text(s, width),
        (TypeTag::Real, Value::F64(v)) if precision == Precision::Single => {
            to_single(*v).map(|_| ())
        }
        _ if tag.accepts(value) => Ok(()),
        _ => Err(CodecError::TypeMismatch {
            expected: tag,
            found: value.kind(),
        }),
    }
}

/// Append the encoding of `value` as `tag` to `out`.
pub fn encode(value: &Value, tag: TypeTag, out: &mut ByteWriter) -> Result<(), CodecError> {
    let mismatch = || CodecError::TypeMismatch {
        expected: tag,
        found: value.kind(),
    };
    match (tag, value) {
        (TypeTag::I8, Value::I8(v)) => out.put_i8(*v),
        (TypeTag::I16, Value::I16(v)) => out.put_i16(*v),
        (TypeTag::I32, Value::I32(v)) => out.put_i32(*v),
        (TypeTag::I64, Value::I64(v)) => out.put_i64(*v),
        (TypeTag::U8, Value::U8(v)) => out.put_u8(*v),
        (TypeTag::U16, Value::U16(v)) => out.put_u16(*v),
        (TypeTag::U32, Value::U32(v)) => out.put_u32(*v),
        (TypeTag::U64, Value::U64(v)) => out.put_u64(*v),
        (TypeTag::F32, Value::F32(v)) => out.put_f32(*v),
        (TypeTag::F64, Value::F64(v)) => out.put_f64(*v),
        (TypeTag::Real, Value::F64(v)) => match out.layout().precision {
            Precision::Double => out.put_f64(*v),
            Precision::Single => out.put_f32(to_single(*v)?),
        },
        (TypeTag::Complex, Value::Complex(c)) => {
            out.put_f64(c.re);
            out.put_f64(c.im);
        }
        (TypeTag::FixedText(width), Value::Text(s)) => {
            check_fixed_text(s, width)?;
            out.put_bytes(s.as_bytes());
            out.put_bytes(&vec![0; width - s.len()]);
        }
        (TypeTag::Text, Value::Text(s)) => out.put_text(s)?,
        (TypeTag::Timestamp, Value::Timestamp(t)) => out.put_f64(*t),
        _ => return Err(mismatch()),
    }
    Ok(())
}

/// Read one value of type `tag` from `input`.
pub fn decode(input: &mut ByteReader, tag: TypeTag) -> Result<Value, CodecError> {
    let value = match tag {
        TypeTag::I8 => Value::I8(input.get_i8()?),
        TypeTag::I16 => Value::I16(input.get_i16()?),
        TypeTag::I32 => Value::I32(input.get_i32()?),
        TypeTag::I64 => Value::I64(input.get_i64()?),
        TypeTag::U8 => Value::U8(input.get_u8()?),
        TypeTag::U16 => Value::U16(input.get_u16()?),
        TypeTag::U32 => Value::U32(input.get_u32()?),
        TypeTag::U64 => Value::U64(input.get_u64()?),
        TypeTag::F32 => Value::F32(input.get_f32()?),
        TypeTag::F64 => Value::F64(input.get_f64()?),
        TypeTag::Real => match input.layout().precision {
            Precision::Double => Value::F64(input.get_f64()?),
            Precision::Single => Value::F64(f64::from(input.get_f32()?)),
        },
        TypeTag::Complex => {
            let re = input.get_f64()?;
            let im = input.get_f64()?;
            Value::Complex(Complex64::new(re, im))
        }
        TypeTag::FixedText(width) => {
            let raw = input.take(width)?;
            let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
            let s = std::str::from_utf8(&raw[..end]).map_err(|_| CodecError::InvalidUtf8)?;
            Value::Text(s.to_string())
        }
        TypeTag::Text => Value::Text(input.get_text()?),
        TypeTag::Timestamp => Value::Timestamp(input.get_f64()?),
    };
    Ok(value)
}

/// Convenience wrapper around [`encode`] for a single value.
pub fn encode_to_vec(value: &Value, tag: TypeTag, layout: Layout) -> Result<Vec<u8>, CodecError> {
    let mut out = ByteWriter::new(layout);
    encode(value, tag, &mut out)?;
    Ok(out.into_bytes())
}

/// Convenience wrapper around [`decode`]; all of `bytes` must be consumed.
pub fn decode_from_slice(bytes: &[u8], tag: TypeTag, layout: Layout) -> Result<Value, CodecError> {
    let mut input = ByteReader::new(bytes, layout);
    let value = decode(&mut input, tag)?;
    match input.remaining() {
        0 => Ok(value),
        n => Err(CodecError::TrailingBytes(n)),
    }
}
