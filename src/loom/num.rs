use std::{fmt::Debug, str::FromStr};

use bytemuck::Zeroable;
use derive_more::{Display, From};
use half::f16;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::storage::Storage;

#[derive(Debug, Error)]
pub enum DataTypeError {
    #[error("data type error: unknown tag {0}")]
    Unknown(u8),
    #[error("data type error: unknown name {0:?}")]
    Name(String),
    #[error("data type error: {0} is not supported here")]
    Unsupported(DataType),
}

/// The closed set of element types an array can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum DataType {
    #[display("bool")]
    Bool = 0,
    #[display("int8")]
    I8,
    #[display("int16")]
    I16,
    #[display("int32")]
    I32,
    #[display("int64")]
    I64,
    #[display("uint8")]
    U8,
    #[display("float16")]
    F16,
    #[display("float32")]
    F32,
    #[display("float64")]
    F64,
}

impl DataType {
    /// All data types, ordered by their tags.
    pub const ALL: [DataType; 9] = [
        DataType::Bool,
        DataType::I8,
        DataType::I16,
        DataType::I32,
        DataType::I64,
        DataType::U8,
        DataType::F16,
        DataType::F32,
        DataType::F64,
    ];

    /// Returns the size in bytes of one element.
    pub const fn size(self) -> usize {
        match self {
            DataType::Bool => size_of::<bool>(),
            DataType::I8 => size_of::<i8>(),
            DataType::I16 => size_of::<i16>(),
            DataType::I32 => size_of::<i32>(),
            DataType::I64 => size_of::<i64>(),
            DataType::U8 => size_of::<u8>(),
            DataType::F16 => size_of::<f16>(),
            DataType::F32 => size_of::<f32>(),
            DataType::F64 => size_of::<f64>(),
        }
    }
}

impl From<DataType> for u8 {
    #[inline]
    fn from(value: DataType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for DataType {
    type Error = DataTypeError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(tag as usize)
            .copied()
            .ok_or(DataTypeError::Unknown(tag))
    }
}

impl FromStr for DataType {
    type Err = DataTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r#type| r#type.to_string() == s)
            .ok_or_else(|| DataTypeError::Name(s.into()))
    }
}

/// Conversion from every scalar type, following Rust's `as` rules.
///
/// Integers truncate or sign-extend, floats round toward zero and saturate when converted to
/// integers (`NaN` becomes `0`), and anything converts to `bool` by comparing against zero.
pub trait Cast: Sized {
    fn from_bool(value: bool) -> Self;
    fn from_i8(value: i8) -> Self;
    fn from_i16(value: i16) -> Self;
    fn from_i32(value: i32) -> Self;
    fn from_i64(value: i64) -> Self;
    fn from_u8(value: u8) -> Self;
    fn from_f16(value: f16) -> Self;
    fn from_f32(value: f32) -> Self;
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_cast_primitive {
    ($($t:ty),+) => {
        $(
            impl Cast for $t {
                #[inline]
                fn from_bool(value: bool) -> Self {
                    value as u8 as $t
                }

                #[inline]
                fn from_i8(value: i8) -> Self {
                    value as $t
                }

                #[inline]
                fn from_i16(value: i16) -> Self {
                    value as $t
                }

                #[inline]
                fn from_i32(value: i32) -> Self {
                    value as $t
                }

                #[inline]
                fn from_i64(value: i64) -> Self {
                    value as $t
                }

                #[inline]
                fn from_u8(value: u8) -> Self {
                    value as $t
                }

                #[inline]
                fn from_f16(value: f16) -> Self {
                    value.to_f32() as $t
                }

                #[inline]
                fn from_f32(value: f32) -> Self {
                    value as $t
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $t
                }
            }
        )+
    };
}

impl_cast_primitive!(i8, i16, i32, i64, u8, f32, f64);

impl Cast for bool {
    #[inline]
    fn from_bool(value: bool) -> Self {
        value
    }

    #[inline]
    fn from_i8(value: i8) -> Self {
        value != 0
    }

    #[inline]
    fn from_i16(value: i16) -> Self {
        value != 0
    }

    #[inline]
    fn from_i32(value: i32) -> Self {
        value != 0
    }

    #[inline]
    fn from_i64(value: i64) -> Self {
        value != 0
    }

    #[inline]
    fn from_u8(value: u8) -> Self {
        value != 0
    }

    #[inline]
    fn from_f16(value: f16) -> Self {
        value.to_f32() != 0.0
    }

    #[inline]
    fn from_f32(value: f32) -> Self {
        value != 0.0
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value != 0.0
    }
}

impl Cast for f16 {
    #[inline]
    fn from_bool(value: bool) -> Self {
        f16::from_f32(value as u8 as f32)
    }

    #[inline]
    fn from_i8(value: i8) -> Self {
        f16::from_f32(value as f32)
    }

    #[inline]
    fn from_i16(value: i16) -> Self {
        f16::from_f32(value as f32)
    }

    #[inline]
    fn from_i32(value: i32) -> Self {
        f16::from_f32(value as f32)
    }

    #[inline]
    fn from_i64(value: i64) -> Self {
        f16::from_f64(value as f64)
    }

    #[inline]
    fn from_u8(value: u8) -> Self {
        f16::from_f32(value as f32)
    }

    #[inline]
    fn from_f16(value: f16) -> Self {
        value
    }

    #[inline]
    fn from_f32(value: f32) -> Self {
        f16::from_f32(value)
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        f16::from_f64(value)
    }
}

pub trait Scalar:
    Sized + Copy + Zeroable + Debug + PartialEq + Send + Sync + 'static + Cast + sealed::Sealed
{
    const DATA_TYPE: DataType;

    /// Converts the value into another scalar type with native conversion semantics.
    fn cast<U: Scalar>(self) -> U;

    fn slice(storage: &Storage) -> Option<&[Self]>;
    fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]>;
    fn into_storage(data: Vec<Self>) -> Storage;
}

macro_rules! impl_scalar {
    ($t:ty, $variant:ident, $from:ident) => {
        impl Scalar for $t {
            const DATA_TYPE: DataType = DataType::$variant;

            #[inline]
            fn cast<U: Scalar>(self) -> U {
                U::$from(self)
            }

            #[inline]
            fn slice(storage: &Storage) -> Option<&[Self]> {
                match storage {
                    Storage::$variant(data) => Some(data.as_slice()),
                    _ => None,
                }
            }

            #[inline]
            fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]> {
                match storage {
                    Storage::$variant(data) => Some(data.as_mut_slice()),
                    _ => None,
                }
            }

            #[inline]
            fn into_storage(data: Vec<Self>) -> Storage {
                Storage::$variant(data)
            }
        }
    };
}

impl_scalar!(bool, Bool, from_bool);
impl_scalar!(i8, I8, from_i8);
impl_scalar!(i16, I16, from_i16);
impl_scalar!(i32, I32, from_i32);
impl_scalar!(i64, I64, from_i64);
impl_scalar!(u8, U8, from_u8);
impl_scalar!(f16, F16, from_f16);
impl_scalar!(f32, F32, from_f32);
impl_scalar!(f64, F64, from_f64);

/// Scalars with arithmetic. Integer arithmetic wraps on overflow.
pub trait Numeric: Scalar {
    fn add(self, rhs: Self) -> Self;
}

macro_rules! impl_numeric_int {
    ($($t:ty),+) => {
        $(
            impl Numeric for $t {
                #[inline]
                fn add(self, rhs: Self) -> Self {
                    self.wrapping_add(rhs)
                }
            }
        )+
    };
}

macro_rules! impl_numeric_float {
    ($($t:ty),+) => {
        $(
            impl Numeric for $t {
                #[inline]
                fn add(self, rhs: Self) -> Self {
                    self + rhs
                }
            }
        )+
    };
}

impl_numeric_int!(i8, i16, i32, i64, u8);
impl_numeric_float!(f16, f32, f64);

/// A dynamically typed scalar, converted into an array's element type on use.
#[derive(Debug, Clone, Copy, PartialEq, Display, From)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl From<i32> for Value {
    #[inline]
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f32> for Value {
    #[inline]
    fn from(value: f32) -> Self {
        Self::Float(value.into())
    }
}

impl Value {
    /// Converts the value into `T` with the same rules as [`Scalar::cast`].
    #[inline]
    pub fn to<T: Scalar>(self) -> T {
        match self {
            Value::Bool(value) => T::from_bool(value),
            Value::Int(value) => T::from_i64(value),
            Value::Float(value) => T::from_f64(value),
        }
    }

    /// The data type an array created from this value defaults to.
    #[inline]
    pub fn data_type(self) -> DataType {
        match self {
            Value::Bool(_) => DataType::Bool,
            Value::Int(_) => DataType::I64,
            Value::Float(_) => DataType::F64,
        }
    }
}

mod sealed {
    use half::f16;

    pub trait Sealed {}

    impl Sealed for bool {}
    impl Sealed for i8 {}
    impl Sealed for i16 {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl Sealed for u8 {}
    impl Sealed for f16 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}
