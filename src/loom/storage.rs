use derive_more::From;
use half::f16;

use super::num::{DataType, Scalar};

/// Backing buffer of one or more arrays. The variant fixes the element type for the buffer's lifetime.
#[derive(Debug, Clone, PartialEq, From)]
pub enum Storage {
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    F16(Vec<f16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Storage {
    /// Creates a zero-filled buffer of `len` elements.
    pub fn zeros(r#type: DataType, len: usize) -> Self {
        use super::visit::Visitor;

        struct Zeros(usize);

        impl Visitor for Zeros {
            type Output = Storage;

            fn visit<T: Scalar>(self) -> Self::Output {
                T::into_storage(vec![T::zeroed(); self.0])
            }
        }

        r#type.visit(Zeros(len))
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        match self {
            Storage::Bool(_) => DataType::Bool,
            Storage::I8(_) => DataType::I8,
            Storage::I16(_) => DataType::I16,
            Storage::I32(_) => DataType::I32,
            Storage::I64(_) => DataType::I64,
            Storage::U8(_) => DataType::U8,
            Storage::F16(_) => DataType::F16,
            Storage::F32(_) => DataType::F32,
            Storage::F64(_) => DataType::F64,
        }
    }

    /// Number of elements in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Storage::Bool(data) => data.len(),
            Storage::I8(data) => data.len(),
            Storage::I16(data) => data.len(),
            Storage::I32(data) => data.len(),
            Storage::I64(data) => data.len(),
            Storage::U8(data) => data.len(),
            Storage::F16(data) => data.len(),
            Storage::F32(data) => data.len(),
            Storage::F64(data) => data.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the buffer in bytes.
    #[inline]
    pub fn data_size(&self) -> usize {
        self.len() * self.data_type().size()
    }
}
