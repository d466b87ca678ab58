//! Runtime to compile-time dispatch over [`DataType`].
//!
//! A [`Visitor`] is a generic callable: [`DataType::visit`] matches the tag once and calls
//! [`Visitor::visit`] instantiated with the concrete [`Scalar`] type, so the visitor's body is
//! statically typed. The `match` is exhaustive over the closed set of data types.

use std::marker::PhantomData;

use super::num::{DataType, DataTypeError, Numeric, Scalar};

pub trait Visitor {
    type Output;

    fn visit<T: Scalar>(self) -> Self::Output;
}

/// Visits a pair of data types, typically the input and the output of a conversion.
pub trait PairVisitor {
    type Output;

    fn visit<T: Scalar, U: Scalar>(self) -> Self::Output;
}

/// Visits numeric data types only.
pub trait NumericVisitor {
    type Output;

    fn visit<T: Numeric>(self) -> Self::Output;
}

impl DataType {
    /// Calls `visitor` with the concrete scalar type of `self`.
    #[inline]
    pub fn visit<V: Visitor>(self, visitor: V) -> V::Output {
        match self {
            DataType::Bool => visitor.visit::<bool>(),
            DataType::I8 => visitor.visit::<i8>(),
            DataType::I16 => visitor.visit::<i16>(),
            DataType::I32 => visitor.visit::<i32>(),
            DataType::I64 => visitor.visit::<i64>(),
            DataType::U8 => visitor.visit::<u8>(),
            DataType::F16 => visitor.visit::<half::f16>(),
            DataType::F32 => visitor.visit::<f32>(),
            DataType::F64 => visitor.visit::<f64>(),
        }
    }

    /// Calls `visitor` with the concrete types of `input` and `output`.
    ///
    /// The output type is resolved first, then the input type within it.
    #[inline]
    pub fn visit_pair<V: PairVisitor>(input: DataType, output: DataType, visitor: V) -> V::Output {
        output.visit(OuterVisitor { input, visitor })
    }

    /// Calls `visitor` with the concrete type of `self`. Fails for [`DataType::Bool`].
    #[inline]
    pub fn visit_numeric<V: NumericVisitor>(self, visitor: V) -> Result<V::Output, DataTypeError> {
        match self {
            DataType::Bool => Err(DataTypeError::Unsupported(self)),
            DataType::I8 => Ok(visitor.visit::<i8>()),
            DataType::I16 => Ok(visitor.visit::<i16>()),
            DataType::I32 => Ok(visitor.visit::<i32>()),
            DataType::I64 => Ok(visitor.visit::<i64>()),
            DataType::U8 => Ok(visitor.visit::<u8>()),
            DataType::F16 => Ok(visitor.visit::<half::f16>()),
            DataType::F32 => Ok(visitor.visit::<f32>()),
            DataType::F64 => Ok(visitor.visit::<f64>()),
        }
    }
}

struct OuterVisitor<V> {
    input: DataType,
    visitor: V,
}

impl<V: PairVisitor> Visitor for OuterVisitor<V> {
    type Output = V::Output;

    #[inline]
    fn visit<U: Scalar>(self) -> Self::Output {
        let visitor = self.visitor;
        let phantom = PhantomData::<U>;
        self.input.visit(InnerVisitor { visitor, phantom })
    }
}

struct InnerVisitor<V, U> {
    visitor: V,
    phantom: PhantomData<U>,
}

impl<V: PairVisitor, U: Scalar> Visitor for InnerVisitor<V, U> {
    type Output = V::Output;

    #[inline]
    fn visit<T: Scalar>(self) -> Self::Output {
        self.visitor.visit::<T, U>()
    }
}
