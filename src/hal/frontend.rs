use super::ops::{AddOp, AsTypeOp, CopyOp, FillOp};
use crate::loom::{
    array::{Array, ArrayError},
    context::Context,
    device::Device,
    layout::Shape,
    num::{DataType, Value},
    ops::OpError,
};

impl Context {
    /// Copy `a` into a new contiguous array on the same device.
    pub fn copy(&self, a: &Array) -> Result<Array, OpError> {
        let output = a.zeros_like();
        self.op::<dyn CopyOp>(a.device())?.call(a, &output)?;
        Ok(output)
    }

    /// Convert `a` into `r#type`.
    ///
    /// If `a` already has that type, returns a copy when `copy` is set and `a` itself otherwise.
    /// A conversion always produces a new array.
    pub fn astype(&self, a: &Array, r#type: DataType, copy: bool) -> Result<Array, OpError> {
        if a.data_type() == r#type {
            return match copy {
                true => self.copy(a),
                false => Ok(a.clone()),
            };
        }
        let output = Array::zeros(a.device(), a.shape().clone(), r#type);
        self.op::<dyn AsTypeOp>(a.device())?.call(a, &output)?;
        Ok(output)
    }

    /// Write `value` to every element of `out`.
    #[inline]
    pub fn fill(&self, out: &Array, value: impl Into<Value>) -> Result<(), OpError> {
        self.op::<dyn FillOp>(out.device())?.call(out, value.into())
    }

    /// Create an array of `shape` on `device` with every element set to `value`.
    pub fn full(
        &self,
        device: &Device,
        shape: impl Into<Shape>,
        value: impl Into<Value>,
        r#type: DataType,
    ) -> Result<Array, OpError> {
        let output = Array::zeros(device, shape, r#type);
        self.fill(&output, value)?;
        Ok(output)
    }

    /// Add `a` and `b` elementwise into a new array of their broadcast shape.
    pub fn add(&self, a: &Array, b: &Array) -> Result<Array, OpError> {
        a.device().check_compatible([b])?;
        if a.data_type() != b.data_type() {
            return Err(ArrayError::Type(a.data_type(), b.data_type()).into());
        }
        let shape = a.shape().broadcast_with(b.shape())?;
        let output = Array::zeros(a.device(), shape, a.data_type());
        self.op::<dyn AddOp>(a.device())?.call(a, b, &output)?;
        Ok(output)
    }
}
