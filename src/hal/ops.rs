//! Op contracts. Each backend implements the contract traits and registers them under its name.

use crate::loom::{
    array::Array,
    num::Value,
    ops::{OpContract, OpError},
};

/// Copies `a` into `out`. Both must have the same data type.
/// `a` broadcasts to the shape of `out`.
pub trait CopyOp: Send + Sync {
    fn call(&self, a: &Array, out: &Array) -> Result<(), OpError>;
}

impl OpContract for dyn CopyOp {
    const NAME: &'static str = "copy";
}

/// Converts `a` elementwise into the data type of `out`.
pub trait AsTypeOp: Send + Sync {
    fn call(&self, a: &Array, out: &Array) -> Result<(), OpError>;
}

impl OpContract for dyn AsTypeOp {
    const NAME: &'static str = "astype";
}

/// Writes `value`, converted into the data type of `out`, to every element of `out`.
pub trait FillOp: Send + Sync {
    fn call(&self, out: &Array, value: Value) -> Result<(), OpError>;
}

impl OpContract for dyn FillOp {
    const NAME: &'static str = "fill";
}

/// Adds `a` and `b` elementwise. All three arrays share one numeric data type.
pub trait AddOp: Send + Sync {
    fn call(&self, a: &Array, b: &Array, out: &Array) -> Result<(), OpError>;
}

impl OpContract for dyn AddOp {
    const NAME: &'static str = "add";
}
